//! Conversation store and message list display

use crate::events::{ChatMessage, HistoryEntry, MessageId, Role};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::cell::Cell;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Ordered, append-only list of messages, oldest first.
///
/// Seeded with a bot greeting, so it is never empty.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    /// Lines scrolled up from the bottom; 0 follows the latest message
    scroll_offset: usize,
    /// Largest useful offset, known after the last render
    max_offset: Cell<usize>,
}

impl ConversationHistory {
    pub fn new(greeting: impl Into<String>) -> Self {
        let mut history = Self {
            messages: Vec::new(),
            scroll_offset: 0,
            max_offset: Cell::new(0),
        };
        history.append(Role::Bot, greeting);
        history
    }

    /// Append a message at the tail and follow it.
    ///
    /// User messages with blank text are refused.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> Option<MessageId> {
        let text = text.into();
        if role == Role::User && text.trim().is_empty() {
            return None;
        }

        let now = chrono::Utc::now();
        let id = MessageId::next(self.messages.last().map(|m| m.id), now);
        self.messages.push(ChatMessage {
            id,
            role,
            text,
            created_at: now,
        });
        self.scroll_to_bottom();
        Some(id)
    }

    /// Snapshot of the conversation as sent to the backend
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(HistoryEntry::from).collect()
    }

    #[allow(dead_code)]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self
            .scroll_offset
            .saturating_add(lines)
            .min(self.max_offset.get());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    #[allow(dead_code)]
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }
}

impl Widget for &ConversationHistory {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        for message in &self.messages {
            all_lines.extend(render_message(message, area.width));
            all_lines.push(Line::default());
        }
        all_lines.pop();

        let height = area.height as usize;
        let max_offset = all_lines.len().saturating_sub(height);
        self.max_offset.set(max_offset);

        let offset = self.scroll_offset.min(max_offset);
        let end = all_lines.len() - offset;
        let start = end.saturating_sub(height);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            let x = match line.alignment {
                Some(Alignment::Right) => area.right().saturating_sub(line.width() as u16),
                _ => area.x,
            };
            let x = x.max(area.x);
            buf.set_line(x, area.y + i as u16, line, area.right() - x);
        }

        if offset > 0 {
            let marker = Line::from(Span::styled(
                format!("↓ {offset} more"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ));
            let x = area.right().saturating_sub(marker.width() as u16);
            buf.set_line(x.max(area.x), area.bottom() - 1, &marker, area.width);
        }
    }
}

/// Bot messages hang from the left edge, user messages from the right
fn render_message(message: &ChatMessage, width: u16) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let timestamp = message
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string();
    let name = Span::styled(
        message.role.display_name(),
        Style::default().add_modifier(Modifier::BOLD),
    );
    let time_style = Style::default().fg(Color::DarkGray);

    match message.role {
        Role::Bot => lines.push(Line::from(vec![
            Span::raw(format!("{} ", message.role.icon())),
            name,
            Span::styled(format!(" {timestamp}"), time_style),
        ])),
        Role::User => lines.push(
            Line::from(vec![
                Span::styled(format!("{timestamp} "), time_style),
                name,
                Span::raw(format!(" {}", message.role.icon())),
            ])
            .alignment(Alignment::Right),
        ),
    }

    for content_line in wrap_text(&message.text, width.saturating_sub(2) as usize) {
        let line = match message.role {
            Role::Bot => Line::from(vec![
                Span::raw("  "),
                Span::styled(content_line, Style::default().fg(Color::Gray)),
            ]),
            Role::User => Line::from(vec![
                Span::styled(content_line, Style::default().fg(Color::Magenta)),
                Span::raw("  "),
            ])
            .alignment(Alignment::Right),
        };
        lines.push(line);
    }

    lines
}

/// Greedy word wrap measured in terminal cells. Words wider than `width`
/// are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_width = 0;

        for mut word in paragraph.split_whitespace() {
            while word.width() > width {
                if !current_line.is_empty() {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                let (head, rest) = split_at_width(word, width);
                lines.push(head.to_string());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }

            let word_width = word.width();
            let separator = usize::from(!current_line.is_empty());
            if current_width + separator + word_width > width {
                lines.push(std::mem::take(&mut current_line));
                current_width = 0;
            } else if separator == 1 {
                current_line.push(' ');
                current_width += 1;
            }
            current_width += word_width;
            current_line.push_str(word);
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Longest prefix of `word` fitting in `width` cells, never empty
fn split_at_width(word: &str, width: usize) -> (&str, &str) {
    let mut used = 0;
    for (index, c) in word.char_indices() {
        let cell_width = c.width().unwrap_or(0);
        if index > 0 && used + cell_width > width {
            return word.split_at(index);
        }
        used += cell_width;
    }
    (word, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_rows(history: &ConversationHistory, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        history.render(area, &mut buf);
        (0..height)
            .map(|y| (0..width).map(|x| buf.get(x, y).symbol()).collect())
            .collect()
    }

    #[test]
    fn starts_with_the_greeting() {
        let history = ConversationHistory::new("Hello there");

        assert_eq!(history.len(), 1);
        let greeting = history.last().unwrap();
        assert_eq!(greeting.role, Role::Bot);
        assert_eq!(greeting.text, "Hello there");
    }

    #[test]
    fn appends_at_the_tail_with_increasing_ids() {
        let mut history = ConversationHistory::new("hi");
        history.append(Role::User, "one");
        history.append(Role::Bot, "two");
        history.append(Role::User, "three");

        let texts: Vec<&str> = history.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["hi", "one", "two", "three"]);
        assert!(history.messages().windows(2).all(|pair| pair[0].id < pair[1].id));
    }

    #[test]
    fn blank_user_text_is_refused() {
        let mut history = ConversationHistory::new("hi");

        assert_eq!(history.append(Role::User, "   \n\t"), None);
        assert_eq!(history.append(Role::User, ""), None);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_snapshot_strips_ids() {
        let mut history = ConversationHistory::new("hi");
        history.append(Role::User, "question");

        assert_eq!(
            history.history(),
            vec![
                HistoryEntry {
                    role: Role::Bot,
                    text: "hi".to_string()
                },
                HistoryEntry {
                    role: Role::User,
                    text: "question".to_string()
                },
            ]
        );
    }

    #[test]
    fn append_returns_to_the_latest_message() {
        let mut history = ConversationHistory::new("hi");
        for i in 0..20 {
            history.append(Role::Bot, format!("message {i}"));
        }
        render_rows(&history, 30, 5);

        history.scroll_up(3);
        assert_eq!(history.scroll_offset(), 3);

        history.append(Role::User, "new");
        assert_eq!(history.scroll_offset(), 0);
    }

    #[test]
    fn scroll_up_stops_at_the_first_line() {
        let mut history = ConversationHistory::new("hi");
        history.append(Role::User, "question");
        let rows = render_rows(&history, 30, 4);
        assert!(rows.iter().any(|row| row.contains("question")));

        history.scroll_up(100);

        // 2 messages of 2 lines plus one spacer, 4 visible
        assert_eq!(history.scroll_offset(), 1);
        let rows = render_rows(&history, 30, 4);
        assert!(rows[0].contains("Assistant"));
    }

    #[test]
    fn renders_latest_messages_at_the_bottom() {
        let mut history = ConversationHistory::new("greeting");
        history.append(Role::User, "ping");
        history.append(Role::Bot, "pong");

        let rows = render_rows(&history, 40, 3);

        assert!(rows[2].contains("pong"));
        assert!(!rows.iter().any(|row| row.contains("greeting")));
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn splits_words_longer_than_width() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wide_glyphs_wrap_by_cell_width() {
        assert_eq!(wrap_text("你好世界", 4), vec!["你好", "世界"]);
        assert_eq!(wrap_text("ok 你好", 4), vec!["ok", "你好"]);
        assert_eq!(wrap_text("你好世", 5), vec!["你好", "世"]);
    }

    #[test]
    fn user_messages_are_right_aligned() {
        let mut history = ConversationHistory::new("greeting");
        history.append(Role::User, "ping");

        let rows = render_rows(&history, 40, 5);

        assert!(rows[0].starts_with("🤖"));
        assert!(rows[0].contains("Assistant"));
        assert!(rows[1].starts_with("  greeting"));
        assert!(rows[3].trim_end().ends_with("You 👤"));
        assert!(rows[3].starts_with("        "));
        assert!(rows[4].ends_with("ping  "));
    }

    #[test]
    fn keeps_explicit_line_breaks() {
        assert_eq!(wrap_text("one\ntwo", 20), vec!["one", "two"]);
    }
}

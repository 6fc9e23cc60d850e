use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const IDLE_PLACEHOLDER: &str = "Type your message...";
const PENDING_PLACEHOLDER: &str = "AI is thinking...";
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Trimmed, non-empty text the user sent
    Submitted(String),
    None,
}

/// Single-line message input
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    content: String,
    /// Cursor position in chars
    cursor: usize,
    has_focus: bool,
    enabled: bool,
}

impl Default for ConversationComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationComposer {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            has_focus: false,
            enabled: true,
        }
    }

    /// Handle key input. Ignored while disabled.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press || !self.enabled {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                // Shift+Enter is reserved
                if !key.modifiers.contains(KeyModifiers::SHIFT) && self.can_submit() {
                    let submitted = self.content.trim().to_string();
                    self.clear();
                    return ComposerResult::Submitted(submitted);
                }
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let at = self.byte_index();
                self.content.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index();
                    self.content.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_index();
                    self.content.remove(at);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Whether the send action is currently available
    pub fn can_submit(&self) -> bool {
        self.enabled && !self.content.trim().is_empty()
    }

    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    #[allow(dead_code)]
    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// A disabled composer drops focus and ignores keys
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.has_focus = false;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[allow(dead_code)]
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.content
            .char_indices()
            .nth(self.cursor)
            .map_or(self.content.len(), |(index, _)| index)
    }

    fn title(&self) -> String {
        if self.enabled {
            " Message ".to_string()
        } else {
            let frame = (chrono::Utc::now().timestamp_millis() / 100) as usize % SPINNER.len();
            format!(" Sending {} ", SPINNER[frame])
        }
    }
}

impl Widget for &ConversationComposer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if !self.enabled {
            Style::default().fg(Color::DarkGray)
        } else if self.has_focus {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.title())
            .border_style(border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if self.content.is_empty() {
            let placeholder = if self.enabled {
                IDLE_PLACEHOLDER
            } else {
                PENDING_PLACEHOLDER
            };
            let mut spans = Vec::new();
            if self.has_focus {
                spans.push(Span::styled("▌", Style::default().fg(Color::Green)));
            }
            spans.push(Span::styled(placeholder, Style::default().fg(Color::DarkGray)));
            buf.set_line(inner.x, inner.y, &Line::from(spans), inner.width);
            return;
        }

        let mut chars: Vec<char> = self.content.chars().collect();
        if self.has_focus {
            chars.insert(self.cursor.min(chars.len()), '▌');
        }

        // Keep the cursor in view on long input
        let width = inner.width as usize;
        let cursor_end = self.cursor + 1;
        let skip = cursor_end.saturating_sub(width);
        let visible: String = chars.iter().skip(skip).take(width).collect();

        let style = if self.enabled {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        buf.set_line(inner.x, inner.y, &Line::from(Span::styled(visible, style)), inner.width);
    }
}

//! Transient notifications shown outside the conversation

use crate::ui::conversation::history::wrap_text;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const TOAST_WIDTH: u16 = 48;

#[derive(Debug, Clone)]
pub struct Notice {
    pub title: String,
    pub description: String,
    expires_at: Instant,
}

/// Short-lived failure notices; the newest live one is displayed
#[derive(Debug, Clone)]
pub struct Notices {
    live: VecDeque<Notice>,
    ttl: Duration,
    raised: usize,
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            live: VecDeque::new(),
            ttl,
            raised: 0,
        }
    }

    pub fn raise(&mut self, title: impl Into<String>, description: impl Into<String>) {
        self.raise_at(Instant::now(), title, description);
    }

    fn raise_at(&mut self, now: Instant, title: impl Into<String>, description: impl Into<String>) {
        self.live.push_back(Notice {
            title: title.into(),
            description: description.into(),
            expires_at: now + self.ttl,
        });
        self.raised += 1;
    }

    /// Drop notices whose time is up
    pub fn expire(&mut self, now: Instant) {
        self.live.retain(|notice| notice.expires_at > now);
    }

    pub fn current(&self) -> Option<&Notice> {
        self.live.back()
    }

    /// Total notices raised since creation, expired ones included
    #[allow(dead_code)]
    pub fn raised_count(&self) -> usize {
        self.raised
    }
}

impl Widget for &Notices {
    /// Draws the current notice in the top-right corner of `area`
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(notice) = self.current() else {
            return;
        };

        let width = TOAST_WIDTH.min(area.width);
        let body = wrap_text(&notice.description, width.saturating_sub(2) as usize);
        let height = (body.len() as u16 + 2).min(area.height);
        if width < 3 || height < 3 {
            return;
        }

        let toast = Rect {
            x: area.right() - width,
            y: area.y,
            width,
            height,
        };

        let color = Color::Red;

        Clear.render(toast, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!(" {} ", notice.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(color));
        let inner = block.inner(toast);
        block.render(toast, buf);

        for (i, text) in body.into_iter().take(inner.height as usize).enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, &Line::from(text), inner.width);
        }
    }
}

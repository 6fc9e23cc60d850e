use crate::api::{ChatClient, ChatRequest};
use crate::config::UiConfig;
use crate::error::ExchangeError;
use crate::events::Role;
use crate::ui::conversation::{
    ComposerResult, ConversationComposer, ConversationHistory, Notices,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget, block::Title},
};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::Instrument;
use uuid::Uuid;

/// Bot reply appended when an exchange fails for any reason
pub const FALLBACK_REPLY: &str = "Sorry, I'm having trouble connecting to the AI service. \
     Please make sure the backend server is running and try again.";
pub const ERROR_NOTICE_TITLE: &str = "Connection Error";
pub const ERROR_NOTICE_DESCRIPTION: &str =
    "Unable to connect to the AI service. Please check if the backend server is running.";

const PANEL_WIDTH: u16 = 64;
const LAUNCHER: &str = " 💬 Chat [F2] ";
const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// What happened to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// User message appended and the exchange started
    Dispatched,
    /// Blank input, nothing happened
    Empty,
    /// An exchange is already in flight, nothing happened
    Busy,
}

/// The one exchange awaiting its outcome
struct InFlight {
    request_id: Uuid,
    outcome: oneshot::Receiver<Result<String, ExchangeError>>,
}

/// Owns the conversation, the input box and the single in-flight exchange
pub struct ConversationManager {
    history: ConversationHistory,
    composer: ConversationComposer,
    notices: Notices,
    client: ChatClient,
    title: String,
    is_open: bool,
    in_flight: Option<InFlight>,
    focus_requested: bool,
}

impl ConversationManager {
    pub fn new(client: ChatClient, ui: &UiConfig) -> Self {
        Self {
            history: ConversationHistory::new(ui.greeting.clone()),
            composer: ConversationComposer::new(),
            notices: Notices::new(Duration::from_secs(ui.notice_secs)),
            client,
            title: ui.title.clone(),
            is_open: false,
            in_flight: None,
            focus_requested: false,
        }
    }

    /// True from submission until the outcome has been applied
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start an exchange for `input`.
    ///
    /// The user message is appended before the request is issued. The
    /// history sent along is the conversation as it stood before that
    /// append.
    pub fn submit(&mut self, input: &str) -> SubmitOutcome {
        let message = input.trim();
        if message.is_empty() {
            return SubmitOutcome::Empty;
        }
        if self.is_pending() {
            tracing::debug!("submission ignored, exchange already in flight");
            return SubmitOutcome::Busy;
        }

        let request = ChatRequest {
            message: message.to_string(),
            conversation_history: self.history.history(),
        };
        self.history.append(Role::User, message);
        self.composer.set_enabled(false);

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "exchange",
            %request_id,
            history_len = request.conversation_history.len()
        );
        let (tx, rx) = oneshot::channel();
        let client = self.client.clone();
        tokio::spawn(
            async move {
                tracing::debug!(endpoint = client.endpoint(), "sending message");
                let _ = tx.send(client.send(&request).await);
            }
            .instrument(span),
        );

        self.in_flight = Some(InFlight {
            request_id,
            outcome: rx,
        });
        SubmitOutcome::Dispatched
    }

    /// Wait for the in-flight exchange to report. Never resolves while idle.
    ///
    /// Cancel safe; pass the result to [`Self::settle`].
    pub async fn next_outcome(&mut self) -> Result<String, ExchangeError> {
        match self.in_flight.as_mut() {
            Some(in_flight) => (&mut in_flight.outcome)
                .await
                .unwrap_or(Err(ExchangeError::Aborted)),
            None => std::future::pending().await,
        }
    }

    /// Apply an exchange outcome: append the reply or the fallback, clear
    /// pending and ask for input focus on the next frame.
    pub fn settle(&mut self, outcome: Result<String, ExchangeError>) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        let request_id = in_flight.request_id;

        match outcome {
            Ok(reply) => {
                tracing::info!(%request_id, reply_len = reply.len(), "exchange succeeded");
                self.history.append(Role::Bot, reply);
            }
            Err(err) => {
                tracing::warn!(%request_id, error = %err, "exchange failed");
                self.history.append(Role::Bot, FALLBACK_REPLY);
                self.notices.raise(ERROR_NOTICE_TITLE, ERROR_NOTICE_DESCRIPTION);
            }
        }

        self.composer.set_enabled(true);
        self.focus_requested = true;
    }

    /// Await and apply the in-flight exchange; false when idle
    #[cfg(test)]
    pub async fn wait_settled(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        let outcome = self.next_outcome().await;
        self.settle(outcome);
        true
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return ConversationAction::Exit,
            KeyCode::F(2) => {
                self.toggle();
                return ConversationAction::None;
            }
            KeyCode::Char('o') if ctrl => {
                self.toggle();
                return ConversationAction::None;
            }
            _ => {}
        }

        if !self.is_open {
            if key.code == KeyCode::Char('q') {
                return ConversationAction::Exit;
            }
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Esc => self.close(),
            KeyCode::PageUp => self.history.scroll_up(SCROLL_STEP),
            KeyCode::PageDown => self.history.scroll_down(SCROLL_STEP),
            _ => {
                if let ComposerResult::Submitted(text) = self.composer.handle_key(key) {
                    self.submit(&text);
                }
            }
        }

        ConversationAction::None
    }

    pub fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Open the panel; the input is focused on the next frame
    pub fn open(&mut self) {
        self.is_open = true;
        self.focus_requested = true;
    }

    /// Close the panel. An in-flight exchange keeps running.
    pub fn close(&mut self) {
        self.is_open = false;
        self.composer.set_focus(false);
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Called once a frame has been drawn. Applies a pending focus request
    /// now that the input is on screen and enabled.
    pub fn after_frame(&mut self) {
        if !self.focus_requested {
            return;
        }
        self.focus_requested = false;
        if self.is_open && self.composer.is_enabled() {
            self.composer.set_focus(true);
        }
    }

    /// Periodic housekeeping
    pub fn tick(&mut self, now: Instant) {
        self.notices.expire(now);
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    #[allow(dead_code)]
    pub fn composer(&self) -> &ConversationComposer {
        &self.composer
    }

    #[allow(dead_code)]
    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    fn render_launcher(&self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(Span::styled(
            LAUNCHER,
            Style::default()
                .fg(Color::White)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));
        let width = line.width() as u16;
        if area.width <= width || area.height < 2 {
            return;
        }
        buf.set_line(area.right() - width - 1, area.bottom() - 2, &line, width);
    }

    fn render_panel(&self, area: Rect, buf: &mut Buffer) {
        let panel = panel_area(area);
        Clear.render(panel, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(vec![
                Span::raw(" 🤖 "),
                Span::styled(
                    self.title.as_str(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
            ]))
            .title(
                Title::from(Span::styled(" Esc ✕ ", Style::default().fg(Color::DarkGray)))
                    .alignment(Alignment::Right),
            )
            .border_style(Style::default().fg(Color::Magenta));
        let inner = block.inner(panel);
        block.render(panel, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // History
                Constraint::Length(3), // Composer
                Constraint::Length(1), // Hint
            ])
            .split(inner);

        self.history.render(chunks[0], buf);
        self.composer.render(chunks[1], buf);

        if chunks[2].height == 0 {
            return;
        }
        let hint = Line::from(Span::styled(
            "Press Enter to send • PgUp/PgDn to scroll",
            Style::default().fg(Color::DarkGray),
        ));
        let offset = chunks[2].width.saturating_sub(hint.width() as u16) / 2;
        buf.set_line(chunks[2].x + offset, chunks[2].y, &hint, chunks[2].width - offset);
    }
}

impl Widget for &ConversationManager {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.is_open {
            self.render_panel(area, buf);
        } else {
            self.render_launcher(area, buf);
        }
        self.notices.render(area, buf);
    }
}

/// Panel anchored to the bottom-right corner of `area`
fn panel_area(area: Rect) -> Rect {
    let width = PANEL_WIDTH.min(area.width.saturating_sub(2)).max(area.width.min(20));
    let height = (area.height - area.height / 3).max(area.height.min(12));
    Rect {
        x: area.right().saturating_sub(width + 1).max(area.x),
        y: area.bottom().saturating_sub(height + 1).max(area.y),
        width,
        height,
    }
}

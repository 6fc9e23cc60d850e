use crate::api::ChatClient;
use crate::config::Config;
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Redraw cadence for the spinner and notice expiry
const TICK: Duration = Duration::from_millis(100);

/// Run the chat widget until the user quits
pub async fn run(config: Config) -> Result<()> {
    let client = ChatClient::new(&config.api)?;
    let mut manager = ConversationManager::new(client, &config.ui);
    if config.ui.open_on_start {
        manager.open();
    }
    tracing::info!(endpoint = %config.api.chat_url(), "starting chat widget");

    install_panic_hook();
    let mut terminal = init_terminal()?;
    let result = event_loop(&mut terminal, &mut manager).await;
    restore_terminal()?;

    tracing::info!(messages = manager.history().len(), "session ended");
    result
}

async fn event_loop(terminal: &mut Tui, manager: &mut ConversationManager) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);

    loop {
        terminal
            .draw(|frame| frame.render_widget(&*manager, frame.size()))
            .context("Failed to draw frame")?;
        manager.after_frame();

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => {
                    if manager.handle_key(key) == ConversationAction::Exit {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err).context("Failed to read terminal event"),
                None => return Ok(()),
            },
            outcome = manager.next_outcome() => manager.settle(outcome),
            _ = ticker.tick() => manager.tick(Instant::now()),
        }
    }
}

fn init_terminal() -> Result<Tui> {
    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(io::stdout())).context("Failed to create terminal")
}

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen).context("Failed to leave alternate screen")?;
    Ok(())
}

/// Give the terminal back before a panic message is printed
fn install_panic_hook() {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        hook(info);
    }));
}

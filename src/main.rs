//! btc-pulse — a live Bitcoin market dashboard for the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  get()     ┌──────────┐ FeedEvent ┌──────────┐  draw()  ┌──────────┐
//! │ source/  │ ◄───────── │ cache.rs │ ────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (HTTP)   │  (spawned) │ (per feed)│ (broadcast)│ (state)  │          │ (render) │
//! └──────────┘            └──────────┘           └──────────┘          └──────────┘
//!                              ▲                      ▲
//!                              │ refresh(true)        │ handle_key_event()
//!                         ┌──────────┐           ┌──────────┐
//!                         │ poll.rs  │           │ input.rs │
//!                         │ (timers) │           └──────────┘
//!                         └──────────┘
//! ```
//!
//! * **`source/`** — the `DataSource` / `FeedPayload` traits, the HTTP
//!   source, feed descriptors and one record module per upstream API.
//! * **`cache`** — the single-flight polling cache, one per feed.
//! * **`poll`** — the recurring timer behind auto refresh.
//! * **`feeds`** — the registry of every typed cache.
//! * **`app`** — application state (selected tab, status line).
//! * **`ui`** — pure rendering: reads cache snapshots and draws widgets.
//! * **`input`** — maps key events to `App` mutations.
//! * **`config`** / **`logging`** — command line and the log file.
//! * **`main`** — wires everything together: parse args, start the runtime
//!   and the feeds, set up the terminal, and run the event loop.

mod app;
mod cache;
mod config;
mod error;
mod feeds;
mod input;
mod logging;
mod poll;
mod source;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use app::App;
use config::{Cli, Config};
use feeds::Feeds;
use source::HttpSource;

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal and logs the panic
/// before printing the panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        tracing::error!(%info, "panic");
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // -- configuration and logging -------------------------------------------
    let config = Config::from_cli(Cli::parse())?;
    let _log_guard = logging::init(&config.log_dir, &config.log_level)?;
    install_panic_hook();

    // -- runtime and feeds ---------------------------------------------------
    // The UI loop stays on this thread; fetches and timers run on the
    // runtime's workers.
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let enter = runtime.enter();

    let source = HttpSource::new(config.timeout)?;
    let feeds = Feeds::new(&config, Arc::new(source));
    let mut events = feeds.subscribe();
    feeds.start_all();
    info!(?config.params, "dashboard started");

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(feeds.clone());

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain feed change notifications.
    //   2. Kick off a manual refresh if one was requested.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Process feed events
        loop {
            match events.try_recv() {
                Ok(event) => app.apply_event(&event),
                Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "feed events lagged"),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        // 2. Manual refresh
        if app.take_refresh_request() {
            let feeds = feeds.clone();
            runtime.spawn(async move {
                let failed = feeds.refresh_all(true).await;
                if !failed.is_empty() {
                    warn!(?failed, "manual refresh incomplete");
                }
            });
        }

        // 3. Render
        guard.terminal.draw(|f| ui::draw(&app, f))?;

        // 4. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    // `guard` restores the terminal; in-flight fetches get a moment to land.
    drop(guard);
    feeds.stop_all();
    drop(enter);
    runtime.shutdown_timeout(Duration::from_secs(1));
    info!("dashboard stopped");
    Ok(())
}

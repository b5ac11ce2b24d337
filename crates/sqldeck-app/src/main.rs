//! SQLDeck - restores the SQL editor session and reports it

use anyhow::Result;
use sqldeck_app::{AppState, DeckSettings, logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Flushes the log file when dropped
    let _log_guard = match logging::init_default() {
        Ok(guard) => guard,
        Err(e) => {
            // Logging isn't up yet
            eprintln!("FATAL: Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        build_mode = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        "Starting SQLDeck"
    );

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "SQLDeck failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = DeckSettings::load()?;
    let app = AppState::new(settings)?;

    let restored = app.restore().await?;
    tracing::info!(restored, "session ready");

    if app.sql_editor_tabs.sql_editor_tabs().is_empty() {
        app.open_new_editor()?;
    }

    for editor in app.editor_summaries() {
        let marker = if editor.current { "*" } else { " " };
        match editor.connection {
            Some(connection) => println!("{marker} {} [{connection}]", editor.title),
            None => println!("{marker} {}", editor.title),
        }
    }

    for notification in app.notifications.notifications() {
        eprintln!("{:?}: {}", notification.kind, notification.title);
    }

    app.save().await
}

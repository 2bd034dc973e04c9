use std::process::ExitCode;

use clap::Parser;
use sqlguard_cli::cli::display::{show_message_wrapper, Message, MessageType};
use sqlguard_cli::cli::logger::{setup_logging, LoggerLevel};
use sqlguard_cli::cli::settings::read_settings;
use sqlguard_cli::cli::{top_command_handler, Cli};
use sqlguard_cli::utilities::dotenv::load_dotenv_files;

fn fail(action: &str, details: String) -> ExitCode {
    show_message_wrapper(
        MessageType::Error,
        Message::new(action.to_string(), details),
    );
    ExitCode::from(1)
}

// Entry point for the CLI application
fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.backtrace {
        // Safe: no other threads have started and no errors have been created yet.
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }

    // .env files must be in the environment before settings are read
    let loaded = match std::env::current_dir() {
        Ok(dir) => load_dotenv_files(&dir),
        Err(_) => Vec::new(),
    };

    let mut settings = match read_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => return fail("Config", format!("Failed to read settings: {e}")),
    };
    if cli.debug {
        settings.logger.level = LoggerLevel::Debug;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return fail("Init", format!("Failed to create Tokio runtime: {e}")),
    };

    let logger_settings = settings.logger.clone();
    let result = runtime.block_on(async {
        if let Err(e) = setup_logging(&logger_settings) {
            eprintln!("{e}");
        }
        if !loaded.is_empty() {
            tracing::debug!("Loaded environment files: {}", loaded.join(", "));
        }

        top_command_handler(settings, &cli.command).await
    });

    match result {
        Ok(success) => {
            // Empty messages mean the command already printed its output
            success.show();
            ExitCode::from(0)
        }
        Err(failure) => {
            failure.show();
            ExitCode::from(1)
        }
    }
}

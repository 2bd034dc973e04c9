//! # Display
//!
//! User-facing status lines. Errors and warnings go to stderr so stdout only
//! carries command output.

pub mod terminal;

use crossterm::tty::IsTty;
use std::io::{stderr, stdout};
use terminal::{write_styled_line, StyledText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Highlight,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub action: String,
    pub details: String,
}

impl Message {
    pub fn new(action: String, details: String) -> Message {
        Message { action, details }
    }

    pub fn is_empty(&self) -> bool {
        self.action.is_empty() && self.details.is_empty()
    }
}

fn styled_action(message_type: MessageType, action: &str) -> StyledText {
    let text = StyledText::from_str(action);
    match message_type {
        MessageType::Info => text.cyan(),
        MessageType::Success => text.green(),
        MessageType::Highlight => text.green().bold(),
        MessageType::Warning => text.yellow(),
        MessageType::Error => text.red().bold(),
    }
}

fn no_ansi(is_tty: bool) -> bool {
    !is_tty || std::env::var_os("NO_COLOR").is_some()
}

pub fn show_message_wrapper(message_type: MessageType, message: Message) {
    let styled = styled_action(message_type, &message.action);
    let result = match message_type {
        MessageType::Warning | MessageType::Error => {
            let mut err = stderr();
            let no_ansi = no_ansi(err.is_tty());
            write_styled_line(&mut err, &styled, &message.details, no_ansi)
        }
        _ => {
            let mut out = stdout();
            let no_ansi = no_ansi(out.is_tty());
            write_styled_line(&mut out, &styled, &message.details, no_ansi)
        }
    };
    if let Err(e) = result {
        tracing::warn!("Failed to write message: {}", e);
    }
}

macro_rules! show_message {
    ($message_type:expr, $message:expr) => {
        $crate::cli::display::show_message_wrapper($message_type, $message)
    };
}

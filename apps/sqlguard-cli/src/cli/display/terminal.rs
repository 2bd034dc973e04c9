//! Styled terminal lines built on crossterm.

use crossterm::{
    execute,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use std::io::{Result as IoResult, Write};

/// Width of the action column in terminal output
pub const ACTION_WIDTH: usize = 15;

/// Text for the action column, with an optional color and weight.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledText {
    text: String,
    foreground: Option<Color>,
    bold: bool,
}

impl StyledText {
    pub fn new(text: String) -> Self {
        Self {
            text,
            foreground: None,
            bold: false,
        }
    }

    pub fn from_str(text: &str) -> Self {
        Self::new(text.to_string())
    }

    pub fn cyan(mut self) -> Self {
        self.foreground = Some(Color::Cyan);
        self
    }

    pub fn green(mut self) -> Self {
        self.foreground = Some(Color::Green);
        self
    }

    pub fn yellow(mut self) -> Self {
        self.foreground = Some(Color::Yellow);
        self
    }

    pub fn red(mut self) -> Self {
        self.foreground = Some(Color::Red);
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Writes `[ACTION right-aligned in ACTION_WIDTH] message`. Styling is skipped
/// when `no_ansi` is set.
pub fn write_styled_line<W: Write>(
    writer: &mut W,
    styled_text: &StyledText,
    message: &str,
    no_ansi: bool,
) -> IoResult<()> {
    // char-aware so multi-byte actions never split
    let action: String = styled_text.text.chars().take(ACTION_WIDTH).collect();
    let padded_action = format!("{action:>ACTION_WIDTH$}");

    if !no_ansi {
        if let Some(color) = styled_text.foreground {
            execute!(writer, SetForegroundColor(color))?;
        }
        if styled_text.bold {
            execute!(writer, SetAttribute(Attribute::Bold))?;
        }
    }

    execute!(writer, Print(&padded_action))?;

    if !no_ansi {
        execute!(writer, ResetColor)?;
        if styled_text.bold {
            execute!(writer, SetAttribute(Attribute::Reset))?;
        }
    }

    execute!(writer, Print(" "), Print(message), Print("\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(styled: &StyledText, message: &str, no_ansi: bool) -> String {
        let mut buffer = Vec::new();
        write_styled_line(&mut buffer, styled, message, no_ansi).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_action_is_right_aligned() {
        let output = render(&StyledText::from_str("Valid").green(), "query passed", true);
        assert_eq!(output, "          Valid query passed\n");
    }

    #[test]
    fn test_long_action_is_cut_to_width() {
        let output = render(&StyledText::from_str("Überlange Aktion hier"), "x", true);
        assert_eq!(output, "Überlange Aktio x\n");
    }

    #[test]
    fn test_ansi_codes_only_when_enabled() {
        let styled = StyledText::from_str("Rejected").red().bold();
        assert!(render(&styled, "m", false).contains("\x1b["));
        assert!(render(&styled, "m", false).contains("\x1b[1m"));
        assert!(!render(&styled, "m", true).contains("\x1b["));
    }
}

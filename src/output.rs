//! Output rendering abstraction for ai.
//!
//! Defines the [`Renderer`] trait that decouples the agent loop from the
//! display layer. [`StdoutRenderer`] prints to the terminal with an explicit
//! [`Theme`] chosen at construction, so nothing depends on global colour
//! state.

use colored::{Color, Colorize};
use std::io::{self, IsTerminal, Write};

/// Trait for rendering what the agent does and says.
pub trait Renderer {
    /// Called before each tool call is executed.
    fn tool_use(&mut self, name: &str, arguments: &str);

    /// Called with the final answer of a turn.
    fn agent_message(&mut self, text: &str);

    /// Status lines (connections, loaded tools, saved sessions).
    fn info(&mut self, text: &str);

    /// Called when a turn or command fails.
    fn error(&mut self, err: &str);
}

/// Colours used by [`StdoutRenderer`]. `None` disables colour entirely.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub tool: Option<Color>,
    pub answer: Option<Color>,
    pub info: Option<Color>,
    pub error: Option<Color>,
}

impl Theme {
    pub fn colored() -> Self {
        Self {
            tool: Some(Color::Cyan),
            answer: Some(Color::Green),
            info: Some(Color::BrightBlack),
            error: Some(Color::Red),
        }
    }

    pub fn plain() -> Self {
        Self {
            tool: None,
            answer: None,
            info: None,
            error: None,
        }
    }

    /// Coloured when stdout is a terminal, plain when piped.
    pub fn detect() -> Self {
        if io::stdout().is_terminal() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

fn paint(text: &str, color: Option<Color>) -> String {
    match color {
        Some(c) => text.color(c).to_string(),
        None => text.to_string(),
    }
}

/// Renders agent output directly to stdout (errors to stderr).
pub struct StdoutRenderer {
    theme: Theme,
}

impl StdoutRenderer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }
}

impl Renderer for StdoutRenderer {
    fn tool_use(&mut self, name: &str, arguments: &str) {
        let line = format!("[Agent using tool: {name} ({arguments})]");
        println!("{}", paint(&line, self.theme.tool));
        io::stdout().flush().ok();
    }

    fn agent_message(&mut self, text: &str) {
        println!("{}", paint(text, self.theme.answer));
    }

    fn info(&mut self, text: &str) {
        println!("{}", paint(text, self.theme.info));
    }

    fn error(&mut self, err: &str) {
        match self.theme.error {
            Some(c) => eprintln!("{} {}", "error:".color(c).bold(), err),
            None => eprintln!("error: {err}"),
        }
    }
}

/// Collects everything rendered, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub tool_uses: Vec<(String, String)>,
    pub messages: Vec<String>,
    pub infos: Vec<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn tool_use(&mut self, name: &str, arguments: &str) {
        self.tool_uses.push((name.to_string(), arguments.to_string()));
    }

    fn agent_message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn info(&mut self, text: &str) {
        self.infos.push(text.to_string());
    }

    fn error(&mut self, err: &str) {
        self.errors.push(err.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_leaves_text_untouched() {
        let theme = Theme::plain();
        assert_eq!(paint("hello", theme.answer), "hello");
    }
}

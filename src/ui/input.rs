use thiserror::Error;

/// Result of feeding one terminal line to the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Line ended with `\`; more text follows.
    Pending,
    /// Nothing but whitespace was entered.
    Blank,
    Submitted(String),
}

/// Multi-line composer over line-buffered stdin.
///
/// A line ending in a backslash continues on the next line, so Enter alone
/// submits and `\` + Enter inserts a newline.
#[derive(Debug, Default)]
pub struct InputLine {
    pending: Vec<String>,
    disabled: bool,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// True while a reply is streaming; messages are refused, commands are not.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn feed(&mut self, line: &str) -> InputEvent {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(head) = line.strip_suffix('\\') {
            self.pending.push(head.to_string());
            return InputEvent::Pending;
        }

        self.pending.push(line.to_string());
        let text = self.pending.join("\n");
        self.pending.clear();

        let text = text.trim();
        if text.is_empty() {
            InputEvent::Blank
        } else {
            InputEvent::Submitted(text.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    ToggleSidebar,
    Open(String),
    Delete(String),
    ToggleTheme,
    Help,
    Quit,
    /// Plain text to send to the open conversation.
    Say(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command /{0}. Type /help for the list")] Unknown(String),
    #[error("/{0} needs a conversation number or id")] MissingArgument(&'static str),
}

impl Command {
    /// Text starting with `/` is a command; `//` escapes a literal slash.
    pub fn parse(input: &str) -> Result<Command, CommandError> {
        let input = input.trim();
        if input.starts_with("//") {
            return Ok(Command::Say(input[1..].to_string()));
        }
        let Some(rest) = input.strip_prefix('/') else {
            return Ok(Command::Say(input.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let required = |command: &'static str| {
            if arg.is_empty() {
                Err(CommandError::MissingArgument(command))
            } else {
                Ok(arg.to_string())
            }
        };

        match name.to_lowercase().as_str() {
            "new" => Ok(Command::New),
            "list" | "sidebar" => Ok(Command::ToggleSidebar),
            "open" => required("open").map(Command::Open),
            "delete" => required("delete").map(Command::Delete),
            "theme" => Ok(Command::ToggleTheme),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

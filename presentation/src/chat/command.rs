//! REPL input parsing

use persona_domain::TruncateMode;

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    /// Empty the session and reset its role
    Clear,
    /// Print the durable transcript
    History,
    /// Print the active role
    ShowRole,
    /// List every registered role
    Roles,
    SetRole(String),
    /// Print the context summary
    Context,
    SetTurns(usize),
    SetTruncate(TruncateMode),
    /// A command with a bad argument; carries the usage hint
    Invalid(String),
    /// Anything else is sent to the model
    Message(String),
}

impl ReplCommand {
    /// Parse a line. Returns `None` for blank input.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match (word.to_lowercase().as_str(), rest) {
            ("help", "") => ReplCommand::Help,
            ("exit" | "quit", "") => ReplCommand::Exit,
            ("clear", "") => ReplCommand::Clear,
            ("history", "") => ReplCommand::History,
            ("role", "") => ReplCommand::ShowRole,
            ("role", role) => ReplCommand::SetRole(role.to_string()),
            ("roles", "") => ReplCommand::Roles,
            ("context", "") => ReplCommand::Context,
            ("set_turns", value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => ReplCommand::SetTurns(n),
                _ => ReplCommand::Invalid("usage: set_turns <positive number>".to_string()),
            },
            ("set_truncate", value) => match value.parse::<TruncateMode>() {
                Ok(mode) => ReplCommand::SetTruncate(mode),
                Err(_) => ReplCommand::Invalid("usage: set_truncate <sliding|clear>".to_string()),
            },
            _ => ReplCommand::Message(line.to_string()),
        };
        Some(command)
    }

    pub fn help() -> &'static str {
        "Commands:
  help                    - Show this help
  exit, quit              - Leave the chat
  clear                   - Forget the conversation and reset the role
  history                 - Show the saved transcript
  role                    - Show the current role
  role <id>               - Switch to another role
  roles                   - List available roles
  context                 - Show what the model currently remembers
  set_turns <n>           - Keep the last n exchanges
  set_truncate <mode>     - sliding (drop oldest) or clear (drop all)
Anything else is sent as a message. Ctrl-C stops a reply in progress."
    }
}

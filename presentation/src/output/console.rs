//! Console output formatter for chat replies and session state

use chrono::{DateTime, Utc};
use colored::Colorize;
use persona_application::ChatResponse;
use persona_domain::{ContextSummary, Speaker, Turn};
use std::collections::BTreeSet;

/// Formats chat results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Reply text, with a note when the requested role was not available.
    pub fn format_response(response: &ChatResponse) -> String {
        let mut output = String::new();
        if response.role_fallback {
            output.push_str(&Self::fallback_note(&response.current_role));
            output.push('\n');
        }
        output.push_str(&response.response);
        output
    }

    /// Format as JSON
    pub fn format_json(response: &ChatResponse) -> String {
        serde_json::to_string_pretty(response).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn fallback_note(role: &str) -> String {
        format!("(unknown role requested, answering as '{}')", role)
            .yellow()
            .to_string()
    }

    pub fn format_error(message: &str) -> String {
        format!("{} {}", "Error:".red().bold(), message)
    }

    /// Context overview for the `context` command.
    pub fn format_summary(summary: &ContextSummary) -> String {
        let mut output = Self::section_header("Context");
        output.push_str(&format!(
            "  {} {}\n",
            "Role:".cyan(),
            summary.current_role
        ));
        output.push_str(&format!(
            "  {} {}/{} exchanges ({} messages)\n",
            "Window:".cyan(),
            summary.exchange_count,
            summary.max_turns,
            summary.turn_count
        ));
        if let (Some(oldest), Some(newest)) = (summary.oldest_timestamp, summary.newest_timestamp) {
            output.push_str(&format!(
                "  {} {} .. {}\n",
                "Span:".cyan(),
                Self::time(oldest),
                Self::time(newest)
            ));
        } else {
            output.push_str(&format!("  {}\n", "(no context yet)".dimmed()));
        }
        output
    }

    /// Transcript listing for the `history` command.
    pub fn format_history(turns: &[Turn]) -> String {
        let mut output = Self::section_header("History");
        if turns.is_empty() {
            output.push_str(&format!("  {}\n", "(empty)".dimmed()));
            return output;
        }
        for turn in turns {
            let speaker = match turn.speaker() {
                Speaker::User => "you".green().bold(),
                Speaker::Assistant => "assistant".blue().bold(),
            };
            output.push_str(&format!(
                "[{}] {}:\n{}\n",
                Self::time(turn.timestamp()).dimmed(),
                speaker,
                Self::indent(turn.text(), "  ")
            ));
        }
        output
    }

    /// Role list with the active one marked.
    pub fn format_roles(roles: &BTreeSet<String>, current: &str) -> String {
        let mut output = Self::section_header("Roles");
        for role in roles {
            if role == current {
                output.push_str(&format!("  * {}\n", role.green().bold()));
            } else {
                output.push_str(&format!("    {}\n", role));
            }
        }
        output
    }

    pub fn format_welcome(user_id: &str, role: &str) -> String {
        let mut output = Self::header("persona-chat");
        output.push_str(&format!(
            "\n{} {}   {} {}\n",
            "User:".cyan(),
            user_id,
            "Role:".cyan(),
            role
        ));
        output.push_str("Type 'help' for commands, 'exit' to quit.\n");
        output
    }

    fn time(timestamp: DateTime<Utc>) -> String {
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

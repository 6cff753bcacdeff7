//! REPL (Read-Eval-Print Loop) for interactive chat

use super::command::ReplCommand;
use crate::ConsoleFormatter;
use colored::Colorize;
use persona_application::{ChatOrchestrator, ChatStream};
use persona_domain::ChunkKind;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Interactive chat REPL
pub struct ChatRepl {
    orchestrator: Arc<ChatOrchestrator>,
    user_id: String,
    stream: bool,
}

impl ChatRepl {
    /// Create a new ChatRepl
    pub fn new(orchestrator: Arc<ChatOrchestrator>, user_id: impl Into<String>) -> Self {
        Self {
            orchestrator,
            user_id: user_id.into(),
            stream: true,
        }
    }

    /// Set whether replies are streamed
    pub fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Run the interactive REPL until `exit` or end of input
    pub async fn run(&self) -> io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!(
            "{}",
            ConsoleFormatter::format_welcome(
                &self.user_id,
                &self.orchestrator.get_current_role(&self.user_id)
            )
        );

        loop {
            print!("{} ", ">>>".green().bold());
            io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!("Bye!");
                break;
            };
            let Some(command) = ReplCommand::parse(&line) else {
                continue;
            };
            debug!(?command, "REPL input");

            if matches!(command, ReplCommand::Exit) {
                println!("Bye!");
                break;
            }
            self.handle(command).await?;
        }

        Ok(())
    }

    async fn handle(&self, command: ReplCommand) -> io::Result<()> {
        let orchestrator = &self.orchestrator;
        let user_id = self.user_id.as_str();

        match command {
            ReplCommand::Help => println!("{}", ReplCommand::help()),
            ReplCommand::Exit => {}
            ReplCommand::Clear => {
                orchestrator.clear_context(user_id);
                println!("Conversation cleared.");
            }
            ReplCommand::History => match orchestrator.conversation_history(user_id) {
                Ok(turns) => println!("{}", ConsoleFormatter::format_history(&turns)),
                Err(e) => eprintln!("{}", ConsoleFormatter::format_error(&e.to_string())),
            },
            ReplCommand::ShowRole => {
                println!("Current role: {}", orchestrator.get_current_role(user_id));
            }
            ReplCommand::Roles => println!(
                "{}",
                ConsoleFormatter::format_roles(
                    &orchestrator.list_available_roles(),
                    &orchestrator.get_current_role(user_id)
                )
            ),
            ReplCommand::SetRole(role) => {
                if orchestrator.set_role(user_id, &role) {
                    println!("Switched to role: {}", role);
                } else {
                    eprintln!(
                        "{}",
                        ConsoleFormatter::format_error(&format!(
                            "unknown role '{}' (see 'roles')",
                            role
                        ))
                    );
                }
            }
            ReplCommand::Context => println!(
                "{}",
                ConsoleFormatter::format_summary(&orchestrator.get_context_summary(user_id))
            ),
            ReplCommand::SetTurns(n) => match orchestrator.update_settings(Some(n), None) {
                Ok(window) => println!("Keeping the last {} exchanges.", window.max_turns()),
                Err(e) => eprintln!("{}", ConsoleFormatter::format_error(&e.to_string())),
            },
            ReplCommand::SetTruncate(mode) => match orchestrator.update_settings(None, Some(mode)) {
                Ok(window) => println!("Truncate mode: {}", window.mode()),
                Err(e) => eprintln!("{}", ConsoleFormatter::format_error(&e.to_string())),
            },
            ReplCommand::Invalid(usage) => eprintln!("{}", usage),
            ReplCommand::Message(message) => {
                println!();
                self.send(&message).await?;
                println!();
            }
        }
        Ok(())
    }

    async fn send(&self, message: &str) -> io::Result<()> {
        if self.stream {
            let stream = self
                .orchestrator
                .chat_stream(&self.user_id, message, None)
                .await;
            print_stream(stream).await?;
            return Ok(());
        }

        match self.orchestrator.chat(&self.user_id, message, None).await {
            Ok(response) => println!("{}", ConsoleFormatter::format_response(&response)),
            Err(e) => eprintln!("{}", ConsoleFormatter::format_error(&e.to_string())),
        }
        Ok(())
    }
}

/// Print a reply as it arrives. Ctrl-C cancels it.
///
/// Returns true if the reply completed.
pub async fn print_stream(mut stream: ChatStream) -> io::Result<bool> {
    if stream.role_fallback() {
        println!("{}", ConsoleFormatter::fallback_note(stream.role()));
    }

    let mut stdout = io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            chunk = stream.next_chunk() => {
                let Some(chunk) = chunk else {
                    return Ok(false);
                };
                match chunk.kind {
                    ChunkKind::Content => {
                        write!(stdout, "{}", chunk.content)?;
                        stdout.flush()?;
                    }
                    ChunkKind::Done => {
                        writeln!(stdout)?;
                        return Ok(true);
                    }
                    ChunkKind::Error => {
                        writeln!(stdout)?;
                        eprintln!("{}", ConsoleFormatter::format_error(&chunk.content));
                        return Ok(false);
                    }
                }
            }
            _ = &mut ctrl_c => {
                stream.cancel();
                writeln!(stdout, "\n{}", "(cancelled)".dimmed())?;
                return Ok(false);
            }
        }
    }
}

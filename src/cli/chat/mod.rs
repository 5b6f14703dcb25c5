pub mod prompt;

use std::io::Write;
use std::process::ExitCode;

use color_print::cformat;
use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use eyre::{Result, eyre};
use prompt::generate_prompt;
use rustyline::Editor;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::conversation_state::Role;
use crate::router::{ChatSession, Router};
use crate::settings::Settings;

const WELCOME_TEXT: &str = "
Hi, I'm Dual Chat. Ask me anything.

Answers come from Gemini in the cloud or from a local Ollama model.

/model        Show or switch the active backend
/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
Dual Chat CLI

/model            Show the active backend
/model <name>     Switch backend (gemini or ollama)
/history          Show the conversation so far
/clear            Clear the conversation history
/help             Show this help dialogue
/quit             Quit the application
";

const THINKING_TEXT: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct ChatContext {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    accept_all: bool,
    settings: Settings,
    session: ChatSession,
    router: Option<Router>,
}

impl ChatContext {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        accept_all: bool,
        settings: Settings,
    ) -> Self {
        let session = ChatSession::new(settings.default_backend);
        Self {
            output,
            input,
            interactive,
            accept_all,
            settings,
            session,
            router: None,
        }
    }

    #[cfg(test)]
    fn with_router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        if self.router.is_none() {
            self.router = match Router::from_settings(&self.settings) {
                Ok(router) => Some(router),
                Err(e) => {
                    writeln!(self.output, "Failed to initialize chat backends: {:#}", e)?;
                    return Ok(ExitCode::FAILURE);
                }
            };
        }

        if self.interactive {
            self.print_welcome()?;
        }

        // Single query
        if let Some(input) = self.input.take() {
            let ok = self.process_chat_input(&input).await?;
            return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
        }

        if self.interactive {
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn router(&self) -> Result<&Router> {
        self.router.as_ref().ok_or_else(|| eyre!("chat backends not initialized"))
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        self.print_active_backend()?;
        Ok(())
    }

    fn print_active_backend(&mut self) -> Result<()> {
        let backend = self.session.backend;
        let router = self.router()?;
        let label = router.describe(backend);
        let available = router.is_available(backend);

        writeln!(self.output, "Using {}.", label)?;
        if !available {
            writeln!(
                self.output,
                "{}",
                cformat!("<yellow>GEMINI_API_KEY is not set. Set it or switch with /model ollama.</yellow>")
            )?;
        }
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let prompt_text = generate_prompt(self.session.backend);
            match rl.readline(&prompt_text) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str());

                    match self.handle_input(&line, Some(&mut rl)).await {
                        Ok(Flow::Quit) => break,
                        Ok(Flow::Continue) => {}
                        Err(e) => writeln!(self.output, "Error: {}", e)?,
                    }
                }
                Err(e) => {
                    info!("Leaving chat: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str, rl: Option<&mut Editor<()>>) -> Result<Flow> {
        let trimmed = input.trim();
        let mut words = trimmed.split_whitespace();

        match words.next() {
            Some("/quit") => return Ok(Flow::Quit),
            Some("/help") => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            Some("/clear") => {
                self.session.conversation.clear();
                writeln!(self.output, "Conversation cleared.")?;
            }
            Some("/history") => self.print_history()?,
            Some("/model") => match words.next() {
                None => self.print_active_backend()?,
                Some(name) => match name.parse::<Backend>() {
                    Ok(backend) => self.switch_backend(backend, rl)?,
                    Err(e) => writeln!(self.output, "{}", e)?,
                },
            },
            Some(command) if command.starts_with('/') => {
                writeln!(self.output, "Unknown command {}. Type /help for the list.", command)?;
            }
            _ => {
                self.process_chat_input(trimmed).await?;
            }
        }

        Ok(Flow::Continue)
    }

    /// Switching keeps the history unless the user agrees to drop it.
    fn switch_backend(&mut self, backend: Backend, rl: Option<&mut Editor<()>>) -> Result<()> {
        let previous = self.session.backend;
        if previous == backend {
            writeln!(self.output, "Already using {}.", backend.display_name())?;
            return Ok(());
        }

        self.session.backend = backend;
        info!("Backend changed from {} to {}", previous, backend);

        if !self.session.conversation.is_empty() && self.confirm_clear(rl)? {
            self.session.conversation.clear();
            info!("Conversation cleared after backend switch");
            writeln!(self.output, "Conversation cleared.")?;
        }

        self.print_active_backend()
    }

    fn confirm_clear(&mut self, rl: Option<&mut Editor<()>>) -> Result<bool> {
        if self.accept_all {
            return Ok(true);
        }
        let Some(rl) = rl else {
            return Ok(false);
        };

        let answer = rl.readline("Clear the conversation history to avoid mixing context between models? [y/N] ")?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    fn print_history(&mut self) -> Result<()> {
        if self.session.conversation.is_empty() {
            writeln!(self.output, "No messages yet.")?;
            return Ok(());
        }

        for turn in self.session.conversation.turns() {
            let line = match turn.role() {
                Role::User => cformat!("<bold><cyan>You:</cyan></bold> {}", turn.text()),
                Role::Model => cformat!("<bold><green>Bot:</green></bold> {}", turn.text()),
            };
            writeln!(self.output, "{}", line)?;
        }
        Ok(())
    }

    /// Returns whether the exchange was committed.
    async fn process_chat_input(&mut self, input: &str) -> Result<bool> {
        if self.interactive {
            write!(self.output, "{}", THINKING_TEXT)?;
            self.output.flush()?;
        }

        let router = self.router.as_ref().ok_or_else(|| eyre!("chat backends not initialized"))?;
        let result = router.send(&mut self.session, input).await;

        if self.interactive {
            execute!(self.output, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        }

        match result {
            Ok(reply) => {
                writeln!(self.output, "{}", reply)?;
                Ok(true)
            }
            Err(e) => {
                debug!("Failed to generate response: {}", e);
                writeln!(self.output, "{}", cformat!("<red>Error: {}</red>", e))?;
                Ok(false)
            }
        }
    }
}

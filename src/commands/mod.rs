//! Console slash commands.
//!
//! Anything typed at the console that is not a slash command is sent to
//! the worker as-is. Commands implement [`Command`] and live in a
//! [`CommandRegistry`], which handles dispatch, aliases and `/help`.

mod fire;
mod help;
mod quit;
mod status;

use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

use crate::dispatcher::DispatcherHandle;

/// What commands can see while running.
pub struct ConsoleContext<'a> {
    pub dispatcher: &'a DispatcherHandle,
    pub worker: &'a str,
}

/// What the console loop should do next.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Not a command; send the input to the worker.
    NotACommand,
    Handled,
    /// A command was submitted on the user's behalf.
    Sent { ok: bool },
    Quit,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/status"`.
    fn name(&self) -> &str;

    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// `args` is everything after the command name, trimmed.
    async fn execute(&self, args: &str, ctx: &ConsoleContext<'_>) -> CommandResult;
}

pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// A registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(status::StatusCommand),
            Arc::new(fire::FireCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Run the matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, ctx: &ConsoleContext<'_>) -> CommandResult {
        let input = input.trim();
        let (trigger, args) = match input.split_once(char::is_whitespace) {
            Some((trigger, args)) => (trigger, args.trim()),
            None => (input, ""),
        };

        for command in &self.commands {
            if trigger == command.name() || command.aliases().contains(&trigger) {
                // /help needs the registry itself
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(args, ctx).await;
            }
        }

        if trigger.starts_with('/') {
            println!("unknown command: {trigger}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// One aligned line per command, aliases in parentheses.
    pub fn help_text(&self) -> String {
        let labels: Vec<String> = self
            .commands
            .iter()
            .map(|c| format_label(c.name(), c.aliases()))
            .collect();
        let width = labels.iter().map(String::len).max().unwrap_or(0);

        let mut out = String::new();
        for (label, command) in labels.iter().zip(&self.commands) {
            let _ = writeln!(out, "  {label:<width$}  {}", command.description());
        }
        out.push_str("  anything else is sent to the worker and its reply printed\n");
        out
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// Every name and alias that selects a command.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.commands
            .iter()
            .flat_map(|c| std::iter::once(c.name()).chain(c.aliases().iter().copied()))
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, aliases: &[&str]) -> String {
    match aliases {
        [] => name.to_string(),
        _ => format!("{name} ({})", aliases.join(", ")),
    }
}

use async_trait::async_trait;

use super::{Command, CommandResult, ConsoleContext};

/// Send a command without waiting for the worker to answer it.
pub struct FireCommand;

#[async_trait]
impl Command for FireCommand {
    fn name(&self) -> &str {
        "/fire"
    }

    fn description(&self) -> &str {
        "send <command> without awaiting a reply"
    }

    async fn execute(&self, args: &str, ctx: &ConsoleContext<'_>) -> CommandResult {
        if args.is_empty() {
            println!("usage: /fire <command>");
            return CommandResult::Handled;
        }
        match ctx.dispatcher.submit(args, false).await {
            Ok(_) => {
                println!("  sent: {args}");
                CommandResult::Sent { ok: true }
            }
            Err(error) => {
                println!("  error: {error}");
                CommandResult::Sent { ok: false }
            }
        }
    }
}

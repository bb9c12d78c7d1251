use async_trait::async_trait;

use super::{Command, CommandResult, ConsoleContext};

pub struct StatusCommand;

impl StatusCommand {
    fn report(ctx: &ConsoleContext<'_>) -> String {
        let state = if ctx.dispatcher.is_closed() {
            "closed"
        } else {
            "running"
        };
        format!(
            "  worker    {} ({state})\n  queued    {}\n",
            ctx.worker,
            ctx.dispatcher.pending()
        )
    }
}

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &str {
        "/status"
    }

    fn description(&self) -> &str {
        "show worker state and queue depth"
    }

    async fn execute(&self, _args: &str, ctx: &ConsoleContext<'_>) -> CommandResult {
        print!("{}", Self::report(ctx));
        CommandResult::Handled
    }
}

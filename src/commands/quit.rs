use async_trait::async_trait;

use super::{Command, CommandResult, ConsoleContext};

pub struct QuitCommand;

#[async_trait]
impl Command for QuitCommand {
    fn name(&self) -> &str {
        "/quit"
    }

    fn aliases(&self) -> &[&str] {
        &["quit", "exit", "/exit"]
    }

    fn description(&self) -> &str {
        "leave the console (the worker is stopped)"
    }

    async fn execute(&self, _args: &str, _ctx: &ConsoleContext<'_>) -> CommandResult {
        CommandResult::Quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandRegistry;
    use crate::commands::tests::{test_ctx, test_dispatcher};

    #[tokio::test]
    async fn returns_quit() {
        let (handle, _stdin, _stdout) = test_dispatcher();
        assert_eq!(
            QuitCommand.execute("", &test_ctx(&handle)).await,
            CommandResult::Quit
        );
    }

    #[tokio::test]
    async fn bare_exit_words_quit() {
        let (handle, _stdin, _stdout) = test_dispatcher();
        let reg = CommandRegistry::new();
        for word in ["quit", "exit", "/exit"] {
            assert_eq!(
                reg.dispatch(word, &test_ctx(&handle)).await,
                CommandResult::Quit
            );
        }
    }
}

pub mod alert;
pub mod config;
pub mod system;
pub mod wizard;

use crate::cli::core::CommandError;
use crate::cli::registry::CommandRegistry;
use crate::cli::shell_context::ShellContext;

pub fn register_all(registry: &mut CommandRegistry) {
    for entry in system::definitions()
        .into_iter()
        .chain(wizard::definitions())
        .chain(alert::definitions())
        .chain(config::definitions())
    {
        registry.register(entry);
    }
}

/// Builds the error for an unrecognised subcommand, with a suggestion when
/// one is close.
pub(crate) fn unknown_subcommand(
    context: &ShellContext,
    command: &'static str,
    input: &str,
) -> CommandError {
    let mut message = format!("unknown {command} action `{input}`");
    if let Some(best) = context.registry.suggest_subcommand(command, input) {
        message.push_str(&format!(" (did you mean `{best}`?)"));
    }
    CommandError::InvalidArguments(message)
}

pub(crate) fn require_arg<'a>(
    args: &[&'a str],
    index: usize,
    usage: &str,
) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .ok_or_else(|| CommandError::InvalidArguments(format!("usage: {usage}")))
}

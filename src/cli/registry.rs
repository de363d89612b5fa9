use std::collections::HashMap;

use strsim::levenshtein;

use crate::cli::core::CommandResult;
use crate::cli::shell_context::ShellContext;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// Largest edit distance still offered as a suggestion.
const SUGGESTION_DISTANCE: usize = 3;

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub subcommands: &'static [&'static str],
    pub handler: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            subcommands: &[],
            handler,
        }
    }

    pub const fn with_subcommands(mut self, subcommands: &'static [&'static str]) -> Self {
        self.subcommands = subcommands;
        self
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandEntry>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) {
        let name = entry.name;
        if self.commands.insert(name, entry).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn list(&self) -> Vec<&CommandEntry> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn handler(&self, name: &str) -> Option<CommandHandler> {
        self.commands.get(name).map(|entry| entry.handler)
    }

    /// Closest registered name to `input`, if any is near enough.
    pub fn suggest(&self, input: &str) -> Option<&'static str> {
        closest(self.names(), input)
    }

    /// Closest subcommand of `command` to `input`.
    pub fn suggest_subcommand(&self, command: &str, input: &str) -> Option<&'static str> {
        let entry = self.get(command)?;
        closest(entry.subcommands.iter().copied(), input)
    }
}

fn closest(
    candidates: impl Iterator<Item = &'static str>,
    input: &str,
) -> Option<&'static str> {
    let needle = input.to_ascii_lowercase();
    candidates
        .map(|candidate| (levenshtein(candidate, &needle), candidate))
        .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

use std::{
    borrow::Cow,
    fmt,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Context as ReadlineContext, Editor, Helper,
};
use shell_words::split;
use tracing::debug;

use crate::cli::core::{CliError, CliMode, LoopControl, ShellContext};
use crate::cli::io::print_info;

/// Set to any value to read commands from stdin without a prompt.
pub const SCRIPT_ENV: &str = "SEMS_CONSOLE_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    let result = match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    };
    debug!(status = %context.status(), "shell stopped");
    result
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandHelper::new(context)));
    print_info("SEMS console. Type `help` for commands, `wizard start` to register a school.");

    while context.running {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                handle_line(context, trimmed);
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                print_info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !context.running {
            break;
        }
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        handle_line(context, trimmed);
    }
    Ok(())
}

fn handle_line(context: &mut ShellContext, line: &str) {
    match context.process_line(line) {
        Ok(LoopControl::Continue) | Ok(LoopControl::Exit) => {}
        Err(err) => context.report_error(err),
    }
}

/// Completes command names, then subcommand names for the first word.
struct CommandHelper {
    commands: Vec<(&'static str, &'static [&'static str])>,
}

impl CommandHelper {
    fn new(context: &ShellContext) -> Self {
        let mut commands: Vec<_> = context
            .command_names()
            .into_iter()
            .filter_map(|name| context.command(name))
            .map(|entry| (entry.name, entry.subcommands))
            .collect();
        commands.sort_by_key(|(name, _)| *name);
        Self { commands }
    }

    fn candidates(&self, words: &[&str], needle: &str) -> Vec<&'static str> {
        let needle = needle.to_ascii_lowercase();
        let pool: Vec<&'static str> = match words {
            [] => self.commands.iter().map(|(name, _)| *name).collect(),
            [command] => self
                .commands
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(command))
                .map(|(_, subcommands)| subcommands.to_vec())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        pool.into_iter()
            .filter(|name| name.starts_with(&needle))
            .collect()
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let words: Vec<&str> = prefix[..start].split_whitespace().collect();

        let candidates = self
            .candidates(&words, &prefix[start..])
            .into_iter()
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for CommandHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not parse command: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALERT: &[&str] = &["list", "save"];
    const WIZARD: &[&str] = &["start", "status", "submit"];

    fn helper() -> CommandHelper {
        CommandHelper {
            commands: vec![("alert", ALERT), ("wizard", WIZARD)],
        }
    }

    #[test]
    fn completes_commands_then_subcommands() {
        let helper = helper();
        assert_eq!(helper.candidates(&[], "wi"), vec!["wizard"]);
        assert_eq!(helper.candidates(&["wizard"], "st"), vec!["start", "status"]);
        assert_eq!(helper.candidates(&["WIZARD"], "su"), vec!["submit"]);
        assert!(helper.candidates(&["wizard", "set"], "").is_empty());
    }

    #[test]
    fn unbalanced_quotes_are_reported() {
        let err = parse_command_line("wizard set city \"Bath").unwrap_err();
        assert!(err.to_string().starts_with("Could not parse command"));
    }
}

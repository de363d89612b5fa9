//! Core CLI dispatch, error reporting, and shell context helpers.

use std::{future::Future, io};

use dialoguer::theme::ColorfulTheme;
use sems_config::{ConfigError, ConfigManager};
use sems_core::{AlertDraftRegister, DraftError, PortError, SetFieldError, WizardError, WizardShell};
use sems_outbox_json::JsonOutbox;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use crate::errors::CliError;

use super::commands;
use super::io as cli_io;
use super::registry::{CommandEntry, CommandRegistry};
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("No registration in progress.")]
    WizardNotStarted,
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Field(#[from] SetFieldError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_config_manager(mode, ConfigManager::new()?)
    }

    pub fn with_config_manager(
        mode: CliMode,
        config_manager: ConfigManager,
    ) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config = config_manager.load()?;
        cli_io::apply_config(&config);
        let outbox = JsonOutbox::new(config.resolve_outbox_dir(config_manager.base_dir()))?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        info!(
            outbox = %outbox.root().display(),
            config = %config_manager.config_path().display(),
            "shell context ready"
        );

        Ok(ShellContext {
            mode,
            registry,
            theme: ColorfulTheme::default(),
            config_manager,
            config,
            outbox,
            runtime,
            wizard: None,
            address_candidates: Vec::new(),
            drafts: AlertDraftRegister::new(),
            alerts: Vec::new(),
            last_command: None,
            running: true,
        })
    }

    pub(crate) fn can_prompt(&self) -> bool {
        self.mode == CliMode::Interactive
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn prompt(&self) -> String {
        match self.wizard.as_ref().and_then(|wizard| wizard.state().ok()) {
            Some(state) => format!("sems [{}]> ", state.current()),
            None => "sems> ".to_string(),
        }
    }

    pub(crate) fn wizard(&self) -> Result<&WizardShell, CommandError> {
        self.wizard.as_ref().ok_or(CommandError::WizardNotStarted)
    }

    pub(crate) fn wizard_mut(&mut self) -> Result<&mut WizardShell, CommandError> {
        self.wizard.as_mut().ok_or(CommandError::WizardNotStarted)
    }

    pub(crate) fn persist_config(&self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        Ok(())
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(handler) = self.registry.handler(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        debug!(command, args = args.len(), "dispatching command");
        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match crate::cli::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                cli_io::print_warning(err);
                return Ok(LoopControl::Continue);
            }
        };

        let Some(raw) = tokens.first() else {
            return Ok(LoopControl::Continue);
        };
        let command = raw.to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();

        self.last_command = Some(line.trim().to_string());

        match self.dispatch(&command, raw, &args) {
            Ok(LoopControl::Exit) => {
                self.running = false;
                Ok(LoopControl::Exit)
            }
            other => other,
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        cli_io::print_warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        if let Some(best) = self.registry.suggest(input) {
            cli_io::print_info(format!("Suggestion: `{best}`?"));
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        let pending = self.wizard.as_ref().is_some_and(WizardShell::is_open)
            || !self.drafts.drafts().is_empty();
        let prompt = if pending {
            "Exit and discard unsaved registration and alert edits?"
        } else {
            "Exit shell?"
        };
        Ok(cli_io::confirm_action(&self.theme, prompt, !pending)?)
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                cli_io::print_error(message);
                cli_io::print_hint("Use `help <command>` for usage details.");
            }
            CommandError::WizardNotStarted | CommandError::Wizard(WizardError::Closed) => {
                cli_io::print_error("No registration in progress.");
                cli_io::print_hint("Start one with `wizard start`.");
            }
            CommandError::Wizard(err @ WizardError::IncompleteSteps { .. }) => {
                cli_io::print_error(err);
                cli_io::print_hint("Use `wizard status` to see which steps are complete.");
            }
            CommandError::Draft(err @ DraftError::PreconditionViolation { .. }) => {
                cli_io::print_error(err);
                cli_io::print_hint("Start editing with `alert edit <id>` first.");
            }
            other => cli_io::print_error(other),
        }
    }
}

/// Runs `future` to completion on the shell runtime. Ctrl-C while it runs
/// cancels `abort`, which the future is expected to observe.
pub(crate) fn run_abortable<F: Future>(
    runtime: &Runtime,
    abort: CancellationToken,
    future: F,
) -> F::Output {
    let watcher = runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; aborting request");
            abort.cancel();
        }
    });
    let output = runtime.block_on(future);
    watcher.abort();
    output
}

#[cfg(test)]
pub(crate) fn process_script(
    manager: ConfigManager,
    lines: &[&str],
) -> Result<ShellContext, CliError> {
    let mut app = ShellContext::with_config_manager(CliMode::Script, manager)?;
    for line in lines {
        match app.process_line(line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => app.report_error(err),
        }
    }
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sems_core::SubmissionState;
    use sems_domain::RegistrationStep;
    use tempfile::tempdir;

    fn manager(dir: &std::path::Path) -> ConfigManager {
        ConfigManager::with_base_dir(dir.to_path_buf()).unwrap()
    }

    #[test]
    fn parse_line_handles_quotes() {
        let tokens =
            crate::cli::shell::parse_command_line("wizard set school_name \"Oak Primary\"")
                .unwrap();
        assert_eq!(tokens, vec!["wizard", "set", "school_name", "Oak Primary"]);
    }

    #[test]
    fn exit_stops_processing() {
        let dir = tempdir().unwrap();
        let context =
            process_script(manager(dir.path()), &["exit", "wizard start"]).unwrap();
        assert!(!context.running);
        assert!(context.wizard.is_none());
    }

    #[test]
    fn unknown_commands_do_not_stop_the_shell() {
        let dir = tempdir().unwrap();
        let context = process_script(manager(dir.path()), &["wizrd start"]).unwrap();
        assert!(context.running);
        assert_eq!(context.last_command.as_deref(), Some("wizrd start"));
    }

    #[test]
    fn script_walks_the_wizard_and_submits() {
        let dir = tempdir().unwrap();
        let context = process_script(
            manager(dir.path()),
            &[
                "wizard start",
                "wizard set school_name \"Oak Primary\"",
                "wizard set email office@oak.sch.uk",
                "wizard set address_line_1 \"1 Acorn Way\"",
                "wizard set city Bath",
                "wizard set post_code \"BA1 1AA\"",
                "wizard next",
                "wizard set governance_type maintained",
                "wizard set school_pupils_size count_200_499",
                "wizard set company_number_status dont_know",
                "wizard next",
                "wizard set first_name Ada",
                "wizard set last_name Lovelace",
                "wizard set job_role Bursar",
                "wizard set contact_email ada@oak.sch.uk",
                "wizard set contact_phone_number \"01225 000000\"",
                "wizard set password \"correct horse\"",
                "wizard set password_confirmation \"correct horse\"",
                "wizard next",
                "wizard set annual_consumption 1500",
                "wizard submit",
            ],
        )
        .unwrap();

        let state = context.wizard().unwrap().state().unwrap();
        assert_eq!(state.submission(), SubmissionState::Submitted);
        assert_eq!(state.current(), RegistrationStep::EnergySupply);
        assert_eq!(context.outbox.list_registrations().unwrap().len(), 1);
    }

    #[test]
    fn invalid_step_blocks_next() {
        let dir = tempdir().unwrap();
        let context = process_script(
            manager(dir.path()),
            &["wizard start", "wizard set email not-an-email", "wizard next"],
        )
        .unwrap();
        let state = context.wizard().unwrap().state().unwrap();
        assert_eq!(state.current(), RegistrationStep::SchoolDetails);
        assert!(state.completed().is_empty());
    }
}

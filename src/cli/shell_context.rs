use dialoguer::theme::ColorfulTheme;
use sems_config::{Config, ConfigManager};
use sems_core::{AlertDraftRegister, WizardShell};
use sems_domain::{AddressCandidate, Alert};
use sems_outbox_json::JsonOutbox;
use tokio::runtime::Runtime;

use super::registry::CommandRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

/// Everything a command handler may read or change.
pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub outbox: JsonOutbox,
    /// Drives collaborator calls from the synchronous shell loop.
    pub runtime: Runtime,
    pub wizard: Option<WizardShell>,
    pub address_candidates: Vec<AddressCandidate>,
    pub drafts: AlertDraftRegister,
    /// Alerts as of the last fetch.
    pub alerts: Vec<Alert>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn status(&self) -> String {
        format!(
            "ShellContext {{ running: {}, last_command: {:?}, wizard_open: {}, drafts: {} }}",
            self.running,
            self.last_command,
            self.wizard.as_ref().is_some_and(WizardShell::is_open),
            self.drafts.drafts().len()
        )
    }
}

use std::fmt;

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use sems_config::Config;

use crate::cli::core::CommandError;
use crate::cli::output::{self, OutputPreferences};

/// Print an informational message via the standard CLI output helpers.
pub fn print_info(message: impl fmt::Display) {
    output::info(message);
}

pub fn print_warning(message: impl fmt::Display) {
    output::warning(message);
}

pub fn print_error(message: impl fmt::Display) {
    output::error(message);
}

pub fn print_success(message: impl fmt::Display) {
    output::success(message);
}

pub fn print_hint(message: impl fmt::Display) {
    output::hint(message);
}

/// Pushes the display settings from `config` into the output layer.
pub fn apply_config(config: &Config) {
    output::set_preferences(OutputPreferences {
        color_enabled: config.ui_color_enabled,
        plain_output: config.accessibility.plain_output,
        high_contrast: config.accessibility.high_contrast,
    });
    if config.ui_color_enabled && !config.accessibility.plain_output {
        colored::control::unset_override();
    } else {
        colored::control::set_override(false);
    }
}

/// Prompt the user for confirmation with a yes/no question.
pub fn confirm_action(
    theme: &ColorfulTheme,
    prompt: &str,
    default: bool,
) -> Result<bool, CommandError> {
    Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(CommandError::from)
}

/// Prompt for free-form text, pre-filled with `initial` when present.
/// An empty answer is allowed.
pub fn prompt_text(
    theme: &ColorfulTheme,
    prompt: &str,
    initial: Option<&str>,
) -> Result<String, CommandError> {
    let mut input = Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true);
    if let Some(initial) = initial {
        input = input.with_initial_text(initial);
    }
    input.interact_text().map_err(CommandError::from)
}

pub fn prompt_secret(theme: &ColorfulTheme, prompt: &str) -> Result<String, CommandError> {
    Password::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(CommandError::from)
}

/// Returns the chosen index, or `None` when the prompt was dismissed.
pub fn prompt_select(
    theme: &ColorfulTheme,
    prompt: &str,
    items: &[String],
    default: usize,
) -> Result<Option<usize>, CommandError> {
    Select::with_theme(theme)
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact_opt()
        .map_err(CommandError::from)
}

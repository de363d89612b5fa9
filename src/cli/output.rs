use std::fmt;
use std::sync::{OnceLock, RwLock};

use colored::Colorize;

/// Message categories used by the CLI output helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputPreferences {
    pub color_enabled: bool,
    /// Labels only, no colour or decoration. For screen readers.
    pub plain_output: bool,
    pub high_contrast: bool,
}

impl Default for OutputPreferences {
    fn default() -> Self {
        Self {
            color_enabled: true,
            plain_output: false,
            high_contrast: false,
        }
    }
}

static PREFERENCES: OnceLock<RwLock<OutputPreferences>> = OnceLock::new();

pub fn set_preferences(prefs: OutputPreferences) {
    let lock = PREFERENCES.get_or_init(|| RwLock::new(OutputPreferences::default()));
    if let Ok(mut guard) = lock.write() {
        *guard = prefs;
    }
}

pub fn preferences() -> OutputPreferences {
    PREFERENCES
        .get_or_init(|| RwLock::new(OutputPreferences::default()))
        .read()
        .map(|guard| *guard)
        .unwrap_or_default()
}

fn label(kind: MessageKind) -> (&'static str, &'static str) {
    match kind {
        MessageKind::Info => ("INFO", "[i]"),
        MessageKind::Success => ("OK", "[+]"),
        MessageKind::Warning => ("WARNING", "[!]"),
        MessageKind::Error => ("ERROR", "[x]"),
        MessageKind::Hint => ("HINT", "[?]"),
        MessageKind::Section => ("", ""),
    }
}

pub(crate) fn format_message(
    kind: MessageKind,
    message: impl fmt::Display,
    prefs: &OutputPreferences,
) -> String {
    let text = message.to_string();
    let formatted = match kind {
        MessageKind::Section if prefs.plain_output => format!("{}:", text.trim()),
        MessageKind::Section => format!("=== {} ===", text.trim()),
        MessageKind::Info => text,
        _ => {
            let (name, icon) = label(kind);
            if prefs.plain_output {
                format!("{name}: {text}")
            } else {
                format!("{icon} {text}")
            }
        }
    };

    if prefs.plain_output || !prefs.color_enabled {
        return formatted;
    }

    if prefs.high_contrast {
        return match kind {
            MessageKind::Info | MessageKind::Hint => formatted,
            _ => formatted.bold().to_string(),
        };
    }

    match kind {
        MessageKind::Success => formatted.bright_green().to_string(),
        MessageKind::Warning => formatted.bright_yellow().to_string(),
        MessageKind::Error => formatted.bright_red().to_string(),
        MessageKind::Hint => formatted.bright_cyan().to_string(),
        MessageKind::Section => formatted.bold().to_string(),
        MessageKind::Info => formatted,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = format_message(kind, message, &preferences());
    match kind {
        MessageKind::Section => println!("\n{formatted}"),
        MessageKind::Error => eprintln!("{formatted}"),
        _ => println!("{formatted}"),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// Prints aligned `name  value` rows.
pub fn key_values<'a>(rows: impl IntoIterator<Item = (&'a str, String)>) {
    let rows: Vec<(&str, String)> = rows.into_iter().collect();
    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, value) in rows {
        info(format!("  {name:<width$}  {value}"));
    }
}

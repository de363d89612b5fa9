use sems_config::{Config, ConfigError};
use sems_outbox_json::JsonOutbox;
use tracing::info;

use crate::cli::commands::{require_arg, unknown_subcommand};
use crate::cli::core::{CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{key_values, section as output_section};
use crate::cli::registry::CommandEntry;

const USAGE: &str = "config [show|set <key> <value>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "View and change console preferences",
        USAGE,
        cmd_config,
    )
    .with_subcommands(&["show", "set"])]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|arg| arg.to_ascii_lowercase()).as_deref() {
        None | Some("show") => show_config(context),
        Some("set") => {
            let key = require_arg(args, 1, "config set <key> <value>")?;
            let value = args.get(2..).unwrap_or_default().join(" ");
            set_config_value(context, key, &value)
        }
        Some(_) => Err(unknown_subcommand(context, "config", args[0])),
    }
}

fn show_config(context: &ShellContext) -> CommandResult {
    output_section("Configuration");
    key_values(context.config.entries());
    io::print_info(format!(
        "  Stored at {}",
        context.config_manager.config_path().display()
    ));
    Ok(())
}

fn set_config_value(context: &mut ShellContext, key: &str, value: &str) -> CommandResult {
    let mut updated = context.config.clone();
    if let Err(err) = updated.set_value(key, value) {
        if matches!(err, ConfigError::UnknownKey(_)) {
            io::print_hint(format!("Known settings: {}", Config::KEYS.join(", ")));
        }
        return Err(err.into());
    }
    let outbox_dir = updated.resolve_outbox_dir(context.config_manager.base_dir());
    if outbox_dir.as_path() != context.outbox.root() {
        context.outbox = JsonOutbox::new(outbox_dir)?;
        io::print_info(format!("Outbox moved to {}.", context.outbox.root().display()));
    }

    context.config = updated;
    context.persist_config()?;
    io::apply_config(&context.config);
    info!(key, "configuration updated");
    io::print_success(format!("Configuration updated: {key}."));
    Ok(())
}

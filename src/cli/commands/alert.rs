use sems_core::{AlertDirectory, DraftError};
use sems_domain::{AlertDraft, AlertField, AlertId, Displayable, Keyed};
use tokio_util::sync::CancellationToken;

use crate::cli::commands::{require_arg, unknown_subcommand};
use crate::cli::core::{run_abortable, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::{key_values, section as output_section};
use crate::cli::registry::CommandEntry;

const USAGE: &str =
    "alert <list|show <id>|edit <id>|set <id> <field> [value]|cancel <id>|save <id>|drafts>";

const SUBCOMMANDS: &[&str] = &["list", "show", "edit", "set", "cancel", "save", "drafts"];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "alert",
        "View and edit energy usage alerts",
        USAGE,
        cmd_alert,
    )
    .with_subcommands(SUBCOMMANDS)]
}

fn cmd_alert(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return alert_list(context);
    };
    match action.to_ascii_lowercase().as_str() {
        "list" => alert_list(context),
        "show" => alert_show(context, parse_id(rest, "alert show <id>")?),
        "edit" => alert_edit(context, parse_id(rest, "alert edit <id>")?),
        "set" => alert_set(context, rest),
        "cancel" => {
            let id = parse_id(rest, "alert cancel <id>")?;
            context.drafts.cancel_edit(id)?;
            io::print_success(format!("Discarded changes to alert #{id}."));
            Ok(())
        }
        "save" => alert_save(context, parse_id(rest, "alert save <id>")?),
        "drafts" => alert_drafts(context),
        _ => Err(unknown_subcommand(context, "alert", action)),
    }
}

fn parse_id(args: &[&str], usage: &str) -> Result<AlertId, CommandError> {
    let raw = require_arg(args, 0, usage)?;
    raw.trim_start_matches('#')
        .parse::<AlertId>()
        .map_err(|_| CommandError::InvalidArguments(format!("`{raw}` is not an alert id")))
}

fn refresh_alerts(context: &mut ShellContext) -> CommandResult {
    context.alerts = context.runtime.block_on(context.outbox.list_alerts())?;
    Ok(())
}

fn alert_list(context: &mut ShellContext) -> CommandResult {
    refresh_alerts(context)?;
    if context.alerts.is_empty() {
        io::print_info("No alerts configured.");
        return Ok(());
    }
    output_section("Alerts");
    for alert in &context.alerts {
        let marker = if context.drafts.is_editing(alert.id) {
            " (editing)"
        } else {
            ""
        };
        io::print_info(format!("  #{:<4} {}{marker}", alert.id, alert.display_label()));
    }
    Ok(())
}

fn draft_rows(draft: &AlertDraft) -> Vec<(&'static str, String)> {
    fn show<T: ToString>(value: Option<T>) -> String {
        value.map(|value| value.to_string()).unwrap_or_else(|| "-".to_string())
    }
    fn time(value: Option<chrono::NaiveTime>) -> String {
        show(value.map(|time| time.format("%H:%M")))
    }
    vec![
        ("alert_type", show(draft.alert_type.map(|value| value.key()))),
        ("location", show(draft.location_id)),
        ("meter", show(draft.meter_id)),
        ("limit_condition", show(draft.limit_condition.map(|value| value.key()))),
        ("energy_limit", show(draft.energy_limit)),
        ("limit_duration", show(draft.limit_duration.map(|value| value.key()))),
        ("limit_period_start", time(draft.limit_period_start)),
        ("limit_period_end", time(draft.limit_period_end)),
        ("percentage_limit", show(draft.percentage_limit)),
    ]
}

fn find_alert(context: &mut ShellContext, id: AlertId) -> Result<usize, CommandError> {
    if let Some(index) = context.alerts.iter().position(|alert| alert.id == id) {
        return Ok(index);
    }
    refresh_alerts(context)?;
    context
        .alerts
        .iter()
        .position(|alert| alert.id == id)
        .ok_or_else(|| CommandError::InvalidArguments(format!("no alert with id {id}")))
}

fn alert_show(context: &mut ShellContext, id: AlertId) -> CommandResult {
    let index = find_alert(context, id)?;
    let alert = &context.alerts[index];
    let saved = draft_rows(&AlertDraft::from(alert));

    output_section(format!("Alert #{id}"));
    match context.drafts.draft(id) {
        Some(draft) => {
            let rows = saved
                .into_iter()
                .zip(draft_rows(draft))
                .map(|((name, saved), (_, edited))| {
                    if saved == edited {
                        (name, saved)
                    } else {
                        (name, format!("{saved} -> {edited}"))
                    }
                });
            key_values(rows);
            io::print_hint(format!("Unsaved changes. `alert save {id}` or `alert cancel {id}`."));
        }
        None => key_values(saved),
    }
    Ok(())
}

fn alert_edit(context: &mut ShellContext, id: AlertId) -> CommandResult {
    let index = find_alert(context, id)?;
    let alert = context.alerts[index].clone();
    context.drafts.start_edit(&alert)?;
    io::print_success(format!("Editing alert #{id}."));
    io::print_hint(format!(
        "Change fields with `alert set {id} <field> <value>`; fields: {}.",
        AlertField::NAMES.join(", ")
    ));
    Ok(())
}

fn alert_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "alert set <id> <field> [value]";
    let id = parse_id(args, usage)?;
    let field = require_arg(args, 1, usage)?;
    let value = args.get(2..).unwrap_or_default().join(" ");
    context.drafts.edit_field_text(id, field, &value)?;
    io::print_success(format!("Alert #{id}: {field} updated in draft."));
    Ok(())
}

fn alert_save(context: &mut ShellContext, id: AlertId) -> CommandResult {
    let cancel = CancellationToken::new();
    io::print_info(format!("Saving alert #{id} (Ctrl-C to abort)..."));
    let result = run_abortable(
        &context.runtime,
        cancel.clone(),
        context
            .drafts
            .commit_edit(id, &context.outbox, &context.outbox, &cancel),
    );

    match result {
        Ok(alerts) => {
            context.alerts = alerts;
            io::print_success(format!("Alert #{id} saved."));
            Ok(())
        }
        Err(DraftError::Update(err)) => {
            io::print_error(format!("Could not save alert #{id}: {err}"));
            io::print_hint("Your changes are kept. Fix them and save again, or `alert cancel`.");
            Ok(())
        }
        Err(DraftError::Aborted(_)) if context.drafts.is_editing(id) => {
            io::print_warning("Save aborted. Your changes are kept.");
            Ok(())
        }
        Err(DraftError::Aborted(_)) => {
            io::print_warning("Alert saved, but the list refresh was aborted.");
            Ok(())
        }
        Err(DraftError::Refetch(err)) => {
            io::print_warning(format!("Alert #{id} saved, but the list could not be refreshed: {err}"));
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn alert_drafts(context: &mut ShellContext) -> CommandResult {
    let drafts = context.drafts.drafts();
    if drafts.is_empty() {
        io::print_info("No alerts are being edited.");
        return Ok(());
    }
    output_section("Unsaved alert edits");
    for id in drafts.keys() {
        io::print_info(format!("  #{id}"));
    }
    Ok(())
}

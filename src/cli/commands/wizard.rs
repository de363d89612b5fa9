//! `wizard` command: drives the registration wizard from the shell.

use sems_core::{
    FieldDescriptor, FieldKind, Outcome, Requirement, SetFieldError, SubmissionState,
    SubmitOutcome, ValidationReport, WizardError, WizardShell,
};
use sems_domain::{Displayable, Keyed, RegistrationStep};
use tracing::warn;

use crate::cli::commands::{require_arg, unknown_subcommand};
use crate::cli::core::{run_abortable, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output::section as output_section;
use crate::cli::registry::CommandEntry;

const USAGE: &str = "wizard <start|status|fields|set <field> [value]|next|back|goto <step>|check|lookup [postcode]|use-address <n>|fill|submit|close>";

const SUBCOMMANDS: &[&str] = &[
    "start",
    "status",
    "fields",
    "set",
    "next",
    "back",
    "goto",
    "check",
    "lookup",
    "use-address",
    "fill",
    "submit",
    "close",
];

const MASK: &str = "********";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "wizard",
        "Register a school step by step",
        USAGE,
        cmd_wizard,
    )
    .with_subcommands(SUBCOMMANDS)]
}

fn cmd_wizard(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return wizard_status(context);
    };
    match action.to_ascii_lowercase().as_str() {
        "start" => wizard_start(context),
        "status" => wizard_status(context),
        "fields" => wizard_fields(context),
        "set" => wizard_set(context, rest),
        "next" => {
            let outcome = context.wizard_mut()?.go_next()?;
            report_outcome(&outcome);
            Ok(())
        }
        "back" | "previous" => {
            let outcome = context.wizard_mut()?.go_previous()?;
            report_outcome(&outcome);
            Ok(())
        }
        "goto" => {
            let step = require_arg(rest, 0, "wizard goto <step name or number>")?;
            let outcome = context.wizard_mut()?.go_to(step)?;
            report_outcome(&outcome);
            Ok(())
        }
        "check" => {
            let report = context.wizard()?.check()?;
            if report.is_valid() {
                io::print_success("This step is complete.");
            } else {
                report_invalid(&report);
            }
            Ok(())
        }
        "lookup" => wizard_lookup(context, rest),
        "use-address" => wizard_use_address(context, rest),
        "fill" => wizard_fill(context),
        "submit" => wizard_submit(context),
        "close" => wizard_close(context),
        _ => Err(unknown_subcommand(context, "wizard", action)),
    }
}

fn wizard_start(context: &mut ShellContext) -> CommandResult {
    if let Some(existing) = &context.wizard {
        let in_progress = existing
            .state()
            .map(|state| state.submission() != SubmissionState::Submitted)
            .unwrap_or(false);
        if in_progress {
            return Err(CommandError::InvalidArguments(
                "A registration is already in progress. Use `wizard close` to discard it first."
                    .into(),
            ));
        }
    }

    context.wizard = Some(WizardShell::new()?);
    context.address_candidates.clear();
    io::print_success("Registration started.");
    print_step_banner(RegistrationStep::ALL[0]);
    Ok(())
}

fn print_step_banner(step: RegistrationStep) {
    output_section(format!(
        "Step {} of {}: {}",
        step.number(),
        RegistrationStep::ALL.len(),
        step.label()
    ));
    io::print_hint("Use `wizard fields` to see what this step needs.");
}

fn wizard_status(context: &mut ShellContext) -> CommandResult {
    let wizard = context.wizard()?;
    let state = wizard.state()?;
    output_section("Registration");
    for step in RegistrationStep::ALL.iter().copied() {
        let marker = if step == state.current() { ">" } else { " " };
        let status = if state.is_complete(step) {
            "complete"
        } else {
            "not started"
        };
        io::print_info(format!(
            "{marker} {}. {:<16} {status}",
            step.number(),
            step.label()
        ));
    }
    let submission = match state.submission() {
        SubmissionState::Idle => "not submitted",
        SubmissionState::InFlight => "in flight",
        SubmissionState::Submitted => "submitted",
    };
    io::print_info(format!("  Submission: {submission}"));
    if let Some(message) = state.last_error() {
        io::print_warning(format!("Last submission failed: {message}"));
    }
    Ok(())
}

fn describe_requirement(requirement: &Requirement) -> String {
    match requirement {
        Requirement::Always => "required".to_string(),
        Requirement::Optional => "optional".to_string(),
        Requirement::WhenEquals { field, value } => format!("required when {field} = {value}"),
        Requirement::UnlessEquals { field, value } => {
            format!("required unless {field} = {value}")
        }
    }
}

fn describe_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Text => "text".to_string(),
        FieldKind::Secret => "secret".to_string(),
        FieldKind::Integer => "whole number".to_string(),
        FieldKind::Decimal => "number".to_string(),
        FieldKind::Boolean => "yes/no".to_string(),
        FieldKind::Choice(options) => format!("one of {}", options.join(", ")),
    }
}

fn wizard_fields(context: &mut ShellContext) -> CommandResult {
    let wizard = context.wizard()?;
    let state = wizard.state()?;
    let form = wizard.current_form()?;
    output_section(format!("{} fields", form.name));
    for descriptor in &form.fields {
        let value = state
            .fields()
            .get(descriptor.key)
            .filter(|value| !value.is_blank())
            .map(|value| match descriptor.kind {
                FieldKind::Secret => MASK.to_string(),
                _ => value.to_string(),
            })
            .unwrap_or_else(|| "-".to_string());
        io::print_info(format!(
            "  {:<24} {:<40} {}",
            descriptor.key, descriptor.label, value
        ));
        io::print_info(format!(
            "  {:<24} {}; {}",
            "",
            describe_requirement(&descriptor.requirement),
            describe_kind(&descriptor.kind)
        ));
        if let Some(help) = descriptor.help {
            io::print_info(format!("  {:<24} {help}", ""));
        }
    }
    Ok(())
}

fn wizard_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let key = require_arg(args, 0, "wizard set <field> [value]")?;
    let value = args.get(1..).unwrap_or_default().join(" ");
    let wizard = context.wizard_mut()?;
    match wizard.set_field(key, &value) {
        Ok(outcome) => {
            report_outcome(&outcome);
            Ok(())
        }
        Err(SetFieldError::Wizard(WizardError::UnknownField { step, key })) => {
            let known: Vec<&str> = wizard
                .current_form()?
                .fields
                .iter()
                .map(|field| field.key)
                .collect();
            io::print_hint(format!("Fields on this step: {}", known.join(", ")));
            Err(WizardError::UnknownField { step, key }.into())
        }
        Err(err) => Err(err.into()),
    }
}

fn wizard_lookup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let typed = args.join(" ");
    let post_code = if !typed.trim().is_empty() {
        typed.trim().to_string()
    } else {
        let from_form = context
            .wizard()?
            .state()?
            .fields()
            .text("post_code")
            .map(str::to_string);
        from_form
            .or_else(|| context.config.last_postcode.clone())
            .ok_or_else(|| CommandError::InvalidArguments("usage: wizard lookup <postcode>".into()))?
    };

    let wizard = context.wizard.as_mut().ok_or(CommandError::WizardNotStarted)?;
    let abort = wizard.abort_handle();
    let candidates = run_abortable(
        &context.runtime,
        abort,
        wizard.lookup_addresses(&context.outbox, &post_code),
    )?;

    if let Err(err) = context.config.set_value("last_postcode", &post_code) {
        warn!(error = %err, "postcode not remembered");
    } else if let Err(err) = context.persist_config() {
        warn!(error = %err, "could not persist last postcode");
    }

    if candidates.is_empty() {
        context.address_candidates.clear();
        io::print_warning(format!("No addresses found for {post_code}."));
        io::print_hint("Enter the address with `wizard set` instead.");
        return Ok(());
    }

    output_section(format!("Addresses for {post_code}"));
    for (index, candidate) in candidates.iter().enumerate() {
        io::print_info(format!("  {}. {}", index + 1, candidate.display_label()));
    }
    io::print_hint("Pick one with `wizard use-address <n>`.");
    context.address_candidates = candidates;
    Ok(())
}

fn wizard_use_address(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let raw = require_arg(args, 0, "wizard use-address <n>")?;
    let index = raw
        .parse::<usize>()
        .ok()
        .filter(|index| (1..=context.address_candidates.len()).contains(index))
        .ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "pick an address between 1 and {} (run `wizard lookup` first)",
                context.address_candidates.len()
            ))
        })?;
    let candidate = context.address_candidates[index - 1].clone();

    let applied = context.wizard_mut()?.apply_address_candidate(&candidate)?;
    if applied.is_empty() {
        io::print_warning("This step has no address or meter fields.");
        io::print_hint("Addresses fill School Details; meter numbers fill Energy Supply.");
    } else {
        io::print_success(format!("Filled {}.", applied.join(", ")));
    }
    Ok(())
}

fn wizard_fill(context: &mut ShellContext) -> CommandResult {
    if !context.can_prompt() {
        return Err(CommandError::InvalidArguments(
            "`wizard fill` needs an interactive terminal; use `wizard set` in scripts".into(),
        ));
    }
    let fields: Vec<FieldDescriptor> = context.wizard()?.current_form()?.fields.clone();

    for descriptor in &fields {
        loop {
            let current = context
                .wizard()?
                .state()?
                .fields()
                .get(descriptor.key)
                .map(|value| value.as_text().to_string());
            let Some(input) = prompt_field(context, descriptor, current.as_deref())? else {
                break;
            };
            match context.wizard_mut()?.set_field(descriptor.key, &input) {
                Ok(_) => break,
                Err(SetFieldError::Input { message, .. }) => io::print_warning(message),
                Err(err) => return Err(err.into()),
            }
        }
    }

    let report = context.wizard()?.check()?;
    if report.is_valid() {
        io::print_success("Step looks complete. Use `wizard next` to continue.");
    } else {
        report_invalid(&report);
    }
    Ok(())
}

/// Asks for one field. `None` keeps the current value.
fn prompt_field(
    context: &ShellContext,
    descriptor: &FieldDescriptor,
    current: Option<&str>,
) -> Result<Option<String>, CommandError> {
    let prompt = match descriptor.requirement {
        Requirement::Optional => format!("{} (optional)", descriptor.label),
        _ => descriptor.label.to_string(),
    };
    if let Some(help) = descriptor.help {
        io::print_hint(help);
    }
    let theme = &context.theme;
    match &descriptor.kind {
        FieldKind::Choice(options) => {
            let items: Vec<String> = options.iter().map(|option| option.to_string()).collect();
            let default = current
                .and_then(|value| options.iter().position(|option| *option == value))
                .unwrap_or(0);
            Ok(io::prompt_select(theme, &prompt, &items, default)?
                .map(|index| items[index].clone()))
        }
        FieldKind::Boolean => {
            let default = matches!(current, Some("true"));
            let answer = io::confirm_action(theme, &prompt, default)?;
            Ok(Some(answer.to_string()))
        }
        FieldKind::Secret => {
            let answer = io::prompt_secret(theme, &prompt)?;
            Ok((!answer.is_empty() || current.is_none()).then_some(answer))
        }
        _ => io::prompt_text(theme, &prompt, current).map(Some),
    }
}

fn wizard_submit(context: &mut ShellContext) -> CommandResult {
    let wizard = context.wizard.as_mut().ok_or(CommandError::WizardNotStarted)?;
    let abort = wizard.abort_handle();
    io::print_info("Submitting registration (Ctrl-C to abort)...");
    let result = run_abortable(&context.runtime, abort, wizard.submit(&context.outbox));

    match result {
        Ok(SubmitOutcome::Submitted(receipt)) => {
            io::print_success(format!(
                "Registration submitted. Reference {}.",
                receipt.reference
            ));
            io::print_hint("Start another with `wizard start`.");
            Ok(())
        }
        Ok(SubmitOutcome::Invalid(report)) => {
            report_invalid(&report);
            Ok(())
        }
        Err(WizardError::Aborted) => {
            io::print_warning("Submission aborted. Your answers are kept.");
            Ok(())
        }
        Err(WizardError::Submission(err)) => {
            io::print_error(format!("Submission failed: {err}"));
            io::print_hint("Your answers are kept. Run `wizard submit` to try again.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn wizard_close(context: &mut ShellContext) -> CommandResult {
    let can_prompt = context.can_prompt();
    let Some(wizard) = context.wizard.as_mut() else {
        io::print_info("No registration to close.");
        return Ok(());
    };
    let unsaved = wizard
        .state()
        .map(|state| state.submission() != SubmissionState::Submitted)
        .unwrap_or(false);
    if unsaved
        && can_prompt
        && !io::confirm_action(&context.theme, "Discard this registration?", false)?
    {
        io::print_info("Registration kept.");
        return Ok(());
    }

    wizard.close();
    context.wizard = None;
    context.address_candidates.clear();
    io::print_success("Registration closed.");
    Ok(())
}

fn report_outcome(outcome: &Outcome<RegistrationStep>) {
    match outcome {
        Outcome::Edited { key } => io::print_success(format!("Set {key}.")),
        Outcome::Moved { to, .. } => print_step_banner(*to),
        Outcome::Invalid(report) => report_invalid(report),
        Outcome::Unchanged => io::print_info("Already on that step."),
        Outcome::ReadyToSubmit(_) => io::print_info("Ready to submit."),
        Outcome::Submitted => io::print_success("Registration submitted."),
        Outcome::SubmissionFailed => io::print_warning("Submission failed."),
    }
}

fn report_invalid(report: &ValidationReport) {
    io::print_warning(format!(
        "This step has {} problem{}:",
        report.len(),
        if report.len() == 1 { "" } else { "s" }
    ));
    for issue in report.issues() {
        io::print_info(format!("  {} ({}): {}", issue.label, issue.key, issue.message));
    }
}

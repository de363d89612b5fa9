//! Step navigation state machine.
//!
//! [`reduce`] is a pure transition function: it takes the current
//! [`WizardState`] by reference and returns a new one together with an
//! [`Outcome`] describing what happened. Field validation failures are
//! outcomes, not errors; errors are reserved for requests the state machine
//! refuses outright (unknown step, incomplete prerequisites, in-flight
//! submission).

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::definition::{StepName, WizardDefinition};
use crate::error::WizardError;
use crate::field_store::{FieldStore, FieldValue};
use crate::staging::StagingStore;
use crate::transform::PayloadFragment;
use crate::validation::{StepValidator, ValidationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InFlight,
    Submitted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState<S: StepName> {
    current: S,
    fields: FieldStore,
    staging: StagingStore<S>,
    completed: BTreeSet<S>,
    submission: SubmissionState,
    last_error: Option<String>,
}

impl<S: StepName> WizardState<S> {
    pub fn new(definition: &WizardDefinition<S>) -> Self {
        Self {
            current: definition.first(),
            fields: FieldStore::new(),
            staging: StagingStore::new(),
            completed: BTreeSet::new(),
            submission: SubmissionState::Idle,
            last_error: None,
        }
    }

    pub fn current(&self) -> S {
        self.current
    }

    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    pub fn staging(&self) -> &StagingStore<S> {
        &self.staging
    }

    pub fn completed(&self) -> &BTreeSet<S> {
        &self.completed
    }

    pub fn is_complete(&self, step: S) -> bool {
        self.completed.contains(&step)
    }

    pub fn submission(&self) -> SubmissionState {
        self.submission
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent<S: StepName> {
    SetField { key: String, value: FieldValue },
    Next,
    Previous,
    GoTo(S),
    BeginSubmit,
    SubmissionSucceeded,
    SubmissionFailed { message: String },
    SubmissionAborted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<S: StepName> {
    Edited { key: String },
    Moved { from: S, to: S },
    Invalid(ValidationReport),
    Unchanged,
    /// The last step was committed; the unioned request is ready to hand to
    /// the submission collaborator.
    ReadyToSubmit(PayloadFragment),
    Submitted,
    SubmissionFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reduced<S: StepName> {
    pub state: WizardState<S>,
    pub outcome: Outcome<S>,
}

impl<S: StepName> Reduced<S> {
    fn new(state: WizardState<S>, outcome: Outcome<S>) -> Self {
        Self { state, outcome }
    }
}

pub fn reduce<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
    event: WizardEvent<S>,
) -> Result<Reduced<S>, WizardError> {
    match state.submission {
        SubmissionState::Submitted => return Err(WizardError::AlreadySubmitted),
        SubmissionState::InFlight => {
            return match event {
                WizardEvent::SubmissionSucceeded => Ok(submission_succeeded(state)),
                WizardEvent::SubmissionFailed { message } => Ok(submission_failed(state, message)),
                WizardEvent::SubmissionAborted => {
                    Ok(submission_failed(state, "submission aborted".to_string()))
                }
                _ => Err(WizardError::SubmissionInFlight),
            };
        }
        SubmissionState::Idle => {}
    }

    match event {
        WizardEvent::SetField { key, value } => set_field(definition, state, key, value),
        WizardEvent::Next => next(definition, state),
        WizardEvent::Previous => previous(definition, state),
        WizardEvent::GoTo(target) => go_to(definition, state, target),
        WizardEvent::BeginSubmit => begin_submit(definition, state),
        WizardEvent::SubmissionSucceeded
        | WizardEvent::SubmissionFailed { .. }
        | WizardEvent::SubmissionAborted => Err(WizardError::NoSubmissionInFlight),
    }
}

/// Validates the current step without changing anything.
pub fn check_current<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
) -> Result<ValidationReport, WizardError> {
    let step = definition.get(state.current)?;
    Ok(StepValidator::new(&step.form, &state.fields).validate())
}

fn set_field<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
    key: String,
    value: FieldValue,
) -> Result<Reduced<S>, WizardError> {
    let step = definition.get(state.current)?;
    if step.form.field(&key).is_none() {
        return Err(WizardError::UnknownField {
            step: state.current.to_string(),
            key,
        });
    }
    let mut updated = state.clone();
    updated.fields.set(key.clone(), value);
    Ok(Reduced::new(updated, Outcome::Edited { key }))
}

/// Validates, transforms and stages the current step, marking it complete.
/// Returns the validation report instead when the step is invalid.
fn commit_current<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
) -> Result<Result<WizardState<S>, ValidationReport>, WizardError> {
    let step = definition.get(state.current)?;
    let report = StepValidator::new(&step.form, &state.fields).validate();
    if !report.is_valid() {
        debug!(step = %state.current, issues = report.len(), "step failed validation");
        return Ok(Err(report));
    }

    let payload = (step.transform)(&state.fields)?;
    let mut committed = state.clone();
    committed
        .staging
        .write(state.current, state.fields.clone(), payload);
    committed.completed.insert(state.current);
    debug!(step = %state.current, "step committed");
    Ok(Ok(committed))
}

/// Makes `target` the active step, rehydrating its fields from staging.
fn move_to<S: StepName>(mut state: WizardState<S>, target: S) -> Reduced<S> {
    let from = state.current;
    state.fields = state
        .staging
        .read_raw(target)
        .cloned()
        .unwrap_or_default();
    state.current = target;
    debug!(%from, to = %target, "wizard moved");
    Reduced::new(state, Outcome::Moved { from, to: target })
}

fn next<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
) -> Result<Reduced<S>, WizardError> {
    let index = position(definition, state.current)?;
    let target = definition
        .step_at(index + 1)
        .ok_or(WizardError::AlreadyAtLastStep)?;

    match commit_current(definition, state)? {
        Ok(committed) => Ok(move_to(committed, target)),
        Err(report) => Ok(Reduced::new(state.clone(), Outcome::Invalid(report))),
    }
}

fn previous<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
) -> Result<Reduced<S>, WizardError> {
    let index = position(definition, state.current)?;
    match index.checked_sub(1).and_then(|prev| definition.step_at(prev)) {
        Some(target) => Ok(move_to(state.clone(), target)),
        None => Ok(Reduced::new(state.clone(), Outcome::Unchanged)),
    }
}

fn go_to<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
    target: S,
) -> Result<Reduced<S>, WizardError> {
    let current_index = position(definition, state.current)?;
    let target_index = position(definition, target)?;

    if target_index == current_index {
        return Ok(Reduced::new(state.clone(), Outcome::Unchanged));
    }
    if target_index < current_index {
        return Ok(move_to(state.clone(), target));
    }

    // The last step demands every other step; intermediate targets only the
    // steps strictly between.
    let is_last = target == definition.last();
    let missing: Vec<String> = definition
        .steps()
        .enumerate()
        .filter(|(index, step)| {
            let in_scope = if is_last {
                *step != target
            } else {
                *index > current_index && *index < target_index
            };
            in_scope && *step != state.current && !state.is_complete(*step)
        })
        .map(|(_, step)| step.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(WizardError::IncompleteSteps {
            target: target.to_string(),
            missing,
        });
    }

    match commit_current(definition, state)? {
        Ok(committed) => Ok(move_to(committed, target)),
        Err(report) => Ok(Reduced::new(state.clone(), Outcome::Invalid(report))),
    }
}

fn begin_submit<S: StepName>(
    definition: &WizardDefinition<S>,
    state: &WizardState<S>,
) -> Result<Reduced<S>, WizardError> {
    if state.current != definition.last() {
        return Err(WizardError::NotOnFinalStep {
            current: state.current.to_string(),
        });
    }

    let mut committed = match commit_current(definition, state)? {
        Ok(committed) => committed,
        Err(report) => return Ok(Reduced::new(state.clone(), Outcome::Invalid(report))),
    };

    let missing: Vec<String> = definition
        .steps()
        .filter(|step| !committed.is_complete(*step))
        .map(|step| step.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(WizardError::IncompleteSteps {
            target: "submission".to_string(),
            missing,
        });
    }

    let request = committed.staging.union_payloads();
    committed.submission = SubmissionState::InFlight;
    committed.last_error = None;
    info!(fields = request.len(), "registration ready to submit");
    Ok(Reduced::new(committed, Outcome::ReadyToSubmit(request)))
}

fn submission_succeeded<S: StepName>(state: &WizardState<S>) -> Reduced<S> {
    let mut finished = state.clone();
    finished.staging.clear();
    finished.fields = FieldStore::new();
    finished.submission = SubmissionState::Submitted;
    finished.last_error = None;
    info!("registration submitted");
    Reduced::new(finished, Outcome::Submitted)
}

fn submission_failed<S: StepName>(state: &WizardState<S>, message: String) -> Reduced<S> {
    let mut retry = state.clone();
    retry.submission = SubmissionState::Idle;
    retry.last_error = Some(message);
    Reduced::new(retry, Outcome::SubmissionFailed)
}

fn position<S: StepName>(definition: &WizardDefinition<S>, step: S) -> Result<usize, WizardError> {
    definition
        .index_of(step)
        .ok_or_else(|| WizardError::UnknownStep(step.to_string()))
}

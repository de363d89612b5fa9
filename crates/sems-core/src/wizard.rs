//! The registration wizard shell: owns the navigator state, turns user text
//! into field values, and runs the asynchronous submission and address
//! lookup against the collaborators.

use sems_domain::{AddressCandidate, MeterKind, RegistrationStep, SubmissionReceipt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::definition::WizardDefinition;
use crate::error::{PortError, WizardError};
use crate::field_store::FieldValue;
use crate::navigator::{check_current, reduce, Outcome, WizardEvent, WizardState};
use crate::ports::{AddressLookup, RegistrationSubmitter};
use crate::registration::{build_request, registration_wizard};
use crate::validation::{FormDescriptor, ValidationReport};

/// Result of a submission attempt that reached the collaborator or was
/// stopped by validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Invalid(ValidationReport),
    Submitted(SubmissionReceipt),
}

pub struct WizardShell {
    definition: WizardDefinition<RegistrationStep>,
    state: Option<WizardState<RegistrationStep>>,
    cancel: CancellationToken,
}

impl WizardShell {
    pub fn new() -> Result<Self, WizardError> {
        Ok(Self::with_definition(registration_wizard()?))
    }

    pub fn with_definition(definition: WizardDefinition<RegistrationStep>) -> Self {
        let state = WizardState::new(&definition);
        Self {
            definition,
            state: Some(state),
            cancel: CancellationToken::new(),
        }
    }

    pub fn definition(&self) -> &WizardDefinition<RegistrationStep> {
        &self.definition
    }

    pub fn state(&self) -> Result<&WizardState<RegistrationStep>, WizardError> {
        self.state.as_ref().ok_or(WizardError::Closed)
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn current_form(&self) -> Result<&FormDescriptor, WizardError> {
        let current = self.state()?.current();
        Ok(&self.definition.get(current)?.form)
    }

    pub fn dispatch(
        &mut self,
        event: WizardEvent<RegistrationStep>,
    ) -> Result<Outcome<RegistrationStep>, WizardError> {
        let reduced = reduce(&self.definition, self.state()?, event)?;
        self.state = Some(reduced.state);
        Ok(reduced.outcome)
    }

    /// Sets a field on the active step from user text, coercing it to the
    /// field's kind.
    pub fn set_field(
        &mut self,
        key: &str,
        input: &str,
    ) -> Result<Outcome<RegistrationStep>, SetFieldError> {
        let form = self.current_form()?;
        let descriptor = form.field(key).ok_or_else(|| WizardError::UnknownField {
            step: form.name.to_string(),
            key: key.to_string(),
        })?;
        let value = descriptor
            .kind
            .parse_input(input)
            .map_err(|err| SetFieldError::Input {
                key: key.to_string(),
                message: err.message,
            })?;
        Ok(self.dispatch(WizardEvent::SetField {
            key: key.to_string(),
            value,
        })?)
    }

    pub fn go_next(&mut self) -> Result<Outcome<RegistrationStep>, WizardError> {
        self.dispatch(WizardEvent::Next)
    }

    pub fn go_previous(&mut self) -> Result<Outcome<RegistrationStep>, WizardError> {
        self.dispatch(WizardEvent::Previous)
    }

    pub fn go_to(&mut self, step: &str) -> Result<Outcome<RegistrationStep>, WizardError> {
        let target = self.definition.resolve(step)?;
        self.dispatch(WizardEvent::GoTo(target))
    }

    /// Validates the active step without committing it.
    pub fn check(&self) -> Result<ValidationReport, WizardError> {
        check_current(&self.definition, self.state()?)
    }

    /// Looks up addresses for `post_code`. An abort leaves the wizard state
    /// untouched and re-arms the abort token.
    pub async fn lookup_addresses(
        &mut self,
        lookup: &dyn AddressLookup,
        post_code: &str,
    ) -> Result<Vec<AddressCandidate>, WizardError> {
        self.state()?;
        let cancel = self.cancel.clone();
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!(post_code, "address lookup aborted");
                self.cancel = CancellationToken::new();
                Err(WizardError::Aborted)
            }
            result = lookup.lookup_postcode(post_code) => result.map_err(WizardError::from),
        }
    }

    /// Pre-fills the active step's fields from a lookup candidate. Only
    /// fields the active step declares are written; staging is never
    /// touched. Returns the keys that were set.
    pub fn apply_address_candidate(
        &mut self,
        candidate: &AddressCandidate,
    ) -> Result<Vec<&'static str>, WizardError> {
        let mut values: Vec<(&'static str, Option<String>)> = vec![
            ("address_line_1", Some(candidate.line_1.clone())),
            ("address_line_2", candidate.line_2.clone()),
            ("city", Some(candidate.city.clone())),
            ("post_code", Some(candidate.post_code.clone())),
            ("latitude", candidate.latitude.map(|value| value.to_string())),
            ("longitude", candidate.longitude.map(|value| value.to_string())),
        ];
        values.push((
            "mpan",
            candidate.first_meter(MeterKind::Electricity).map(str::to_string),
        ));
        values.push(("mprn", candidate.first_meter(MeterKind::Gas).map(str::to_string)));

        let form = self.current_form()?;
        let applicable: Vec<(&'static str, String)> = values
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .filter(|(key, _)| form.field(key).is_some())
            .collect();

        let mut applied = Vec::with_capacity(applicable.len());
        for (key, value) in applicable {
            self.dispatch(WizardEvent::SetField {
                key: key.to_string(),
                value: FieldValue::text(value),
            })?;
            applied.push(key);
        }
        Ok(applied)
    }

    /// Commits the last step and hands the unioned request to the
    /// submitter. The call races the shell's abort token; on abort or
    /// failure the staged data is kept for a retry.
    pub async fn submit(
        &mut self,
        submitter: &dyn RegistrationSubmitter,
    ) -> Result<SubmitOutcome, WizardError> {
        let payload = match self.dispatch(WizardEvent::BeginSubmit)? {
            Outcome::ReadyToSubmit(payload) => payload,
            Outcome::Invalid(report) => return Ok(SubmitOutcome::Invalid(report)),
            other => {
                return Err(WizardError::Payload(format!(
                    "unexpected outcome {other:?} when starting submission"
                )))
            }
        };

        let request = match build_request(&payload) {
            Ok(request) => request,
            Err(err) => {
                self.dispatch(WizardEvent::SubmissionFailed {
                    message: err.to_string(),
                })?;
                return Err(err);
            }
        };

        let cancel = self.cancel.clone();
        let result: Result<SubmissionReceipt, Option<PortError>> = tokio::select! {
            _ = cancel.cancelled() => Err(None),
            result = submitter.submit_registration(&request) => result.map_err(Some),
        };

        match result {
            Ok(receipt) => {
                self.dispatch(WizardEvent::SubmissionSucceeded)?;
                info!(reference = %receipt.reference, "registration accepted");
                Ok(SubmitOutcome::Submitted(receipt))
            }
            Err(Some(err)) => {
                warn!(error = %err, "registration submission failed; staged data kept");
                self.dispatch(WizardEvent::SubmissionFailed {
                    message: err.to_string(),
                })?;
                Err(WizardError::Submission(err))
            }
            Err(None) => {
                warn!("registration submission aborted");
                self.dispatch(WizardEvent::SubmissionAborted)?;
                self.cancel = CancellationToken::new();
                Err(WizardError::Aborted)
            }
        }
    }

    /// Token that aborts the in-flight submission or lookup when cancelled.
    pub fn abort_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Aborts outstanding work and discards all wizard state.
    pub fn close(&mut self) {
        self.cancel.cancel();
        self.state = None;
    }
}

/// Failure of [`WizardShell::set_field`]: either the text does not fit the
/// field kind, or the wizard refused the edit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetFieldError {
    #[error("{key}: {message}")]
    Input { key: String, message: String },
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

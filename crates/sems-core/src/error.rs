use sems_domain::{AlertFieldError, AlertId};
use thiserror::Error;

use crate::transform::TransformError;

/// Failures reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serde(String),
}

impl From<std::io::Error> for PortError {
    fn from(err: std::io::Error) -> Self {
        PortError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PortError {
    fn from(err: serde_json::Error) -> Self {
        PortError::Serde(err.to_string())
    }
}

/// Navigation and submission failures of the registration wizard. Field
/// validation failures are not errors; they are reported as data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WizardError {
    #[error("Invalid wizard definition: {0}")]
    Definition(String),
    #[error("Unknown step: {0}")]
    UnknownStep(String),
    #[error("Unknown field `{key}` on step {step}")]
    UnknownField { step: String, key: String },
    #[error("Cannot open {target}: complete {} first", .missing.join(", "))]
    IncompleteSteps { target: String, missing: Vec<String> },
    #[error("Submission is only possible from the last step (currently on {current})")]
    NotOnFinalStep { current: String },
    #[error("Already on the last step; submit instead")]
    AlreadyAtLastStep,
    #[error("A submission is already in flight")]
    SubmissionInFlight,
    #[error("No submission is in flight")]
    NoSubmissionInFlight,
    #[error("Registration already submitted")]
    AlreadySubmitted,
    #[error("Wizard is closed")]
    Closed,
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("Invalid registration payload: {0}")]
    Payload(String),
    #[error("Submission failed: {0}")]
    Submission(#[from] PortError),
    #[error("Submission aborted")]
    Aborted,
}

/// Failures of the alert draft register.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DraftError {
    #[error("No draft exists for alert {id} ({operation} requires start_edit first)")]
    PreconditionViolation { id: AlertId, operation: &'static str },
    #[error("Alert {0} is already being edited")]
    AlreadyEditing(AlertId),
    #[error("Draft for alert {id} is missing `{field}`")]
    MissingField { id: AlertId, field: &'static str },
    #[error("Invalid field: {0}")]
    InvalidField(#[from] AlertFieldError),
    #[error("Update failed: {0}")]
    Update(PortError),
    #[error("Alert list refresh failed: {0}")]
    Refetch(PortError),
    #[error("Save of alert {0} aborted")]
    Aborted(AlertId),
}

//! Boundaries to the external collaborators consumed by the engine.

use async_trait::async_trait;
use sems_domain::{Alert, AddressCandidate, AlertUpdate, RegistrationRequest, SubmissionReceipt};

use crate::error::PortError;

/// Accepts a completed school registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationSubmitter: Send + Sync {
    async fn submit_registration(
        &self,
        request: &RegistrationRequest,
    ) -> Result<SubmissionReceipt, PortError>;
}

/// Persists edits to an alert applet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertUpdater: Send + Sync {
    async fn update_alert(&self, update: &AlertUpdate) -> Result<(), PortError>;
}

/// Source of the canonical alert list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertDirectory: Send + Sync {
    async fn list_alerts(&self) -> Result<Vec<Alert>, PortError>;
}

/// Postcode search returning candidate addresses with their meters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn lookup_postcode(&self, post_code: &str) -> Result<Vec<AddressCandidate>, PortError>;
}

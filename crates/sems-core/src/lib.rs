//! sems-core
//!
//! Registration wizard engine and alert draft register for the school energy
//! console. Depends on sems-domain. No CLI, no terminal I/O; collaborators
//! are reached through the traits in [`ports`].

pub mod alert_drafts;
pub mod definition;
pub mod error;
pub mod field_store;
pub mod navigator;
pub mod ports;
pub mod registration;
pub mod staging;
pub mod transform;
pub mod validation;
pub mod wizard;

pub use alert_drafts::*;
pub use definition::*;
pub use error::{DraftError, PortError, WizardError};
pub use field_store::*;
pub use navigator::*;
pub use ports::{AddressLookup, AlertDirectory, AlertUpdater, RegistrationSubmitter};
pub use registration::{build_request, registration_wizard};
pub use staging::*;
pub use transform::{PayloadFragment, StepTransformer, TransformError};
pub use validation::*;
pub use wizard::*;

#[cfg(test)]
mod tests;

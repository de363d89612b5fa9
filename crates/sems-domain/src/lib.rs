//! sems-domain
//!
//! Pure domain models for the school energy console (registration requests,
//! alerts, address candidates). No I/O, no CLI, no collaborators. Only data
//! types and core enums.

pub mod alert;
pub mod common;
pub mod lookup;
pub mod registration;

pub use alert::*;
pub use common::*;
pub use lookup::*;
pub use registration::*;

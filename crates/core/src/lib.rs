//! `fleetgate-core`: shared primitives for the access-control workspace.
//!
//! This crate contains no IO: identifiers, the domain error model and the
//! clock seam used to make token lifetimes testable.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, OrganizationId};

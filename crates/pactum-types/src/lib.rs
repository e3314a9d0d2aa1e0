//! Pactum Types - Canonical domain types for the multi-party agreement engine
//!
//! This crate contains all foundational types for pactum with zero dependencies
//! on other pactum crates. It defines the complete type system for:
//!
//! - Identity types (AgreementId, PartyId, ArbiterId, CaseRef)
//! - Unit-of-account amounts with checked arithmetic
//! - 32-byte commitments (terms hash, criteria roots)
//! - Agreement, Position and Dispute records
//! - The typed event journal
//!
//! # Lifecycle
//!
//! ```text
//! create → join* → (finalize-all | dispute → ruling) → withdraw
//! ```

pub mod identity;
pub mod amount;
pub mod hash;
pub mod agreement;
pub mod position;
pub mod dispute;
pub mod event;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use hash::*;
pub use agreement::*;
pub use position::*;
pub use dispute::*;
pub use event::*;
pub use error::*;

/// Version of the pactum types schema
pub const TYPES_VERSION: &str = "0.1.0";

//! Pactum Framework - Multi-party agreement engine
//!
//! Parties join agreements by escrowing funds, optionally proving
//! eligibility against a merkle criteria root. An agreement ends either by
//! unanimous finalization or by a ruling from an external arbitration
//! authority, after which each party withdraws its final balance.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     AgreementFramework                        │
//! │  ┌────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │  Registry  │  │ PositionLedger│  │  DisputeCoordinator   │  │
//! │  └────────────┘  └──────────────┘  └───────────────────────┘  │
//! │  ┌────────────┐  ┌──────────────┐                             │
//! │  │  Criteria  │  │ EventJournal │                             │
//! │  └────────────┘  └──────────────┘                             │
//! └───────────┬──────────────────────────────────┬───────────────┘
//!             ▼                                  ▼
//!     CustodyProvider                   ArbitrationAuthority
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pactum_framework::{AgreementFramework, FrameworkConfig, InMemoryVault};
//! use pactum_arbitration::InMemoryArbitrator;
//!
//! let framework = AgreementFramework::new(
//!     FrameworkConfig::from_env(),
//!     Arc::new(InMemoryVault::new()),
//!     Arc::new(InMemoryArbitrator::new()),
//! );
//! ```

pub mod config;
pub mod custody;
pub mod dispute;
pub mod framework;
pub mod journal;
pub mod registry;

pub use config::FrameworkConfig;
pub use custody::{CustodyProvider, InMemoryVault};
pub use dispute::{DisputeCoordinator, DisputeRollback};
pub use framework::{AgreementFramework, DisputeOpened, Withdrawal};
pub use journal::EventJournal;
pub use registry::{AgreementRecord, AgreementRegistry};

pub use pactum_arbitration::{ArbitrationAuthority, DisputeContext};

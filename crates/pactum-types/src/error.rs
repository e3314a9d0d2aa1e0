//! Error types for pactum
//!
//! Errors are terminal for the call: a failed operation leaves no state
//! change, no event and no transfer behind.

use thiserror::Error;

/// Result type for pactum operations
pub type Result<T> = std::result::Result<T, PactumError>;

/// Pactum error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PactumError {
    // ========================================================================
    // Registry Errors
    // ========================================================================

    /// Agreement id was never assigned
    #[error("Agreement {agreement_id} does not exist")]
    NonExistentAgreement { agreement_id: u64 },

    /// Creation parameters rejected
    #[error("Invalid agreement params: {reason}")]
    InvalidParams { reason: String },

    /// Agreement has reached its configured party limit
    #[error("Agreement {agreement_id} is full ({limit} parties)")]
    AgreementFull { agreement_id: u64, limit: usize },

    // ========================================================================
    // Position Errors
    // ========================================================================

    /// Deposit is zero, below the committed minimum, or exceeds escrow
    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: u128, required: u128 },

    /// Caller holds no position in the agreement
    #[error("Party {party} is not part of agreement {agreement_id}")]
    NoPartOfAgreement { agreement_id: u64, party: String },

    /// Caller already holds a position in the agreement
    #[error("Party {party} already joined agreement {agreement_id}")]
    PartyAlreadyJoined { agreement_id: u64, party: String },

    /// Caller already signalled finalization
    #[error("Party {party} already finalized agreement {agreement_id}")]
    PartyAlreadyFinalized { agreement_id: u64, party: String },

    /// Eligibility proof did not verify against the agreement's criteria
    #[error("Party {party} does not match the criteria of agreement {agreement_id}")]
    PartyMustMatchCriteria { agreement_id: u64, party: String },

    /// Proof is structurally unacceptable (e.g. deeper than allowed)
    #[error("Invalid proof: {reason}")]
    InvalidProof { reason: String },

    /// Amount arithmetic overflowed or underflowed
    #[error("Amount overflow during arithmetic operation")]
    AmountOverflow,

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================

    #[error("Agreement {agreement_id} is already disputed")]
    AgreementAlreadyDisputed { agreement_id: u64 },

    #[error("Agreement {agreement_id} is already finalized")]
    AgreementAlreadyFinalized { agreement_id: u64 },

    #[error("Agreement {agreement_id} is not finalized")]
    AgreementNotFinalized { agreement_id: u64 },

    #[error("Agreement {agreement_id} is not disputed")]
    AgreementNotDisputed { agreement_id: u64 },

    /// Another call on this agreement is waiting on an external primitive
    #[error("Re-entrant call on agreement {agreement_id}")]
    ReentrantCall { agreement_id: u64 },

    // ========================================================================
    // Arbitration Errors
    // ========================================================================

    #[error("Arbiter {arbiter} is not the authority for this engine")]
    UnauthorizedArbiter { arbiter: String },

    #[error("Case {case_ref} does not match the open dispute of agreement {agreement_id}")]
    CaseMismatch { agreement_id: u64, case_ref: String },

    #[error("Invalid ruling: {reason}")]
    InvalidRuling { reason: String },

    #[error("Arbitration authority failed: {reason}")]
    ArbitrationFailed { reason: String },

    // ========================================================================
    // Custody Errors
    // ========================================================================

    #[error("Custody transfer failed: {reason}")]
    CustodyFailed { reason: String },

    // ========================================================================
    // General Errors
    // ========================================================================

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PactumError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid params error
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    /// Create a custody failure
    pub fn custody(reason: impl Into<String>) -> Self {
        Self::CustodyFailed {
            reason: reason.into(),
        }
    }

    /// Create an arbitration failure
    pub fn arbitration(reason: impl Into<String>) -> Self {
        Self::ArbitrationFailed {
            reason: reason.into(),
        }
    }

    /// Whether the failure came from outside the engine's trust boundary
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::CustodyFailed { .. } | Self::ArbitrationFailed { .. }
        )
    }

    /// Get a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonExistentAgreement { .. } => "NON_EXISTENT_AGREEMENT",
            Self::InvalidParams { .. } => "INVALID_PARAMS",
            Self::AgreementFull { .. } => "AGREEMENT_FULL",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::NoPartOfAgreement { .. } => "NO_PART_OF_AGREEMENT",
            Self::PartyAlreadyJoined { .. } => "PARTY_ALREADY_JOINED",
            Self::PartyAlreadyFinalized { .. } => "PARTY_ALREADY_FINALIZED",
            Self::PartyMustMatchCriteria { .. } => "PARTY_MUST_MATCH_CRITERIA",
            Self::InvalidProof { .. } => "INVALID_PROOF",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
            Self::AgreementAlreadyDisputed { .. } => "AGREEMENT_ALREADY_DISPUTED",
            Self::AgreementAlreadyFinalized { .. } => "AGREEMENT_ALREADY_FINALIZED",
            Self::AgreementNotFinalized { .. } => "AGREEMENT_NOT_FINALIZED",
            Self::AgreementNotDisputed { .. } => "AGREEMENT_NOT_DISPUTED",
            Self::ReentrantCall { .. } => "REENTRANT_CALL",
            Self::UnauthorizedArbiter { .. } => "UNAUTHORIZED_ARBITER",
            Self::CaseMismatch { .. } => "CASE_MISMATCH",
            Self::InvalidRuling { .. } => "INVALID_RULING",
            Self::ArbitrationFailed { .. } => "ARBITRATION_FAILED",
            Self::CustodyFailed { .. } => "CUSTODY_FAILED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

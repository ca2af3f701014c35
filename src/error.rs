//! Error types for the VNDT protocol.
//!
//! Every failure is local, synchronous and all-or-nothing: an operation that
//! returns one of these errors leaves no partial state behind once it has
//! gone through [`Protocol::execute`](crate::protocol::Protocol::execute).

use thiserror::Error;

/// Result type alias for VNDT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the VNDT protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Amount / Balance Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Zero or otherwise malformed quantity
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Token balance too small for the requested action
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Vault shares too small for the requested action
    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientShares {
        /// Required shares
        required: u128,
        /// Held shares
        available: u128,
    },

    /// Collateral too small for the requested action
    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral {
        /// Required collateral amount
        required: u128,
        /// Held collateral amount
        available: u128,
    },

    /// Spender allowance too small
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance {
        /// Required allowance
        required: u128,
        /// Current allowance
        available: u128,
    },

    /// Recipient is the zero address or otherwise not allowed
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    // ═══════════════════════════════════════════════════════════════════
    // Position Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Action would leave the position below the minimum ratio
    #[error("Unsafe position ratio {current}% below minimum {minimum}%")]
    UnsafePositionRatio {
        /// Resulting ratio percentage
        current: u128,
        /// Minimum required ratio percentage
        minimum: u128,
    },

    /// Liquidation attempted on a safe position
    #[error("Position {0} is safe and cannot be liquidated")]
    NotLiquidatable(String),

    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller lacks the required privileged identity
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    // ═══════════════════════════════════════════════════════════════════
    // External Transfer Errors
    // ═══════════════════════════════════════════════════════════════════

    /// An external value transfer did not succeed
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    // ═══════════════════════════════════════════════════════════════════
    // Swap Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Swap output below the caller's minimum
    #[error("Slippage exceeded: output {output}, minimum {minimum}")]
    SlippageExceeded {
        /// Computed output amount
        output: u128,
        /// Caller's minimum
        minimum: u128,
    },

    /// Pool reserves are empty
    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Serialization / Storage Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for the common zero-amount rejection
    pub fn zero_amount(what: &str) -> Self {
        Error::InvalidAmount(format!("{} must be greater than zero", what))
    }

    /// Returns true if the caller can fix the condition and resubmit
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientBalance { .. }
                | Error::InsufficientShares { .. }
                | Error::InsufficientCollateral { .. }
                | Error::InsufficientAllowance { .. }
                | Error::UnsafePositionRatio { .. }
                | Error::SlippageExceeded { .. }
                | Error::TransferFailed(_)
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Amount errors: 1xxx
            Error::InvalidAmount(_) => 1001,
            Error::InsufficientBalance { .. } => 1002,
            Error::InsufficientShares { .. } => 1003,
            Error::InsufficientCollateral { .. } => 1004,
            Error::InsufficientAllowance { .. } => 1005,
            Error::InvalidRecipient(_) => 1006,

            // Position errors: 2xxx
            Error::UnsafePositionRatio { .. } => 2001,
            Error::NotLiquidatable(_) => 2002,

            // Authorization errors: 4xxx
            Error::NotAuthorized(_) => 4001,

            // Transfer errors: 5xxx
            Error::TransferFailed(_) => 5001,

            // Swap errors: 6xxx
            Error::SlippageExceeded { .. } => 6001,
            Error::InsufficientLiquidity => 6002,

            // Validation errors: 7xxx
            Error::InvalidParameter { .. } => 7001,
            Error::Overflow { .. } => 7002,

            // Serialization / internal errors: 9xxx
            Error::Serialization(_) => 9001,
            Error::Deserialization(_) => 9002,
            Error::Storage(_) => 9003,
            Error::Internal(_) => 9004,
        }
    }
}

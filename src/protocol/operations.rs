//! Protocol operations - atomic state changes.
//!
//! An operation is one user-facing call. The caller's identity is supplied
//! separately to [`Protocol::execute`](crate::protocol::Protocol::execute), which
//! runs the operation as a single transaction.

use serde::{Deserialize, Serialize};

use crate::utils::address::Address;

/// Every state-changing call the protocol accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    // ═══════════════════════════════════════════════════════════════════════════
    // DEBT ENGINE
    // ═══════════════════════════════════════════════════════════════════════════
    /// Lock reserve asset as collateral
    AddCollateral { amount: u128 },
    /// Release collateral, keeping the position safe
    WithdrawCollateral { amount: u128 },
    /// Borrow VNDT against collateral
    MintVndt { amount: u128 },
    /// Repay debt, capped at the amount owed
    RepayUpTo { amount: u128 },
    /// Close an unsafe position by paying its debt
    Liquidate { user: Address },

    // ═══════════════════════════════════════════════════════════════════════════
    // STAKING VAULT
    // ═══════════════════════════════════════════════════════════════════════════
    /// Deposit VNDT into the vault
    Stake { amount: u128 },
    /// Redeem vault shares
    Unstake { shares: u128 },

    // ═══════════════════════════════════════════════════════════════════════════
    // LEDGER
    // ═══════════════════════════════════════════════════════════════════════════
    Transfer { to: Address, amount: u128 },
    Approve { spender: Address, amount: u128 },
    TransferFrom { from: Address, to: Address, amount: u128 },

    // ═══════════════════════════════════════════════════════════════════════════
    // ADMINISTRATION
    // ═══════════════════════════════════════════════════════════════════════════
    /// Oracle owner sets the reserve-asset price
    SetEthPrice { price: u128 },
    /// Rate-controller owner sets the borrow rate
    UpdateBorrowRate { rate_bps: u128 },
    /// Rate-controller owner sets the staking rate
    UpdateStakingRate { rate_bps: u128 },

    // ═══════════════════════════════════════════════════════════════════════════
    // SWAP POOL
    // ═══════════════════════════════════════════════════════════════════════════
    AddLiquidity { eth_amount: u128, vndt_amount: u128 },
    SwapEthForVndt { eth_in: u128, min_out: u128 },
    SwapVndtForEth { vndt_in: u128, min_out: u128 },

    /// Accrue both pools without any other change
    Accrue,
}

impl Operation {
    /// Get the operation type name
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::AddCollateral { .. } => "AddCollateral",
            Self::WithdrawCollateral { .. } => "WithdrawCollateral",
            Self::MintVndt { .. } => "MintVndt",
            Self::RepayUpTo { .. } => "RepayUpTo",
            Self::Liquidate { .. } => "Liquidate",
            Self::Stake { .. } => "Stake",
            Self::Unstake { .. } => "Unstake",
            Self::Transfer { .. } => "Transfer",
            Self::Approve { .. } => "Approve",
            Self::TransferFrom { .. } => "TransferFrom",
            Self::SetEthPrice { .. } => "SetEthPrice",
            Self::UpdateBorrowRate { .. } => "UpdateBorrowRate",
            Self::UpdateStakingRate { .. } => "UpdateStakingRate",
            Self::AddLiquidity { .. } => "AddLiquidity",
            Self::SwapEthForVndt { .. } => "SwapEthForVndt",
            Self::SwapVndtForEth { .. } => "SwapVndtForEth",
            Self::Accrue => "Accrue",
        }
    }
}

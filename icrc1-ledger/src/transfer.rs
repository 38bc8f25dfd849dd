//! Transfer validation and application
//!
//! A transfer is three ledger entries applied as one batch:
//!
//! ```text
//! sender         -(amount + fee)
//! receiver       +amount
//! fee collector  +fee
//! ```
//!
//! The sender is never special-cased. When the sender is the fee collector
//! the `-fee` and `+fee` entries cancel and the sender pays no net fee.

use crate::account::AccountKey;
use crate::balances::{BalanceError, BalanceStore};
use crate::config::LedgerConfig;
use crate::error::TransferError;
use crate::types::{Account, Principal, Tokens, TransferArgs};
use crate::Error;

/// Transfer that passed validation and was applied to the balances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransfer {
    /// Debited account
    pub from: Account,
    /// Credited account
    pub to: Account,
    /// Amount moved
    pub amount: Tokens,
    /// Fee routed to the fee collector
    pub fee: Tokens,
}

/// Why a transfer did not go through
#[derive(Debug)]
pub enum TransferFailure {
    /// Request rejected, nothing changed
    Rejected(TransferError),
    /// Internal invariant broken, nothing changed, ledger must halt
    Fault(Error),
}

impl From<TransferError> for TransferFailure {
    fn from(err: TransferError) -> Self {
        TransferFailure::Rejected(err)
    }
}

/// Validates transfers and applies them to a [`BalanceStore`]
#[derive(Debug, Clone)]
pub struct TransferProcessor {
    max_memo_length: usize,
}

impl TransferProcessor {
    /// Create processor with the given memo ceiling
    pub fn new(max_memo_length: usize) -> Self {
        Self { max_memo_length }
    }

    /// Memo ceiling in bytes
    pub fn max_memo_length(&self) -> usize {
        self.max_memo_length
    }

    /// Check a request without touching balances
    ///
    /// Order: fee, memo, receiver. Funds are checked by [`Self::process`]
    /// inside the batch apply.
    pub fn validate(
        &self,
        caller: &Principal,
        args: &TransferArgs,
        config: &LedgerConfig,
    ) -> Result<AppliedTransfer, TransferError> {
        let fee = config.fee;
        if let Some(requested) = args.fee {
            if requested != fee {
                return Err(TransferError::BadFee { expected_fee: fee });
            }
        }

        if let Some(memo) = &args.memo {
            if memo.len() > self.max_memo_length {
                return Err(TransferError::MemoTooLong {
                    max_length: self.max_memo_length,
                });
            }
        }

        if args.to.owner.is_management() {
            return Err(TransferError::InvalidReceiver);
        }

        Ok(AppliedTransfer {
            from: Account::with_subaccount(caller.clone(), args.from_subaccount),
            to: args.to.clone(),
            amount: args.amount,
            fee,
        })
    }

    /// Validate and apply a transfer as one all-or-nothing batch
    pub fn process(
        &self,
        caller: &Principal,
        args: &TransferArgs,
        config: &LedgerConfig,
        balances: &mut BalanceStore,
    ) -> Result<AppliedTransfer, TransferFailure> {
        let transfer = self.validate(caller, args, config)?;

        let from = AccountKey::from(&transfer.from);
        let to = AccountKey::from(&transfer.to);
        let collector = AccountKey::from(config.fee_collector());

        let Some(total_debit) = transfer.amount.checked_add(transfer.fee) else {
            return Err(TransferError::InsufficientFunds {
                balance: balances.get(&from),
            }
            .into());
        };

        let debits = [(from, total_debit)];
        let credits = [(to, transfer.amount), (collector, transfer.fee)];

        match balances.apply(&debits, &credits) {
            Ok(()) => Ok(transfer),
            Err(BalanceError::InsufficientFunds { balance, .. }) => {
                Err(TransferError::InsufficientFunds { balance }.into())
            }
            Err(err @ (BalanceError::Overflow(_) | BalanceError::SumOverflow)) => Err(
                TransferFailure::Fault(Error::InvariantViolation(err.to_string())),
            ),
        }
    }
}

impl Default for TransferProcessor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_MEMO_LENGTH)
    }
}

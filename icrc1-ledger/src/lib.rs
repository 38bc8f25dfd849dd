//! ICRC-1 Token Ledger
//!
//! Fungible-token ledger with per-account balances, a fixed total supply and
//! a flat transfer fee routed to the minting account.
//!
//! # Architecture
//!
//! - **AccountKey**: canonical byte key per (owner, subaccount)
//! - **BalanceStore**: all-or-nothing batch debit/credit
//! - **TransferProcessor**: fee, memo and receiver checks, then one batch
//! - **Ledger**: owned state behind a single lock, ICRC-1 queries and transfer
//! - **Actor**: single task serializing calls from many handles
//!
//! # Invariants
//!
//! - Conservation: Σ(balances) == total supply at every reachable state
//! - Atomicity: a rejected transfer changes no balance
//! - Monotonic indices: every applied transfer gets the next index
//! - Halt on fault: a broken invariant stops transfers, queries keep working

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod account;
pub mod balances;
pub mod transfer;
pub mod ledger;
pub mod error;
pub mod actor;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result, TransferError};
pub use types::{
    Account, Memo, Metadata, MetadataValue, Principal, Subaccount, Tokens, Transaction,
    TransferArgs, TxIndex, DEFAULT_SUBACCOUNT,
};
pub use account::AccountKey;
pub use balances::BalanceStore;
pub use transfer::TransferProcessor;
pub use ledger::Ledger;
pub use actor::{spawn_ledger_actor, LedgerHandle};
pub use config::{Config, InitArgs, LedgerArgument, LedgerConfig, UpgradeArgs};

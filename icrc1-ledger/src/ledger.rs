//! Main ledger orchestration layer
//!
//! [`Ledger`] owns the whole mutable state (config, balances, supply,
//! transaction counter) behind a single lock and exposes the ICRC-1
//! operations on it. Transfers hold the write lock across check-then-mutate;
//! queries take the read lock and see a consistent snapshot.
//!
//! # Example
//!
//! ```
//! use icrc1_ledger::{Account, InitArgs, Ledger, Principal, Tokens, TransferArgs};
//!
//! # fn main() -> icrc1_ledger::Result<()> {
//! let owner = Principal::from_slice(b"Owner")?;
//! let ledger = Ledger::init(InitArgs {
//!     total_supply: Tokens::from(1_000_000u64),
//!     decimals: 8,
//!     fee: Tokens::from(10u64),
//!     name: "Token".to_string(),
//!     symbol: "TOK".to_string(),
//!     metadata: None,
//!     owner: owner.clone(),
//! })?;
//!
//! let alice = Account::new(Principal::from_slice(b"Alice")?);
//! ledger
//!     .icrc1_transfer(&owner, TransferArgs::new(alice.clone(), 100u64))
//!     .expect("owner holds the supply");
//! assert_eq!(ledger.icrc1_balance_of(&alice), Tokens::from(100u64));
//! # Ok(())
//! # }
//! ```

use crate::{
    account::AccountKey,
    balances::BalanceStore,
    config::{Config, InitArgs, LedgerArgument, LedgerConfig, UpgradeArgs},
    error::TransferError,
    metrics::Metrics,
    transfer::{TransferFailure, TransferProcessor},
    types::{Account, Metadata, Principal, Tokens, Transaction, TransferArgs, TxIndex},
    Error, Result,
};
use chrono::Utc;
use parking_lot::RwLock;

/// Mutable ledger state, guarded as one unit
#[derive(Debug)]
struct LedgerState {
    config: LedgerConfig,
    balances: BalanceStore,
    total_supply: Tokens,
    /// Index the next applied transfer receives; the genesis mint is index 0
    next_index: TxIndex,
    halted: bool,
}

/// Main ledger interface
#[derive(Debug)]
pub struct Ledger {
    state: RwLock<LedgerState>,
    processor: TransferProcessor,
    metrics: Metrics,
}

impl Ledger {
    /// Initialize a ledger, crediting the whole supply to the owner
    pub fn init(args: InitArgs) -> Result<Self> {
        if args.owner.is_management() {
            return Err(Error::Config(
                "owner must not be the management principal".to_string(),
            ));
        }

        let minting_account = Account::new(args.owner);
        let mut balances = BalanceStore::new();
        balances
            .mint(AccountKey::from(&minting_account), args.total_supply)
            .map_err(|e| Error::Config(format!("cannot mint total supply: {}", e)))?;

        let config = LedgerConfig {
            name: args.name,
            symbol: args.symbol,
            decimals: args.decimals,
            fee: args.fee,
            metadata: args.metadata.unwrap_or_default(),
            minting_account,
        };

        tracing::info!(
            name = %config.name,
            symbol = %config.symbol,
            decimals = config.decimals,
            fee = %config.fee,
            total_supply = %args.total_supply,
            minting_account = %config.minting_account,
            "Ledger initialized"
        );

        let metrics = Metrics::new()?;
        metrics.accounts.set(balances.len() as i64);

        Ok(Self {
            state: RwLock::new(LedgerState {
                config,
                balances,
                total_supply: args.total_supply,
                next_index: 1,
                halted: false,
            }),
            processor: TransferProcessor::default(),
            metrics,
        })
    }

    /// Initialize from a bare or wrapped init argument
    pub fn from_argument(argument: LedgerArgument) -> Result<Self> {
        let (init_args, upgrade_args) = argument.into_parts();
        let ledger = Self::init(init_args)?;
        if let Some(upgrade_args) = upgrade_args {
            ledger.upgrade(upgrade_args);
        }
        Ok(ledger)
    }

    /// Initialize from service configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::from_argument(config.ledger.clone())?
            .with_max_memo_length(config.limits.max_memo_length))
    }

    /// Set the memo ceiling
    pub fn with_max_memo_length(mut self, max_memo_length: usize) -> Self {
        self.processor = TransferProcessor::new(max_memo_length);
        self
    }

    /// Replace display parameters and fee; balances and supply stay
    pub fn upgrade(&self, args: UpgradeArgs) {
        if args.is_empty() {
            tracing::debug!("Upgrade without overrides");
            return;
        }

        let mut state = self.state.write();
        let config = &mut state.config;
        if let Some(name) = args.name {
            config.name = name;
        }
        if let Some(symbol) = args.symbol {
            config.symbol = symbol;
        }
        if let Some(fee) = args.fee {
            config.fee = fee;
        }
        if let Some(metadata) = args.metadata {
            config.metadata = metadata;
        }

        tracing::info!(
            name = %config.name,
            symbol = %config.symbol,
            fee = %config.fee,
            "Ledger upgraded"
        );
    }

    /// Token name
    pub fn icrc1_name(&self) -> String {
        self.state.read().config.name.clone()
    }

    /// Token symbol
    pub fn icrc1_symbol(&self) -> String {
        self.state.read().config.symbol.clone()
    }

    /// Display decimals
    pub fn icrc1_decimals(&self) -> u8 {
        self.state.read().config.decimals
    }

    /// Transfer fee
    pub fn icrc1_fee(&self) -> Tokens {
        self.state.read().config.fee
    }

    /// Metadata entries as configured
    pub fn icrc1_metadata(&self) -> Metadata {
        self.state.read().config.metadata.clone()
    }

    /// Total supply fixed at init
    pub fn icrc1_total_supply(&self) -> Tokens {
        self.state.read().total_supply
    }

    /// Minting account, which also collects fees
    pub fn icrc1_minting_account(&self) -> Option<Account> {
        Some(self.state.read().config.minting_account.clone())
    }

    /// Balance of `account`, zero if it never received funds
    pub fn icrc1_balance_of(&self, account: &Account) -> Tokens {
        self.state.read().balances.get(&AccountKey::from(account))
    }

    /// Snapshot of the token parameters
    pub fn config(&self) -> LedgerConfig {
        self.state.read().config.clone()
    }

    /// Transfer on behalf of `caller`, returning the transaction index
    pub fn icrc1_transfer(
        &self,
        caller: &Principal,
        args: TransferArgs,
    ) -> std::result::Result<TxIndex, TransferError> {
        self.transfer_detailed(caller, args).map(|tx| tx.index)
    }

    /// Transfer on behalf of `caller`, returning the full record
    pub fn transfer_detailed(
        &self,
        caller: &Principal,
        args: TransferArgs,
    ) -> std::result::Result<Transaction, TransferError> {
        let mut state = self.state.write();

        if state.halted || !self.supply_matches(&mut state) {
            self.metrics
                .record_rejection(TransferError::TemporarilyUnavailable.reason());
            return Err(TransferError::TemporarilyUnavailable);
        }

        let LedgerState {
            config, balances, ..
        } = &mut *state;

        let applied = match self.processor.process(caller, &args, config, balances) {
            Ok(applied) => applied,
            Err(TransferFailure::Rejected(err)) => {
                tracing::warn!(
                    caller = %caller,
                    to = %args.to,
                    amount = %args.amount,
                    reason = err.reason(),
                    "Transfer rejected: {}",
                    err
                );
                self.metrics.record_rejection(err.reason());
                return Err(err);
            }
            Err(TransferFailure::Fault(err)) => {
                self.halt(&mut state, &err);
                return Err(TransferError::TemporarilyUnavailable);
            }
        };

        if !self.supply_matches(&mut state) {
            return Err(TransferError::TemporarilyUnavailable);
        }

        let index = state.next_index;
        state.next_index += 1;

        let tx = Transaction {
            index,
            from: applied.from,
            to: applied.to,
            amount: applied.amount,
            fee: applied.fee,
            memo: args.memo,
            created_at_time: args.created_at_time,
            timestamp: Utc::now()
                .timestamp_nanos_opt()
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(0),
        };

        self.metrics
            .record_transfer(tx.amount.get(), state.balances.len());

        tracing::debug!(
            index = tx.index,
            from = %tx.from,
            to = %tx.to,
            amount = %tx.amount,
            fee = %tx.fee,
            "Transfer applied"
        );

        Ok(tx)
    }

    /// Recompute the sum of every balance and compare it with the supply
    ///
    /// A mismatch halts the ledger.
    pub fn check_conservation(&self) -> Result<()> {
        let mut state = self.state.write();
        let sum = state.balances.recompute_sum();
        if sum == Some(state.total_supply) && state.balances.sum() == state.total_supply {
            return Ok(());
        }

        let err = Error::InvariantViolation(format!(
            "balances sum to {:?} but total supply is {}",
            sum, state.total_supply
        ));
        self.halt(&mut state, &err);
        Err(err)
    }

    /// True once an invariant fault stopped transfers
    pub fn is_halted(&self) -> bool {
        self.state.read().halted
    }

    /// Number of transfers applied so far
    pub fn transfer_count(&self) -> u64 {
        self.state.read().next_index - 1
    }

    /// Every materialized balance, in key order
    pub fn balances(&self) -> Vec<(Account, Tokens)> {
        self.state
            .read()
            .balances
            .iter()
            .filter_map(|(key, balance)| key.to_account().ok().map(|a| (a, *balance)))
            .collect()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Compare the running balance sum with the supply, halting on mismatch
    fn supply_matches(&self, state: &mut LedgerState) -> bool {
        if state.balances.sum() == state.total_supply {
            return true;
        }
        let err = Error::InvariantViolation(format!(
            "balances sum to {} but total supply is {}",
            state.balances.sum(),
            state.total_supply
        ));
        self.halt(state, &err);
        false
    }

    fn halt(&self, state: &mut LedgerState, err: &Error) {
        tracing::error!(error = %err, "Halting ledger: {}", err);
        state.halted = true;
        self.metrics.record_halt();
    }

    #[cfg(test)]
    fn corrupt_balance(&self, account: &Account, amount: Tokens) {
        let mut state = self.state.write();
        let _ = state.balances.mint(AccountKey::from(account), amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Memo, MetadataValue};

    const SUPPLY: u64 = 10_000_000_000_000;
    const FEE: u64 = 1_000;

    fn principal(name: &[u8]) -> Principal {
        Principal::from_slice(name).unwrap()
    }

    fn init_args(owner: Principal) -> InitArgs {
        InitArgs {
            total_supply: Tokens::from(SUPPLY),
            decimals: 8,
            fee: Tokens::from(FEE),
            name: "ICRC1".to_string(),
            symbol: "ICRC1".to_string(),
            metadata: None,
            owner,
        }
    }

    fn create_test_ledger() -> Ledger {
        Ledger::init(init_args(principal(b"Owner"))).unwrap()
    }

    #[test]
    fn test_init_seeds_owner() {
        let ledger = create_test_ledger();
        assert_eq!(ledger.icrc1_name(), "ICRC1");
        assert_eq!(ledger.icrc1_symbol(), "ICRC1");
        assert_eq!(ledger.icrc1_decimals(), 8);
        assert_eq!(ledger.icrc1_fee(), Tokens::from(FEE));
        assert_eq!(ledger.icrc1_total_supply(), Tokens::from(SUPPLY));
        assert!(ledger.icrc1_metadata().is_empty());
        assert_eq!(
            ledger.icrc1_balance_of(&Account::new(principal(b"Owner"))),
            Tokens::from(SUPPLY)
        );
        assert_eq!(
            ledger.icrc1_minting_account(),
            Some(Account::new(principal(b"Owner")))
        );
    }

    #[test]
    fn test_init_rejects_management_owner() {
        assert!(Ledger::init(init_args(Principal::management())).is_err());
    }

    #[test]
    fn test_anonymous_owner_allowed() {
        let ledger = Ledger::init(init_args(Principal::anonymous())).unwrap();
        assert_eq!(
            ledger.icrc1_balance_of(&Account::new(Principal::anonymous())),
            Tokens::from(SUPPLY)
        );
    }

    #[test]
    fn test_transfer_indices_increase() {
        let ledger = create_test_ledger();
        let owner = principal(b"Owner");
        let to = Account::new(principal(b"UserA"));

        let first = ledger
            .icrc1_transfer(&owner, TransferArgs::new(to.clone(), 1u64))
            .unwrap();
        let second = ledger
            .icrc1_transfer(&owner, TransferArgs::new(to, 1u64))
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(ledger.transfer_count(), 2);
    }

    #[test]
    fn test_rejection_consumes_no_index() {
        let ledger = create_test_ledger();
        let owner = principal(b"Owner");
        let to = Account::new(principal(b"UserA"));

        let mut bad = TransferArgs::new(to.clone(), 1u64);
        bad.fee = Some(Tokens::ZERO);
        assert!(ledger.icrc1_transfer(&owner, bad).is_err());

        let index = ledger
            .icrc1_transfer(&owner, TransferArgs::new(to, 1u64))
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(
            ledger
                .metrics()
                .transfer_errors
                .with_label_values(&["bad_fee"])
                .get(),
            1
        );
    }

    #[test]
    fn test_transaction_record_carries_request_fields() {
        let ledger = create_test_ledger();
        let owner = principal(b"Owner");
        let mut args = TransferArgs::new(Account::new(principal(b"UserA")), 7u64);
        args.memo = Some(Memo::from(b"hello".to_vec()));
        args.created_at_time = Some(1_700_000_000_000_000_000);

        let tx = ledger.transfer_detailed(&owner, args).unwrap();
        assert_eq!(tx.from, Account::new(owner));
        assert_eq!(tx.amount, Tokens::from(7u64));
        assert_eq!(tx.fee, Tokens::from(FEE));
        assert_eq!(tx.memo, Some(Memo::from(b"hello".to_vec())));
        assert_eq!(tx.created_at_time, Some(1_700_000_000_000_000_000));
    }

    #[test]
    fn test_upgrade_keeps_balances() {
        let ledger = create_test_ledger();
        let owner = principal(b"Owner");
        ledger
            .icrc1_transfer(&owner, TransferArgs::new(Account::new(principal(b"UserA")), 10u64))
            .unwrap();

        ledger.upgrade(UpgradeArgs {
            name: Some("Renamed".to_string()),
            fee: Some(Tokens::from(5u64)),
            metadata: Some(vec![MetadataValue::entry("icrc1:logo", "data:,")]),
            ..UpgradeArgs::default()
        });

        assert_eq!(ledger.icrc1_name(), "Renamed");
        assert_eq!(ledger.icrc1_symbol(), "ICRC1");
        assert_eq!(ledger.icrc1_fee(), Tokens::from(5u64));
        assert_eq!(ledger.icrc1_metadata().len(), 1);
        assert_eq!(ledger.icrc1_total_supply(), Tokens::from(SUPPLY));
        assert_eq!(
            ledger.icrc1_balance_of(&Account::new(principal(b"UserA"))),
            Tokens::from(10u64)
        );
    }

    #[test]
    fn test_wrapped_argument_applies_upgrade() {
        let ledger = Ledger::from_argument(LedgerArgument::Wrapped {
            init_args: init_args(principal(b"Owner")),
            upgrade_args: Some(UpgradeArgs {
                symbol: Some("TKN".to_string()),
                ..UpgradeArgs::default()
            }),
        })
        .unwrap();
        assert_eq!(ledger.icrc1_symbol(), "TKN");
        assert_eq!(ledger.icrc1_name(), "ICRC1");
    }

    #[test]
    fn test_metadata_passes_through_duplicates() {
        let mut args = init_args(principal(b"Owner"));
        args.metadata = Some(vec![
            MetadataValue::entry("k", 1u64),
            MetadataValue::entry("k", "two"),
        ]);
        let ledger = Ledger::init(args).unwrap();
        assert_eq!(
            ledger.icrc1_metadata(),
            vec![
                ("k".to_string(), MetadataValue::Nat(1)),
                ("k".to_string(), MetadataValue::Text("two".to_string())),
            ]
        );
    }

    #[test]
    fn test_conservation_violation_halts() {
        let ledger = create_test_ledger();
        assert!(ledger.check_conservation().is_ok());

        ledger.corrupt_balance(&Account::new(principal(b"Ghost")), Tokens::from(1u64));

        assert!(ledger.check_conservation().is_err());
        assert!(ledger.is_halted());
        assert_eq!(ledger.metrics().halted.get(), 1);

        let result = ledger.icrc1_transfer(
            &principal(b"Owner"),
            TransferArgs::new(Account::new(principal(b"UserA")), 1u64),
        );
        assert_eq!(result, Err(TransferError::TemporarilyUnavailable));

        // Queries keep working
        assert_eq!(ledger.icrc1_total_supply(), Tokens::from(SUPPLY));
    }

    #[test]
    fn test_running_sum_mismatch_halts_on_transfer() {
        let ledger = create_test_ledger();
        ledger.corrupt_balance(&Account::new(principal(b"Ghost")), Tokens::from(1u64));

        let result = ledger.icrc1_transfer(
            &principal(b"Owner"),
            TransferArgs::new(Account::new(principal(b"UserA")), 1u64),
        );
        assert_eq!(result, Err(TransferError::TemporarilyUnavailable));
        assert!(ledger.is_halted());
        assert_eq!(
            ledger.icrc1_balance_of(&Account::new(principal(b"UserA"))),
            Tokens::ZERO
        );
    }

    #[test]
    fn test_balances_listing() {
        let ledger = create_test_ledger();
        ledger
            .icrc1_transfer(
                &principal(b"Owner"),
                TransferArgs::new(Account::new(principal(b"UserA")), 10u64),
            )
            .unwrap();
        let balances = ledger.balances();
        assert_eq!(balances.len(), 2);
        let total: u128 = balances.iter().map(|(_, b)| b.get()).sum();
        assert_eq!(total, SUPPLY as u128);
    }

    #[test]
    fn test_from_config_applies_memo_limit() {
        let mut config = Config::default();
        config.limits.max_memo_length = 2;
        let ledger = Ledger::from_config(&config).unwrap();

        let mut args = TransferArgs::new(Account::new(principal(b"UserA")), 1u64);
        args.memo = Some(Memo::from(vec![1, 2, 3]));
        assert_eq!(
            ledger.icrc1_transfer(&Principal::anonymous(), args),
            Err(TransferError::MemoTooLong { max_length: 2 })
        );
    }
}

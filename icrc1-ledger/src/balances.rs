//! Balance store
//!
//! Maps [`AccountKey`] to a token balance. Unknown keys read as zero and
//! entries are created lazily on first credit. The only mutator is
//! [`BalanceStore::apply`], which validates a whole batch of debits and
//! credits before touching any balance.

use crate::account::AccountKey;
use crate::types::Tokens;
use std::collections::BTreeMap;
use thiserror::Error;

/// Reasons a batch cannot be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// A debited account cannot cover its total debit
    #[error("Insufficient funds for {key}: balance {balance}, needed {needed}")]
    InsufficientFunds {
        /// Debited account
        key: AccountKey,
        /// Current balance
        balance: Tokens,
        /// Total debit requested
        needed: Tokens,
    },

    /// A balance would exceed the representable range
    #[error("Balance overflow for {0}")]
    Overflow(AccountKey),

    /// The sum of all balances would leave the representable range
    #[error("Balance sum overflow")]
    SumOverflow,
}

/// In-memory balance map
#[derive(Debug, Clone, Default)]
pub struct BalanceStore {
    balances: BTreeMap<AccountKey, Tokens>,
    sum: Tokens,
}

impl BalanceStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `key`, zero if never credited
    pub fn get(&self, key: &AccountKey) -> Tokens {
        self.balances.get(key).copied().unwrap_or(Tokens::ZERO)
    }

    /// Credit `amount` out of thin air
    ///
    /// Only initialization seeds balances this way; everything afterwards
    /// moves through [`BalanceStore::apply`].
    pub fn mint(&mut self, key: AccountKey, amount: Tokens) -> Result<(), BalanceError> {
        let sum = self.sum.checked_add(amount).ok_or(BalanceError::SumOverflow)?;
        let balance = self
            .get(&key)
            .checked_add(amount)
            .ok_or_else(|| BalanceError::Overflow(key.clone()))?;
        self.balances.insert(key, balance);
        self.sum = sum;
        Ok(())
    }

    /// Apply a batch of debits and credits as one unit
    ///
    /// Debits against the same key are summed and checked against the
    /// balance held *before* the batch. If any check fails nothing changes.
    pub fn apply(
        &mut self,
        debits: &[(AccountKey, Tokens)],
        credits: &[(AccountKey, Tokens)],
    ) -> Result<(), BalanceError> {
        let debit_totals = aggregate(debits)?;
        let credit_totals = aggregate(credits)?;

        let mut next: BTreeMap<AccountKey, Tokens> = BTreeMap::new();
        for (key, needed) in &debit_totals {
            let balance = self.get(key);
            let remaining =
                balance
                    .checked_sub(*needed)
                    .ok_or_else(|| BalanceError::InsufficientFunds {
                        key: key.clone(),
                        balance,
                        needed: *needed,
                    })?;
            next.insert(key.clone(), remaining);
        }
        for (key, amount) in &credit_totals {
            let current = next.get(key).copied().unwrap_or_else(|| self.get(key));
            let updated = current
                .checked_add(*amount)
                .ok_or_else(|| BalanceError::Overflow(key.clone()))?;
            next.insert(key.clone(), updated);
        }

        let debited = sum_of(debit_totals.values())?;
        let credited = sum_of(credit_totals.values())?;
        let sum = self
            .sum
            .checked_sub(debited)
            .and_then(|s| s.checked_add(credited))
            .ok_or(BalanceError::SumOverflow)?;

        // Every check passed: commit
        for (key, balance) in next {
            self.balances.insert(key, balance);
        }
        self.sum = sum;
        Ok(())
    }

    /// Running sum of all balances, maintained by every mutation
    pub fn sum(&self) -> Tokens {
        self.sum
    }

    /// Recompute the sum of all balances from scratch
    pub fn recompute_sum(&self) -> Option<Tokens> {
        self.balances
            .values()
            .try_fold(Tokens::ZERO, |acc, b| acc.checked_add(*b))
    }

    /// Number of materialized entries
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// True when no entry has been materialized
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&AccountKey, &Tokens)> {
        self.balances.iter()
    }
}

fn aggregate(entries: &[(AccountKey, Tokens)]) -> Result<BTreeMap<AccountKey, Tokens>, BalanceError> {
    let mut totals: BTreeMap<AccountKey, Tokens> = BTreeMap::new();
    for (key, amount) in entries {
        let total = totals.entry(key.clone()).or_insert(Tokens::ZERO);
        *total = total
            .checked_add(*amount)
            .ok_or_else(|| BalanceError::Overflow(key.clone()))?;
    }
    Ok(totals)
}

fn sum_of<'a>(mut amounts: impl Iterator<Item = &'a Tokens>) -> Result<Tokens, BalanceError> {
    amounts
        .try_fold(Tokens::ZERO, |acc, a| acc.checked_add(*a))
        .ok_or(BalanceError::SumOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Account, Principal};

    fn key(name: &[u8]) -> AccountKey {
        AccountKey::from(&Account::new(Principal::from_slice(name).unwrap()))
    }

    fn tokens(n: u64) -> Tokens {
        Tokens::from(n)
    }

    #[test]
    fn test_unknown_key_reads_zero() {
        let store = BalanceStore::new();
        assert_eq!(store.get(&key(b"nobody")), Tokens::ZERO);
        assert!(store.is_empty());
    }

    #[test]
    fn test_mint_credits_and_tracks_sum() {
        let mut store = BalanceStore::new();
        store.mint(key(b"owner"), tokens(100)).unwrap();
        assert_eq!(store.get(&key(b"owner")), tokens(100));
        assert_eq!(store.sum(), tokens(100));
    }

    #[test]
    fn test_apply_moves_funds() {
        let mut store = BalanceStore::new();
        store.mint(key(b"a"), tokens(100)).unwrap();

        store
            .apply(
                &[(key(b"a"), tokens(30))],
                &[(key(b"b"), tokens(25)), (key(b"fee"), tokens(5))],
            )
            .unwrap();

        assert_eq!(store.get(&key(b"a")), tokens(70));
        assert_eq!(store.get(&key(b"b")), tokens(25));
        assert_eq!(store.get(&key(b"fee")), tokens(5));
        assert_eq!(store.sum(), tokens(100));
        assert_eq!(store.recompute_sum(), Some(tokens(100)));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut store = BalanceStore::new();
        store.mint(key(b"a"), tokens(10)).unwrap();
        store.mint(key(b"b"), tokens(50)).unwrap();

        let err = store
            .apply(
                &[(key(b"b"), tokens(20)), (key(b"a"), tokens(11))],
                &[(key(b"c"), tokens(31))],
            )
            .unwrap_err();

        assert_eq!(
            err,
            BalanceError::InsufficientFunds {
                key: key(b"a"),
                balance: tokens(10),
                needed: tokens(11),
            }
        );
        assert_eq!(store.get(&key(b"a")), tokens(10));
        assert_eq!(store.get(&key(b"b")), tokens(50));
        assert_eq!(store.get(&key(b"c")), Tokens::ZERO);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_repeated_debits_are_aggregated() {
        let mut store = BalanceStore::new();
        store.mint(key(b"a"), tokens(10)).unwrap();

        // Each debit alone fits, together they don't
        let result = store.apply(
            &[(key(b"a"), tokens(6)), (key(b"a"), tokens(6))],
            &[(key(b"b"), tokens(12))],
        );
        assert!(matches!(result, Err(BalanceError::InsufficientFunds { .. })));
        assert_eq!(store.get(&key(b"a")), tokens(10));
    }

    #[test]
    fn test_debit_and_credit_on_same_key_net_out() {
        let mut store = BalanceStore::new();
        store.mint(key(b"owner"), tokens(1_000)).unwrap();

        store
            .apply(
                &[(key(b"owner"), tokens(110))],
                &[(key(b"user"), tokens(100)), (key(b"owner"), tokens(10))],
            )
            .unwrap();

        assert_eq!(store.get(&key(b"owner")), tokens(900));
        assert_eq!(store.get(&key(b"user")), tokens(100));
    }

    #[test]
    fn test_debit_is_checked_before_same_batch_credit() {
        let mut store = BalanceStore::new();
        store.mint(key(b"owner"), tokens(100)).unwrap();

        // Net effect would be -100, but the full debit of 105 exceeds 100
        let result = store.apply(
            &[(key(b"owner"), tokens(105))],
            &[(key(b"user"), tokens(100)), (key(b"owner"), tokens(5))],
        );
        assert!(matches!(result, Err(BalanceError::InsufficientFunds { .. })));
        assert_eq!(store.get(&key(b"owner")), tokens(100));
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let mut store = BalanceStore::new();
        store.mint(key(b"a"), Tokens::new(u128::MAX)).unwrap();
        assert_eq!(store.mint(key(b"b"), tokens(1)), Err(BalanceError::SumOverflow));
        assert_eq!(store.get(&key(b"b")), Tokens::ZERO);
    }

    #[test]
    fn test_batch_total_overflow_rejected() {
        let mut store = BalanceStore::new();
        let half = Tokens::new(u128::MAX / 2 + 1);
        assert_eq!(
            store.apply(&[], &[(key(b"a"), half), (key(b"b"), half)]),
            Err(BalanceError::SumOverflow)
        );
        assert!(store.is_empty());
        assert_eq!(store.sum(), Tokens::ZERO);
    }

    #[test]
    fn test_zero_balance_entry_remains() {
        let mut store = BalanceStore::new();
        store.mint(key(b"a"), tokens(5)).unwrap();
        store
            .apply(&[(key(b"a"), tokens(5))], &[(key(b"b"), tokens(5))])
            .unwrap();
        assert_eq!(store.get(&key(b"a")), Tokens::ZERO);
        assert_eq!(store.len(), 2);
    }
}

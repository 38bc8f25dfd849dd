//! Canonical account keys
//!
//! An [`AccountKey`] is the byte encoding of an account used as the balance
//! map key:
//!
//! ```text
//! [owner_len: u8][owner bytes (owner_len)][subaccount (32 bytes)]
//! ```
//!
//! The subaccount slot always holds the *effective* subaccount, so an account
//! without a subaccount and one with [`DEFAULT_SUBACCOUNT`] share a key.

use crate::types::{
    Account, Principal, Subaccount, DEFAULT_SUBACCOUNT, MAX_PRINCIPAL_LENGTH, SUBACCOUNT_LENGTH,
};
use crate::{Error, Result};
use std::fmt;

/// Canonical balance-map key derived from an [`Account`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountKey(Vec<u8>);

impl AccountKey {
    /// Encode an account
    pub fn from_account(account: &Account) -> Self {
        let owner = account.owner.as_slice();
        let mut bytes = Vec::with_capacity(1 + owner.len() + SUBACCOUNT_LENGTH);
        // Principal construction caps the owner at 29 bytes
        bytes.push(owner.len() as u8);
        bytes.extend_from_slice(owner);
        bytes.extend_from_slice(account.effective_subaccount());
        Self(bytes)
    }

    /// Decode back into the canonical account
    ///
    /// The default subaccount decodes to `None`.
    pub fn to_account(&self) -> Result<Account> {
        let (&len, rest) = self
            .0
            .split_first()
            .ok_or_else(|| Error::InvalidAccountKey("empty key".to_string()))?;
        let len = len as usize;
        if len > MAX_PRINCIPAL_LENGTH || rest.len() != len + SUBACCOUNT_LENGTH {
            return Err(Error::InvalidAccountKey(format!(
                "owner length {} does not match key length {}",
                len,
                self.0.len()
            )));
        }
        let owner = Principal::from_slice(&rest[..len])?;
        let subaccount: Subaccount = rest[len..]
            .try_into()
            .map_err(|_| Error::InvalidAccountKey("truncated subaccount".to_string()))?;
        let subaccount = if &subaccount == DEFAULT_SUBACCOUNT {
            None
        } else {
            Some(subaccount)
        };
        Ok(Account::with_subaccount(owner, subaccount))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&Account> for AccountKey {
    fn from(account: &Account) -> Self {
        Self::from_account(account)
    }
}

impl TryFrom<Vec<u8>> for AccountKey {
    type Error = Error;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        let key = Self(bytes);
        key.to_account()?;
        Ok(key)
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_account() {
            Ok(account) => write!(f, "{}", account),
            Err(_) => write!(f, "<invalid key>"),
        }
    }
}

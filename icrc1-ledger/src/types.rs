//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic ordering (accounts are used as map keys)
//! - Exact arithmetic (integer atomic units, checked operations only)
//! - Explicit optionality (absent fields are `None`, never a sentinel)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a principal in bytes
pub const MAX_PRINCIPAL_LENGTH: usize = 29;

/// Length of a subaccount in bytes
pub const SUBACCOUNT_LENGTH: usize = 32;

/// Subaccount identifier
pub type Subaccount = [u8; SUBACCOUNT_LENGTH];

/// Subaccount used when an account names none
pub const DEFAULT_SUBACCOUNT: &Subaccount = &[0; SUBACCOUNT_LENGTH];

/// Caller identity
///
/// Wraps [`candid::Principal`] so the textual form (`2vxsx-fae`) is what
/// config files and JSON carry. A byte array is still accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(candid::Principal);

impl Principal {
    /// Create principal from raw bytes
    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        if bytes.len() > MAX_PRINCIPAL_LENGTH {
            return Err(crate::Error::InvalidPrincipal(format!(
                "principal is {} bytes, maximum is {}",
                bytes.len(),
                MAX_PRINCIPAL_LENGTH
            )));
        }
        candid::Principal::try_from_slice(bytes)
            .map(Self)
            .map_err(|e| crate::Error::InvalidPrincipal(e.to_string()))
    }

    /// Parse the textual form
    pub fn from_text(text: &str) -> crate::Result<Self> {
        candid::Principal::from_text(text)
            .map(Self)
            .map_err(|e| crate::Error::InvalidPrincipal(format!("{:?}: {}", text, e)))
    }

    /// Textual form
    pub fn to_text(&self) -> String {
        self.0.to_text()
    }

    /// The anonymous principal
    pub fn anonymous() -> Self {
        Self(candid::Principal::anonymous())
    }

    /// The empty principal, never a valid receiver
    pub fn management() -> Self {
        Self(candid::Principal::management_canister())
    }

    /// Get as bytes
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// True for the empty principal
    pub fn is_management(&self) -> bool {
        self.0.as_slice().is_empty()
    }
}

// Raw byte order
impl PartialOrd for Principal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Principal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl From<candid::Principal> for Principal {
    fn from(principal: candid::Principal) -> Self {
        Self(principal)
    }
}

impl From<Principal> for candid::Principal {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl std::str::FromStr for Principal {
    type Err = crate::Error;

    fn from_str(text: &str) -> crate::Result<Self> {
        Self::from_text(text)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_text())
    }
}

impl Serialize for Principal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_text())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PrincipalVisitor;

        impl<'de> serde::de::Visitor<'de> for PrincipalVisitor {
            type Value = Principal;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a textual principal or up to 29 bytes")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Principal, E> {
                Principal::from_text(v).map_err(E::custom)
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Principal, E> {
                Principal::from_slice(v).map_err(E::custom)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Principal, A::Error> {
                let mut bytes = Vec::with_capacity(MAX_PRINCIPAL_LENGTH);
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                Principal::from_slice(&bytes).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(PrincipalVisitor)
    }
}

/// Account addressing a balance: owner plus optional subaccount
///
/// An absent subaccount and [`DEFAULT_SUBACCOUNT`] name the same account.
/// Equality, ordering and hashing all go through [`Account::effective_subaccount`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Owning principal
    pub owner: Principal,
    /// Optional subaccount
    #[serde(default)]
    pub subaccount: Option<Subaccount>,
}

impl Account {
    /// Account with the default subaccount
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            subaccount: None,
        }
    }

    /// Account with an explicit subaccount
    pub fn with_subaccount(owner: Principal, subaccount: Option<Subaccount>) -> Self {
        Self { owner, subaccount }
    }

    /// Subaccount this account resolves to
    #[inline]
    pub fn effective_subaccount(&self) -> &Subaccount {
        self.subaccount.as_ref().unwrap_or(DEFAULT_SUBACCOUNT)
    }
}

impl PartialEq for Account {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.effective_subaccount() == other.effective_subaccount()
    }
}

impl Eq for Account {}

impl PartialOrd for Account {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Account {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.owner
            .cmp(&other.owner)
            .then_with(|| self.effective_subaccount().cmp(other.effective_subaccount()))
    }
}

impl std::hash::Hash for Account {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.effective_subaccount().hash(state);
    }
}

impl From<Principal> for Account {
    fn from(owner: Principal) -> Self {
        Self::new(owner)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subaccount {
            Some(subaccount) if subaccount != DEFAULT_SUBACCOUNT => {
                write!(f, "{}.", self.owner)?;
                for byte in subaccount {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            _ => write!(f, "{}", self.owner),
        }
    }
}

/// Token amount in atomic units
///
/// Amounts up to `u64::MAX` serialize as plain integers. Larger amounts
/// serialize as decimal strings, and must be written that way in JSON or
/// TOML input, since neither format carries integers wider than 64 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tokens(u128);

impl Serialize for Tokens {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(self.0) {
            Ok(units) => serializer.serialize_u64(units),
            Err(_) => serializer.collect_str(&self.0),
        }
    }
}

// Untagged and TOML input never reaches `deserialize_u128`, so accept any
// integer form and check the sign.
impl<'de> Deserialize<'de> for Tokens {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TokensVisitor;

        impl serde::de::Visitor<'_> for TokensVisitor {
            type Value = Tokens;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer amount")
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Tokens, E> {
                Ok(Tokens(v as u128))
            }

            fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<Tokens, E> {
                Ok(Tokens(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Tokens, E> {
                u128::try_from(v)
                    .map(Tokens)
                    .map_err(|_| E::custom(format!("negative amount {}", v)))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Tokens, E> {
                v.parse::<u128>()
                    .map(Tokens)
                    .map_err(|e| E::custom(format!("invalid amount {:?}: {}", v, e)))
            }
        }

        deserializer.deserialize_any(TokensVisitor)
    }
}

impl Tokens {
    /// Zero tokens
    pub const ZERO: Tokens = Tokens(0);

    /// Create from atomic units
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Atomic units
    pub const fn get(&self) -> u128 {
        self.0
    }

    /// Checked addition
    pub fn checked_add(self, other: Tokens) -> Option<Tokens> {
        self.0.checked_add(other.0).map(Tokens)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Tokens) -> Option<Tokens> {
        self.0.checked_sub(other.0).map(Tokens)
    }

    /// True when zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Tokens {
    fn from(units: u64) -> Self {
        Self(units as u128)
    }
}

impl From<u128> for Tokens {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque memo attached to a transfer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memo(pub Vec<u8>);

impl Memo {
    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Memo {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Value of a metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataValue {
    /// Natural number
    Nat(u64),
    /// Signed integer
    Int(i64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl MetadataValue {
    /// Build a `(key, value)` entry
    pub fn entry(key: impl Into<String>, value: impl Into<MetadataValue>) -> (String, MetadataValue) {
        (key.into(), value.into())
    }
}

impl From<u64> for MetadataValue {
    fn from(n: u64) -> Self {
        MetadataValue::Nat(n)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Int(n)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<Vec<u8>> for MetadataValue {
    fn from(bytes: Vec<u8>) -> Self {
        MetadataValue::Blob(bytes)
    }
}

/// Ordered metadata entries, keys may repeat
pub type Metadata = Vec<(String, MetadataValue)>;

/// Index of an applied transfer
pub type TxIndex = u64;

/// Transfer request as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferArgs {
    /// Sender subaccount under the caller
    #[serde(default)]
    pub from_subaccount: Option<Subaccount>,
    /// Destination account
    pub to: Account,
    /// Amount to move
    pub amount: Tokens,
    /// Fee the caller expects to pay
    #[serde(default)]
    pub fee: Option<Tokens>,
    /// Opaque memo
    #[serde(default)]
    pub memo: Option<Memo>,
    /// Caller-supplied creation time (nanoseconds since Unix epoch)
    #[serde(default)]
    pub created_at_time: Option<u64>,
}

impl TransferArgs {
    /// Plain transfer of `amount` to `to` with every optional field absent
    pub fn new(to: Account, amount: impl Into<Tokens>) -> Self {
        Self {
            from_subaccount: None,
            to,
            amount: amount.into(),
            fee: None,
            memo: None,
            created_at_time: None,
        }
    }
}

/// Record of an applied transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction index
    pub index: TxIndex,
    /// Debited account
    pub from: Account,
    /// Credited account
    pub to: Account,
    /// Amount moved
    pub amount: Tokens,
    /// Fee charged
    pub fee: Tokens,
    /// Memo, if any
    pub memo: Option<Memo>,
    /// Caller-supplied creation time
    pub created_at_time: Option<u64>,
    /// Ledger time at application (nanoseconds since Unix epoch)
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_principal_length_limit() {
        assert!(Principal::from_slice(&[1u8; MAX_PRINCIPAL_LENGTH]).is_ok());
        assert!(Principal::from_slice(&[1u8; MAX_PRINCIPAL_LENGTH + 1]).is_err());
    }

    #[test]
    fn test_principal_display() {
        assert_eq!(Principal::anonymous().to_string(), "2vxsx-fae");
        assert_eq!(Principal::management().to_string(), "aaaaa-aa");
        let p = Principal::from_slice(b"Owner").unwrap();
        assert_eq!(Principal::from_text(&p.to_string()).unwrap(), p);
    }

    #[test]
    fn test_principal_from_text() {
        assert_eq!(
            Principal::from_text("2vxsx-fae").unwrap(),
            Principal::anonymous()
        );
        assert!(Principal::from_text("aaaaa-aa").unwrap().is_management());
        assert!(Principal::from_text("not-a-principal").is_err());
    }

    #[test]
    fn test_principal_serde_forms() {
        let json = serde_json::to_string(&Principal::anonymous()).unwrap();
        assert_eq!(json, "\"2vxsx-fae\"");

        let text: Principal = serde_json::from_str("\"2vxsx-fae\"").unwrap();
        let bytes: Principal = serde_json::from_str("[4]").unwrap();
        assert_eq!(text, Principal::anonymous());
        assert_eq!(bytes, Principal::anonymous());

        let too_long = serde_json::to_string(&vec![1u8; MAX_PRINCIPAL_LENGTH + 1]).unwrap();
        assert!(serde_json::from_str::<Principal>(&too_long).is_err());
    }

    #[test]
    fn test_default_subaccount_equivalence() {
        let owner = Principal::from_slice(b"UserA").unwrap();
        let implicit = Account::new(owner.clone());
        let explicit = Account::with_subaccount(owner.clone(), Some([0u8; 32]));
        let other = Account::with_subaccount(owner, Some([1u8; 32]));

        assert_eq!(implicit, explicit);
        assert_ne!(implicit, other);

        let set: HashSet<Account> = [implicit, explicit, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_account_ordering_by_owner_first() {
        let a = Account::with_subaccount(Principal::from_slice(b"A").unwrap(), Some([9u8; 32]));
        let b = Account::new(Principal::from_slice(b"B").unwrap());
        assert!(a < b);
    }

    #[test]
    fn test_tokens_checked_arithmetic() {
        let max = Tokens::new(u128::MAX);
        assert_eq!(max.checked_add(Tokens::from(1u64)), None);
        assert_eq!(Tokens::ZERO.checked_sub(Tokens::from(1u64)), None);
        assert_eq!(
            Tokens::from(10u64).checked_sub(Tokens::from(4u64)),
            Some(Tokens::from(6u64))
        );
    }

    #[test]
    fn test_tokens_deserialize_forms() {
        let t: Tokens = serde_json::from_str("10000000000000").unwrap();
        assert_eq!(t, Tokens::from(10_000_000_000_000u64));
        let t: Tokens = serde_json::from_str("\"340282366920938463463374607431768211455\"").unwrap();
        assert_eq!(t, Tokens::new(u128::MAX));
        assert!(serde_json::from_str::<Tokens>("-1").is_err());
    }

    #[test]
    fn test_tokens_wide_amounts_use_string_form() {
        let wide = Tokens::new(u64::MAX as u128 + 1);
        let json = serde_json::to_string(&wide).unwrap();
        assert_eq!(json, "\"18446744073709551616\"");
        assert_eq!(serde_json::from_str::<Tokens>(&json).unwrap(), wide);

        assert_eq!(serde_json::to_string(&Tokens::from(42u64)).unwrap(), "42");
        // A bare integer past u64 is read as a float and refused
        assert!(serde_json::from_str::<Tokens>("18446744073709551616").is_err());
    }

    #[test]
    fn test_transfer_args_json_optional_fields() {
        let json = r#"{"to":{"owner":"2vxsx-fae"},"amount":42}"#;
        let args: TransferArgs = serde_json::from_str(json).unwrap();
        assert_eq!(args.amount, Tokens::from(42u64));
        assert_eq!(args.fee, None);
        assert_eq!(args.memo, None);
        assert_eq!(args.to.subaccount, None);
        assert_eq!(args.to.owner, Principal::anonymous());
    }
}

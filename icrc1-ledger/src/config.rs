//! Configuration for the ledger
//!
//! Two layers live here:
//!
//! - [`LedgerConfig`]: the token's immutable parameters, built once from
//!   [`InitArgs`] and only replaced field-by-field by [`UpgradeArgs`]
//! - [`Config`]: service settings for the binary (limits, mailbox size, the
//!   init argument to boot with), loaded from TOML and `LEDGER_*` variables

use crate::types::{Account, Metadata, Principal, Tokens};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default ceiling on memo length in bytes
pub const DEFAULT_MAX_MEMO_LENGTH: usize = 32;

/// Token parameters fixed at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Display name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Display decimals, never applied to balances
    pub decimals: u8,
    /// Fee charged on every transfer
    pub fee: Tokens,
    /// Metadata entries, returned verbatim
    pub metadata: Metadata,
    /// Account seeded with the total supply; also collects fees
    pub minting_account: Account,
}

impl LedgerConfig {
    /// Account credited with every transfer fee
    pub fn fee_collector(&self) -> &Account {
        &self.minting_account
    }
}

/// Arguments consumed once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitArgs {
    /// Supply credited to the owner
    pub total_supply: Tokens,
    /// Display decimals
    pub decimals: u8,
    /// Transfer fee
    pub fee: Tokens,
    /// Display name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Optional metadata entries
    #[serde(default)]
    pub metadata: Option<Metadata>,
    /// Minting account owner
    pub owner: Principal,
}

/// Overrides applied on upgrade; balances and supply are never touched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeArgs {
    /// New display name
    #[serde(default)]
    pub name: Option<String>,
    /// New ticker symbol
    #[serde(default)]
    pub symbol: Option<String>,
    /// New transfer fee
    #[serde(default)]
    pub fee: Option<Tokens>,
    /// Replacement metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl UpgradeArgs {
    /// True when no field is overridden
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.symbol.is_none() && self.fee.is_none() && self.metadata.is_none()
    }
}

/// Init argument in either the bare or the wrapped form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerArgument {
    /// `{ initArgs, upgradeArgs }`
    Wrapped {
        /// Init arguments
        #[serde(rename = "initArgs")]
        init_args: InitArgs,
        /// Optional overrides applied right after init
        #[serde(rename = "upgradeArgs", default)]
        upgrade_args: Option<UpgradeArgs>,
    },
    /// Bare init arguments
    Init(InitArgs),
}

impl LedgerArgument {
    /// Split into init arguments and optional overrides
    pub fn into_parts(self) -> (InitArgs, Option<UpgradeArgs>) {
        match self {
            LedgerArgument::Wrapped {
                init_args,
                upgrade_args,
            } => (init_args, upgrade_args),
            LedgerArgument::Init(init_args) => (init_args, None),
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<InitArgs> for LedgerArgument {
    fn from(init_args: InitArgs) -> Self {
        LedgerArgument::Init(init_args)
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Argument the ledger is initialized with
    pub ledger: LedgerArgument,

    /// Request limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Actor configuration
    #[serde(default)]
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "icrc1-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: LedgerArgument::Init(InitArgs {
                total_supply: Tokens::from(10_000_000_000_000u64),
                decimals: 8,
                fee: Tokens::from(1_000u64),
                name: "ICRC1".to_string(),
                symbol: "ICRC1".to_string(),
                metadata: None,
                owner: Principal::anonymous(),
            }),
            limits: LimitsConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum memo length in bytes
    pub max_memo_length: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_memo_length: DEFAULT_MAX_MEMO_LENGTH,
        }
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Mailbox capacity (bounded for backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    ///
    /// `LEDGER_CONFIG` names a TOML file to start from; the remaining
    /// variables override single fields.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = match std::env::var("LEDGER_CONFIG") {
            Ok(path) => Config::from_file(PathBuf::from(path))?,
            Err(_) => Config::default(),
        };

        if let Ok(value) = std::env::var("LEDGER_MAX_MEMO_LENGTH") {
            config.limits.max_memo_length = value.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_MAX_MEMO_LENGTH: {}", e))
            })?;
        }

        if let Ok(value) = std::env::var("LEDGER_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = value.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings that would make the service unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.actor.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "actor.mailbox_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

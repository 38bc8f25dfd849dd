//! Actor-based call serialization for the ledger
//!
//! The host delivers calls one at a time. This module models that with a
//! single Tokio task draining a bounded mailbox:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │      One message per ICRC-1 call, caller attached    │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   Handles messages strictly in arrival order          │
//! │                       │                               │
//! │                       ▼                               │
//! │        Ledger::icrc1_* (one lock per call)            │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::error::TransferError;
use crate::types::{Account, Metadata, Principal, Tokens, TransferArgs, TxIndex};
use crate::{Error, Ledger, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// `icrc1_name`
    Name {
        /// Reply channel
        response: oneshot::Sender<String>,
    },

    /// `icrc1_symbol`
    Symbol {
        /// Reply channel
        response: oneshot::Sender<String>,
    },

    /// `icrc1_decimals`
    Decimals {
        /// Reply channel
        response: oneshot::Sender<u8>,
    },

    /// `icrc1_fee`
    Fee {
        /// Reply channel
        response: oneshot::Sender<Tokens>,
    },

    /// `icrc1_metadata`
    Metadata {
        /// Reply channel
        response: oneshot::Sender<Metadata>,
    },

    /// `icrc1_total_supply`
    TotalSupply {
        /// Reply channel
        response: oneshot::Sender<Tokens>,
    },

    /// `icrc1_minting_account`
    MintingAccount {
        /// Reply channel
        response: oneshot::Sender<Option<Account>>,
    },

    /// `icrc1_balance_of`
    BalanceOf {
        /// Account to look up
        account: Account,
        /// Reply channel
        response: oneshot::Sender<Tokens>,
    },

    /// `icrc1_transfer`
    Transfer {
        /// Principal sending the transfer
        caller: Principal,
        /// Transfer request
        args: TransferArgs,
        /// Reply channel
        response: oneshot::Sender<std::result::Result<TxIndex, TransferError>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Ledger state
    ledger: Arc<Ledger>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(ledger: Arc<Ledger>, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { ledger, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let LedgerMessage::Shutdown = msg {
                tracing::info!("Ledger actor shutting down");
                break;
            }
            self.handle_message(msg);
        }
    }

    /// Handle a single message
    fn handle_message(&self, msg: LedgerMessage) {
        let ledger = &self.ledger;
        // A dropped receiver only means the caller stopped waiting
        match msg {
            LedgerMessage::Name { response } => {
                let _ = response.send(ledger.icrc1_name());
            }

            LedgerMessage::Symbol { response } => {
                let _ = response.send(ledger.icrc1_symbol());
            }

            LedgerMessage::Decimals { response } => {
                let _ = response.send(ledger.icrc1_decimals());
            }

            LedgerMessage::Fee { response } => {
                let _ = response.send(ledger.icrc1_fee());
            }

            LedgerMessage::Metadata { response } => {
                let _ = response.send(ledger.icrc1_metadata());
            }

            LedgerMessage::TotalSupply { response } => {
                let _ = response.send(ledger.icrc1_total_supply());
            }

            LedgerMessage::MintingAccount { response } => {
                let _ = response.send(ledger.icrc1_minting_account());
            }

            LedgerMessage::BalanceOf { account, response } => {
                let _ = response.send(ledger.icrc1_balance_of(&account));
            }

            LedgerMessage::Transfer {
                caller,
                args,
                response,
            } => {
                let _ = response.send(ledger.icrc1_transfer(&caller, args));
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Token name
    pub async fn icrc1_name(&self) -> Result<String> {
        self.request(|response| LedgerMessage::Name { response }).await
    }

    /// Token symbol
    pub async fn icrc1_symbol(&self) -> Result<String> {
        self.request(|response| LedgerMessage::Symbol { response }).await
    }

    /// Display decimals
    pub async fn icrc1_decimals(&self) -> Result<u8> {
        self.request(|response| LedgerMessage::Decimals { response })
            .await
    }

    /// Transfer fee
    pub async fn icrc1_fee(&self) -> Result<Tokens> {
        self.request(|response| LedgerMessage::Fee { response }).await
    }

    /// Metadata entries
    pub async fn icrc1_metadata(&self) -> Result<Metadata> {
        self.request(|response| LedgerMessage::Metadata { response })
            .await
    }

    /// Total supply
    pub async fn icrc1_total_supply(&self) -> Result<Tokens> {
        self.request(|response| LedgerMessage::TotalSupply { response })
            .await
    }

    /// Minting account
    pub async fn icrc1_minting_account(&self) -> Result<Option<Account>> {
        self.request(|response| LedgerMessage::MintingAccount { response })
            .await
    }

    /// Balance of an account
    pub async fn icrc1_balance_of(&self, account: Account) -> Result<Tokens> {
        self.request(|response| LedgerMessage::BalanceOf { account, response })
            .await
    }

    /// Transfer on behalf of `caller`
    ///
    /// The outer `Result` fails only if the actor is gone; the inner one
    /// carries the ledger's verdict.
    pub async fn icrc1_transfer(
        &self,
        caller: Principal,
        args: TransferArgs,
    ) -> Result<std::result::Result<TxIndex, TransferError>> {
        self.request(|response| LedgerMessage::Transfer {
            caller,
            args,
            response,
        })
        .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(ledger: Arc<Ledger>, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(ledger, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

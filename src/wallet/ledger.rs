//! In-memory ledger implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::errors::{WalletError, WalletResult};
use super::WalletLedger;
use crate::game::entities::{Chips, UserId};

#[derive(Debug, Default)]
struct Account {
    balance: Chips,
    /// Chips escrowed per hand, keyed by game id.
    authorized: HashMap<String, Chips>,
}

/// Mutex-guarded ledger for tests and single-process deployments.
/// Accounts are created on first touch with the default balance.
pub struct MemoryLedger {
    accounts: Mutex<HashMap<UserId, Account>>,
    default_balance: Chips,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        let default_balance = std::env::var("DEFAULT_WALLET_BALANCE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);
        Self::new(default_balance)
    }
}

impl MemoryLedger {
    pub fn new(default_balance: Chips) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            default_balance,
        }
    }

    /// Preload a balance, for tests.
    pub fn with_balance(self, user_id: UserId, balance: Chips) -> Self {
        self.accounts.lock().unwrap().insert(
            user_id,
            Account {
                balance,
                authorized: HashMap::new(),
            },
        );
        self
    }

    /// Total escrowed for a user in one hand, for tests.
    pub fn authorized_total(&self, user_id: UserId, game_id: &str) -> Chips {
        let accounts = self.accounts.lock().unwrap();
        accounts
            .get(&user_id)
            .and_then(|a| a.authorized.get(game_id))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl WalletLedger for MemoryLedger {
    async fn value(&self, user_id: UserId) -> WalletResult<Chips> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.entry(user_id).or_insert_with(|| Account {
            balance: self.default_balance,
            authorized: HashMap::new(),
        });
        Ok(account.balance)
    }

    async fn authorize(&self, user_id: UserId, game_id: &str, amount: Chips) -> WalletResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.entry(user_id).or_insert_with(|| Account {
            balance: self.default_balance,
            authorized: HashMap::new(),
        });
        if account.balance < amount {
            return Err(WalletError::InsufficientBalance {
                user_id,
                available: account.balance,
                required: amount,
            });
        }
        account.balance -= amount;
        *account.authorized.entry(game_id.to_string()).or_default() += amount;
        Ok(())
    }

    async fn approve(&self, user_id: UserId, game_id: &str) -> WalletResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(&user_id)
            .ok_or(WalletError::WalletNotFound(user_id))?;
        account.authorized.remove(game_id);
        Ok(())
    }

    async fn cancel(&self, user_id: UserId, game_id: &str) -> WalletResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(&user_id)
            .ok_or(WalletError::WalletNotFound(user_id))?;
        if let Some(amount) = account.authorized.remove(game_id) {
            account.balance += amount;
        }
        Ok(())
    }

    async fn release(&self, user_id: UserId, game_id: &str, amount: Chips) -> WalletResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(&user_id)
            .ok_or(WalletError::WalletNotFound(user_id))?;
        if let Some(held) = account.authorized.get_mut(game_id) {
            let refund = amount.min(*held);
            *held -= refund;
            account.balance += refund;
        }
        Ok(())
    }

    async fn deposit(&self, user_id: UserId, amount: Chips) -> WalletResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.entry(user_id).or_insert_with(|| Account {
            balance: self.default_balance,
            authorized: HashMap::new(),
        });
        account.balance += amount;
        Ok(())
    }
}

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::Error;

/// Displays an amount with two decimals, rounding half to even at the
/// third decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Money(pub Decimal);

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:.2}` on a Decimal truncates; round first.
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub name: String,
    pub balance: Decimal,
}

/// Result of a mutating store operation.
/// Its `Display` is the outcome message sent back to callers.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created,
    AlreadyExists,
    NotFound,
    Deposited {
        name: String,
        amount: Decimal,
        balance: Decimal,
    },
    Withdrew {
        name: String,
        amount: Decimal,
        balance: Decimal,
    },
    InsufficientFunds,
    /// The new balance would not fit in a `Decimal`; nothing changed.
    OutOfRange,
    Deleted,
}

impl Outcome {
    /// Whether the operation changed the store.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            Outcome::Created
                | Outcome::Deposited { .. }
                | Outcome::Withdrew { .. }
                | Outcome::Deleted
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created => write!(f, "Account created successfully."),
            Outcome::AlreadyExists => write!(f, "Account already exists."),
            Outcome::NotFound => write!(f, "Account does not exist."),
            Outcome::Deposited {
                name,
                amount,
                balance,
            } => write!(
                f,
                "Deposited {} to {name}'s account. New balance: {}",
                Money(*amount),
                Money(*balance)
            ),
            Outcome::Withdrew {
                name,
                amount,
                balance,
            } => write!(
                f,
                "Withdrew {} from {name}'s account. New balance: {}",
                Money(*amount),
                Money(*balance)
            ),
            Outcome::InsufficientFunds => write!(f, "Insufficient funds."),
            Outcome::OutOfRange => write!(f, "Amount out of range."),
            Outcome::Deleted => write!(f, "Account deleted successfully."),
        }
    }
}

/// All accounts behind one lock.
///
/// Every operation acquires the lock once, runs to completion and releases it,
/// so no caller ever observes a half-applied change. There is no per-account
/// locking; operations on different accounts serialize too.
///
/// Amounts are applied as given: negative deposits, negative withdrawals and
/// negative opening balances are all accepted.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create_account(&self, name: &str, balance: Decimal) -> Outcome {
        let mut accounts = self.accounts.lock().await;
        let outcome = if accounts.contains_key(name) {
            Outcome::AlreadyExists
        } else {
            accounts.insert(
                name.to_owned(),
                Account {
                    name: name.to_owned(),
                    balance,
                },
            );
            Outcome::Created
        };
        debug!(account = name, %balance, ?outcome, "create account");
        outcome
    }

    pub async fn deposit(&self, name: &str, amount: Decimal) -> Outcome {
        let mut accounts = self.accounts.lock().await;
        let outcome = match accounts.get_mut(name) {
            None => Outcome::NotFound,
            Some(account) => match account.balance.checked_add(amount) {
                Some(balance) => {
                    account.balance = balance;
                    Outcome::Deposited {
                        name: account.name.clone(),
                        amount,
                        balance,
                    }
                }
                None => Outcome::OutOfRange,
            },
        };
        debug!(account = name, %amount, ?outcome, "deposit");
        outcome
    }

    /// Rejects the withdrawal when the balance is below `amount`.
    /// A negative `amount` always passes that check and raises the balance.
    pub async fn withdraw(&self, name: &str, amount: Decimal) -> Outcome {
        let mut accounts = self.accounts.lock().await;
        let outcome = match accounts.get_mut(name) {
            None => Outcome::NotFound,
            Some(account) if account.balance < amount => Outcome::InsufficientFunds,
            Some(account) => match account.balance.checked_sub(amount) {
                Some(balance) => {
                    account.balance = balance;
                    Outcome::Withdrew {
                        name: account.name.clone(),
                        amount,
                        balance,
                    }
                }
                None => Outcome::OutOfRange,
            },
        };
        debug!(account = name, %amount, ?outcome, "withdraw");
        outcome
    }

    /// Current balance, or [`Error::AccountNotFound`] so that a missing
    /// account is never mistaken for a zero balance.
    pub async fn consult_balance(&self, name: &str) -> Result<Decimal, Error> {
        let accounts = self.accounts.lock().await;
        let balance = accounts
            .get(name)
            .map(|account| account.balance)
            .ok_or(Error::AccountNotFound);
        debug!(account = name, found = balance.is_ok(), "consult balance");
        balance
    }

    pub async fn delete_account(&self, name: &str) -> Outcome {
        let mut accounts = self.accounts.lock().await;
        let outcome = match accounts.remove(name) {
            Some(_) => Outcome::Deleted,
            None => Outcome::NotFound,
        };
        debug!(account = name, ?outcome, "delete account");
        outcome
    }

    pub async fn len(&self) -> usize {
        self.accounts.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.lock().await.is_empty()
    }

    /// Consistent copy of every account, sorted by name.
    pub async fn accounts(&self) -> Vec<Account> {
        let mut snapshot: Vec<_> = self.accounts.lock().await.values().cloned().collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }
}

//! Routes one decoded request to exactly one [`AccountStore`] operation.
//!
//! The dispatcher never performs I/O; it maps a [`RequestEnvelope`] to a
//! [`ResponseEnvelope`]. Unknown operation names, payloads of the wrong shape
//! and callers rejected by the [`CallerPolicy`] fail before the store is
//! touched.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::dto::{
    ConsultBalanceRequest, ConsultBalanceResponse, CreateAccountRequest, DeleteAccountRequest,
    DepositRequest, MessageResponse, RequestEnvelope, ResponseEnvelope, WithdrawRequest,
};
use crate::stores::{AccountStore, Outcome};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    Deposit,
    Withdraw,
    ConsultBalance,
    DeleteAccount,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::CreateAccount,
        Operation::Deposit,
        Operation::Withdraw,
        Operation::ConsultBalance,
        Operation::DeleteAccount,
    ];

    /// Stable name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateAccount => "Accounts.CreateAccount",
            Operation::Deposit => "Accounts.Deposit",
            Operation::Withdraw => "Accounts.Withdraw",
            Operation::ConsultBalance => "Accounts.ConsultBalance",
            Operation::DeleteAccount => "Accounts.DeleteAccount",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|operation| operation.as_str() == s)
            .ok_or_else(|| Error::UnknownOperation(s.to_owned()))
    }
}

/// Decides whether a caller may run a privileged operation
/// (account creation and deletion).
pub trait CallerPolicy: Send + Sync {
    fn authorize(&self, operation: Operation, caller_id: &str) -> Result<(), Error>;
}

/// Accepts every caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl CallerPolicy for AllowAll {
    fn authorize(&self, _operation: Operation, _caller_id: &str) -> Result<(), Error> {
        Ok(())
    }
}

/// Accepts only the listed caller ids.
#[derive(Debug, Default, Clone)]
pub struct AllowList {
    callers: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(callers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            callers: callers.into_iter().map(Into::into).collect(),
        }
    }
}

impl CallerPolicy for AllowList {
    fn authorize(&self, operation: Operation, caller_id: &str) -> Result<(), Error> {
        if self.callers.contains(caller_id) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "caller '{caller_id}' may not call {operation}"
            )))
        }
    }
}

impl From<Outcome> for MessageResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            message: outcome.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<AccountStore>,
    policy: Arc<dyn CallerPolicy>,
}

impl Dispatcher {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self {
            store,
            policy: Arc::new(AllowAll),
        }
    }

    pub fn with_policy(mut self, policy: impl CallerPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub async fn dispatch(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let id = request.id;
        match self.call(&request.method, request.params).await {
            Ok(result) => ResponseEnvelope::ok(id, result),
            Err(Error::AccountNotFound) => {
                debug!(id, method = %request.method, "account not found");
                ResponseEnvelope::from_error(id, &Error::AccountNotFound)
            }
            Err(err) => {
                warn!(id, method = %request.method, error = %err, "request rejected");
                ResponseEnvelope::from_error(id, &err)
            }
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, Error> {
        let operation: Operation = method.parse()?;
        match operation {
            Operation::CreateAccount => {
                let request: CreateAccountRequest = decode(params)?;
                self.policy.authorize(operation, &request.id)?;
                let outcome = self
                    .store
                    .create_account(&request.name, request.balance)
                    .await;
                reply(operation, &request.name, outcome)
            }
            Operation::Deposit => {
                let request: DepositRequest = decode(params)?;
                let outcome = self.store.deposit(&request.name, request.amount).await;
                reply(operation, &request.name, outcome)
            }
            Operation::Withdraw => {
                let request: WithdrawRequest = decode(params)?;
                let outcome = self.store.withdraw(&request.name, request.amount).await;
                reply(operation, &request.name, outcome)
            }
            Operation::ConsultBalance => {
                let request: ConsultBalanceRequest = decode(params)?;
                let balance = self.store.consult_balance(&request.name).await?;
                encode(ConsultBalanceResponse { balance })
            }
            Operation::DeleteAccount => {
                let request: DeleteAccountRequest = decode(params)?;
                self.policy.authorize(operation, &request.id)?;
                let outcome = self.store.delete_account(&request.name).await;
                reply(operation, &request.name, outcome)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(params: Value) -> Result<T, Error> {
    serde_json::from_value(params).map_err(|err| Error::MalformedPayload(err.to_string()))
}

fn reply(operation: Operation, account: &str, outcome: Outcome) -> Result<Value, Error> {
    if outcome.is_applied() {
        debug!(%operation, account, "applied");
    } else {
        debug!(%operation, account, %outcome, "not applied");
    }
    encode(MessageResponse::from(outcome))
}

fn encode<T: Serialize>(response: T) -> Result<Value, Error> {
    Ok(serde_json::to_value(response)?)
}

//! Callers of the account service.
//!
//! [`Client`] speaks all five operations over one connection. The role
//! wrappers expose only what each role is meant to use:
//! - [`AgencyClient`]: create, consult, delete (sends its caller id)
//! - [`TellerClient`]: deposit, withdraw, consult
//!
//! Role restriction lives here, on the caller side; the server does not
//! enforce it.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, warn};

use crate::config::AGENCY_ID;
use crate::dispatcher::Operation;
use crate::dto::{
    ConsultBalanceRequest, ConsultBalanceResponse, CreateAccountRequest, DeleteAccountRequest,
    DepositRequest, MessageResponse, RequestEnvelope, ResponseEnvelope, WithdrawRequest,
};
use crate::wire::{deadline, write_frame, FrameReader};
use crate::Error;

pub struct Client {
    reader: FrameReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    next_id: u64,
    timeout: Option<Duration>,
    // Set once a call fails mid-exchange; a late response may still be in
    // flight, so the connection can no longer pair requests with responses.
    broken: bool,
}

impl Client {
    /// Connects to `addr`. `timeout` bounds the connect and every later call.
    pub async fn connect(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<Self, Error> {
        let stream = deadline(timeout, TcpStream::connect(addr)).await??;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: FrameReader::new(reader),
            writer,
            next_id: 1,
            timeout,
            broken: false,
        })
    }

    /// Sends one request and waits for its response.
    ///
    /// After a transport failure (timeout included) every later call fails
    /// with [`Error::ConnectionClosed`]; reconnect to continue.
    pub async fn call_method(&mut self, method: &str, params: Value) -> Result<Value, Error> {
        if self.broken {
            return Err(Error::ConnectionClosed);
        }
        let id = self.next_id;
        self.next_id += 1;
        let request = RequestEnvelope {
            id,
            method: method.to_owned(),
            params,
        };
        debug!(id, method, "calling");

        let response = match self.exchange(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(id, method, error = %err, "connection unusable");
                self.broken = true;
                return Err(err);
            }
        };
        response.into_result()
    }

    async fn exchange(&mut self, request: &RequestEnvelope) -> Result<ResponseEnvelope, Error> {
        let response = deadline(self.timeout, async {
            write_frame(&mut self.writer, request).await?;
            self.reader
                .read_frame::<ResponseEnvelope>()
                .await?
                .ok_or(Error::ConnectionClosed)
        })
        .await??;

        if response.id != request.id {
            return Err(Error::UnexpectedResponse(format!(
                "expected response {}, got {}",
                request.id, response.id
            )));
        }
        Ok(response)
    }

    pub async fn call<Req, Resp>(&mut self, operation: Operation, request: &Req) -> Result<Resp, Error>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let params = serde_json::to_value(request)?;
        let result = self.call_method(operation.as_str(), params).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn create_account(
        &mut self,
        name: &str,
        balance: Decimal,
        caller_id: &str,
    ) -> Result<String, Error> {
        let request = CreateAccountRequest {
            name: name.to_owned(),
            balance,
            id: caller_id.to_owned(),
        };
        let response: MessageResponse = self.call(Operation::CreateAccount, &request).await?;
        Ok(response.message)
    }

    pub async fn deposit(&mut self, name: &str, amount: Decimal) -> Result<String, Error> {
        let request = DepositRequest {
            name: name.to_owned(),
            amount,
        };
        let response: MessageResponse = self.call(Operation::Deposit, &request).await?;
        Ok(response.message)
    }

    pub async fn withdraw(&mut self, name: &str, amount: Decimal) -> Result<String, Error> {
        let request = WithdrawRequest {
            name: name.to_owned(),
            amount,
        };
        let response: MessageResponse = self.call(Operation::Withdraw, &request).await?;
        Ok(response.message)
    }

    /// Fails with [`Error::AccountNotFound`] when the account does not exist.
    pub async fn consult_balance(&mut self, name: &str) -> Result<Decimal, Error> {
        let request = ConsultBalanceRequest {
            name: name.to_owned(),
        };
        let response: ConsultBalanceResponse =
            self.call(Operation::ConsultBalance, &request).await?;
        Ok(response.balance)
    }

    pub async fn delete_account(&mut self, name: &str, caller_id: &str) -> Result<String, Error> {
        let request = DeleteAccountRequest {
            name: name.to_owned(),
            id: caller_id.to_owned(),
        };
        let response: MessageResponse = self.call(Operation::DeleteAccount, &request).await?;
        Ok(response.message)
    }
}

/// Administrative role.
pub struct AgencyClient {
    client: Client,
    id: String,
}

impl AgencyClient {
    pub async fn connect(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<Self, Error> {
        Ok(Self {
            client: Client::connect(addr, timeout).await?,
            id: AGENCY_ID.to_owned(),
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub async fn create_account(&mut self, name: &str, balance: Decimal) -> Result<String, Error> {
        self.client.create_account(name, balance, &self.id).await
    }

    pub async fn consult_balance(&mut self, name: &str) -> Result<Decimal, Error> {
        self.client.consult_balance(name).await
    }

    pub async fn delete_account(&mut self, name: &str) -> Result<String, Error> {
        self.client.delete_account(name, &self.id).await
    }
}

/// Teller role.
pub struct TellerClient {
    client: Client,
}

impl TellerClient {
    pub async fn connect(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<Self, Error> {
        Ok(Self {
            client: Client::connect(addr, timeout).await?,
        })
    }

    pub async fn deposit(&mut self, name: &str, amount: Decimal) -> Result<String, Error> {
        self.client.deposit(name, amount).await
    }

    pub async fn withdraw(&mut self, name: &str, amount: Decimal) -> Result<String, Error> {
        self.client.withdraw(name, amount).await
    }

    pub async fn consult_balance(&mut self, name: &str) -> Result<Decimal, Error> {
        self.client.consult_balance(name).await
    }
}

//! Plain data exchanged between clients and the dispatcher.
//!
//! Each operation has its own request shape carrying only the fields it needs.
//! Requests and responses travel inside [`RequestEnvelope`] / [`ResponseEnvelope`],
//! one JSON object per line (see [`crate::wire`]).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateAccountRequest {
    pub name: String,
    pub balance: Decimal,
    /// Caller identifier, checked by the dispatcher's caller policy.
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepositRequest {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WithdrawRequest {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultBalanceRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteAccountRequest {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

/// Response of every operation that reports an outcome message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultBalanceResponse {
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    UnknownOperation,
    MalformedPayload,
    Unauthorized,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestEnvelope {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Exactly one of `result` and `error` is set; use the constructors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl ResponseEnvelope {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(WireError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Builds the failure response for a dispatcher error.
    /// Errors without a wire code are reported as malformed payloads.
    pub fn from_error(id: u64, err: &Error) -> Self {
        let code = err.code().unwrap_or(ErrorCode::MalformedPayload);
        Self::err(id, code, err.to_string())
    }

    pub fn into_result(self) -> Result<Value, Error> {
        match (self.result, self.error) {
            (_, Some(err)) => Err(Error::from_wire(err.code, err.message)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(Error::UnexpectedResponse(format!(
                "response {} carries neither result nor error",
                self.id
            ))),
        }
    }
}

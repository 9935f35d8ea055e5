//! Errors for the account service.
//!
//! Business outcomes such as "already exists" or "insufficient funds" are not
//! errors here; they are reported as [`Outcome`](crate::Outcome) values. This
//! type covers the failures a caller has to interpret:
//! - the one hard business failure (consulting a missing account)
//! - protocol failures raised by the dispatcher before the store is touched
//! - transport failures on either side of a connection

use thiserror::Error;

use crate::dto::ErrorCode;

#[derive(Debug, Error)]
pub enum Error {
    #[error("account does not exist")]
    AccountNotFound,
    #[error("no such operation: {0}")]
    UnknownOperation(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("caller not authorized: {0}")]
    Unauthorized(String),
    #[error("frame longer than {0} bytes")]
    FrameTooLong(usize),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("timed out")]
    Timeout,
    #[error("connection closed by peer")]
    ConnectionClosed,
}

impl Error {
    /// Wire code for errors that may be sent back to a caller.
    /// Transport-side errors never travel over the wire and have no code.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::AccountNotFound => Some(ErrorCode::NotFound),
            Error::UnknownOperation(_) => Some(ErrorCode::UnknownOperation),
            Error::MalformedPayload(_) | Error::Json(_) | Error::FrameTooLong(_) => {
                Some(ErrorCode::MalformedPayload)
            }
            Error::Unauthorized(_) => Some(ErrorCode::Unauthorized),
            _ => None,
        }
    }

    /// Rebuilds the error a server reported.
    pub fn from_wire(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::NotFound => Error::AccountNotFound,
            ErrorCode::UnknownOperation => Error::UnknownOperation(message),
            ErrorCode::MalformedPayload => Error::MalformedPayload(message),
            ErrorCode::Unauthorized => Error::Unauthorized(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes_survive_round_trip() {
        let errors = [
            Error::AccountNotFound,
            Error::UnknownOperation("Accounts.Transfer".into()),
            Error::MalformedPayload("missing field `name`".into()),
            Error::Unauthorized("1234".into()),
        ];
        for err in errors {
            let code = err.code().unwrap();
            let rebuilt = Error::from_wire(code, err.to_string());
            assert_eq!(rebuilt.code(), Some(code));
        }
    }

    #[test]
    fn test_transport_errors_have_no_code() {
        assert!(Error::Timeout.code().is_none());
        assert!(Error::ConnectionClosed.code().is_none());
        assert!(Error::UnexpectedResponse("id mismatch".into()).code().is_none());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(Error::AccountNotFound.to_string(), "account does not exist");
    }
}

//! Storage layer for the account service.
//!
//! The whole state of the server is one [`AccountStore`]: a map from account
//! name to [`Account`] guarded by a single lock. Nothing outside the store
//! mutates an account.

mod accounts;

pub use accounts::{Account, AccountStore, Money, Outcome};

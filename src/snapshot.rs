//! CSV report of account balances.
//!
//! Written once on server shutdown. It is an operator report only; nothing
//! reads it back.

use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

use crate::stores::{Account, AccountStore};
use crate::Error;

#[derive(Debug, Serialize, PartialEq)]
pub struct BalanceRow {
    pub name: String,
    pub balance: Decimal,
}

impl From<Account> for BalanceRow {
    fn from(account: Account) -> Self {
        Self {
            name: account.name,
            balance: account.balance,
        }
    }
}

/// Writes an iterator of records to a CSV writer.
pub fn write_csv<T, W>(writer: W, records: impl Iterator<Item = T>) -> csv::Result<()>
where
    T: Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes every account in the store, sorted by name.
pub async fn write_report<W: Write>(store: &AccountStore, writer: W) -> Result<(), Error> {
    let rows = store.accounts().await.into_iter().map(BalanceRow::from);
    write_csv(writer, rows)?;
    Ok(())
}

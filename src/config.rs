//! Command-line and environment configuration for the server and the two
//! role clients.

use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::time::Duration;

/// Caller id the agency client sends with privileged operations.
pub const AGENCY_ID: &str = "7777";

#[derive(Debug, Clone, Parser)]
#[command(name = "rusty-teller", about = "Account server")]
pub struct ServerConfig {
    /// Address to accept connections on.
    #[arg(long, env = "BANK_LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: String,

    /// Close connections that stay silent for this many seconds.
    #[arg(long, env = "BANK_IDLE_TIMEOUT_SECS")]
    pub idle_timeout_secs: Option<u64>,

    /// Caller id allowed to create and delete accounts. Repeatable.
    /// Without any, every caller is allowed.
    #[arg(long = "allowed-caller", env = "BANK_ALLOWED_CALLERS", value_delimiter = ',')]
    pub allowed_callers: Vec<String>,

    /// Print all balances as CSV to stdout on shutdown.
    #[arg(long, env = "BANK_REPORT_ON_SHUTDOWN")]
    pub report_on_shutdown: bool,
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgencyCommand {
    Create,
    Consult,
    Delete,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "agency", about = "Create, consult and delete accounts")]
pub struct AgencyArgs {
    #[arg(value_enum)]
    pub command: AgencyCommand,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// Opening balance, required by `create`.
    #[arg(allow_negative_numbers = true)]
    pub balance: Option<Decimal>,
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl AgencyArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TellerCommand {
    Deposit,
    Withdraw,
    Consult,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "teller", about = "Deposit, withdraw and consult balances")]
pub struct TellerArgs {
    #[arg(value_enum)]
    pub command: TellerCommand,
    pub host: String,
    pub port: u16,
    pub name: String,
    /// Amount, required by `deposit` and `withdraw`.
    #[arg(allow_negative_numbers = true)]
    pub amount: Option<Decimal>,
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl TellerArgs {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

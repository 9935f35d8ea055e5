pub mod client;
pub mod config;
pub mod dispatcher;
pub mod dto;
mod error;
pub mod server;
pub mod snapshot;
mod stores;
pub mod telemetry;
pub mod wire;

pub use client::{AgencyClient, Client, TellerClient};
pub use dispatcher::{AllowAll, AllowList, CallerPolicy, Dispatcher, Operation};
pub use error::Error;
pub use server::{run, Server};
pub use stores::{Account, AccountStore, Money, Outcome};

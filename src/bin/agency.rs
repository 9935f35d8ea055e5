use anyhow::{Context, Result};
use clap::Parser;

use rusty_teller::config::{AgencyArgs, AgencyCommand};
use rusty_teller::{telemetry, AgencyClient, Money};

#[tokio::main]
async fn main() -> Result<()> {
    let args = AgencyArgs::parse();
    telemetry::init("warn");

    let mut client = AgencyClient::connect(args.addr(), args.timeout())
        .await
        .with_context(|| format!("connecting to server at {}", args.addr()))?;

    match args.command {
        AgencyCommand::Create => {
            let balance = args
                .balance
                .context("Usage: agency create <machine> <port> <name> <balance>")?;
            let message = client
                .create_account(&args.name, balance)
                .await
                .context("creating account")?;
            println!(
                "Name: {}\nBalance: {}\nMessage: {message}",
                args.name,
                Money(balance)
            );
        }
        AgencyCommand::Consult => {
            let balance = client
                .consult_balance(&args.name)
                .await
                .context("consulting balance")?;
            println!("Name: {}\nBalance: {}", args.name, Money(balance));
        }
        AgencyCommand::Delete => {
            let message = client
                .delete_account(&args.name)
                .await
                .context("deleting account")?;
            println!("Name: {}\nMessage: {message}", args.name);
        }
    }
    Ok(())
}

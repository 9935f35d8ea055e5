use anyhow::{Context, Result};
use clap::Parser;

use rusty_teller::config::{TellerArgs, TellerCommand};
use rusty_teller::{telemetry, Money, TellerClient};

#[tokio::main]
async fn main() -> Result<()> {
    let args = TellerArgs::parse();
    telemetry::init("warn");

    let mut client = TellerClient::connect(args.addr(), args.timeout())
        .await
        .with_context(|| format!("connecting to server at {}", args.addr()))?;

    match args.command {
        TellerCommand::Deposit => {
            let amount = args
                .amount
                .context("Usage: teller deposit <machine> <port> <name> <amount>")?;
            let message = client
                .deposit(&args.name, amount)
                .await
                .context("depositing amount")?;
            println!("{message}");
        }
        TellerCommand::Withdraw => {
            let amount = args
                .amount
                .context("Usage: teller withdraw <machine> <port> <name> <amount>")?;
            let message = client
                .withdraw(&args.name, amount)
                .await
                .context("withdrawing amount")?;
            println!("{message}");
        }
        TellerCommand::Consult => {
            let balance = client
                .consult_balance(&args.name)
                .await
                .context("consulting balance")?;
            println!("Name: {}\nBalance: {}", args.name, Money(balance));
        }
    }
    Ok(())
}

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    transport::{HttpLedgerClient, RemoteWallet},
    CrowdfundClient, StatusUpdate, TxOutcome,
};
use ledger_integration::{MissingWallet, WalletSession};
use shared::{
    amount::{Amount, ETHER_DECIMALS},
    domain::{Address, CampaignId},
};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;
mod settings;

use render::render_snapshot;
use settings::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Crowdfunding dashboard")]
struct Args {
    /// Ledger gateway base URL; overrides settings.
    #[arg(long)]
    ledger_url: Option<String>,
    /// Account the local wallet signs as; overrides settings.
    #[arg(long)]
    account: Option<Address>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current snapshot (default).
    Show,
    /// Follow status updates and re-render after each rebuild until interrupted.
    Watch,
    Create {
        title: String,
        /// Unit pledge cost in ether, e.g. 0.05.
        pledge_cost: String,
        pledges_needed: u64,
    },
    Fund {
        campaign_id: u64,
        quantity: u64,
    },
    Complete {
        campaign_id: u64,
    },
    Cancel {
        campaign_id: u64,
    },
    Refund,
    Withdraw,
    Destroy,
    Ban {
        entrepreneur: Address,
    },
    ChangeOwner {
        new_owner: Address,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings();
    if let Some(ledger_url) = args.ledger_url {
        settings.ledger_url = ledger_url;
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let account = match args.account {
        Some(account) => Some(account),
        None => settings.account_address()?,
    };
    let ledger = Arc::new(HttpLedgerClient::new(&settings.ledger_url)?);
    let wallet: Arc<dyn WalletSession> = match account {
        Some(account) => Arc::new(RemoteWallet::new(ledger.clone(), Some(account))),
        None => Arc::new(MissingWallet::new()),
    };
    let client = CrowdfundClient::new(ledger.clone(), wallet);
    info!(ledger = %ledger.base_url(), "dashboard starting");

    let mut updates = client.subscribe_status();
    client.start().await;
    print_updates(&mut updates);

    let command = args.command.unwrap_or(Command::Show);
    if let Command::Watch = command {
        return watch(&client).await;
    }

    let outcome = match dispatch(&client, command).await? {
        Some(outcome) => outcome,
        None => {
            print_snapshot(&client).await;
            return Ok(());
        }
    };
    print_updates(&mut updates);
    print_snapshot(&client).await;
    if let TxOutcome::Failed { message } = outcome {
        anyhow::bail!(message);
    }
    Ok(())
}

async fn dispatch(client: &CrowdfundClient, command: Command) -> Result<Option<TxOutcome>> {
    let outcome = match command {
        Command::Show | Command::Watch => return Ok(None),
        Command::Create {
            title,
            pledge_cost,
            pledges_needed,
        } => {
            let pledge_cost = Amount::parse_units(&pledge_cost, ETHER_DECIMALS)?;
            client
                .create_campaign(&title, pledge_cost, pledges_needed)
                .await
        }
        Command::Fund {
            campaign_id,
            quantity,
        } => client.fund_campaign(CampaignId(campaign_id), quantity).await,
        Command::Complete { campaign_id } => {
            client.complete_campaign(CampaignId(campaign_id)).await
        }
        Command::Cancel { campaign_id } => client.cancel_campaign(CampaignId(campaign_id)).await,
        Command::Refund => client.claim_refunds().await,
        Command::Withdraw => client.withdraw_owner_funds().await,
        Command::Destroy => client.destroy_contract().await,
        Command::Ban { entrepreneur } => client.ban_entrepreneur(entrepreneur).await,
        Command::ChangeOwner { new_owner } => client.change_owner(new_owner).await,
    };
    Ok(Some(outcome))
}

async fn watch(client: &CrowdfundClient) -> Result<()> {
    print_snapshot(client).await;
    let updates = client.status().stream();
    tokio::pin!(updates);
    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(update) = update else {
                    return Ok(());
                };
                print_update(&update);
                if update == StatusUpdate::Cleared {
                    print_snapshot(client).await;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                return Ok(());
            }
        }
    }
}

fn print_update(update: &StatusUpdate) {
    let message = update.message();
    if !message.is_empty() {
        println!("status: {message}");
    }
}

fn print_updates(updates: &mut broadcast::Receiver<StatusUpdate>) {
    while let Ok(update) = updates.try_recv() {
        print_update(&update);
    }
}

async fn print_snapshot(client: &CrowdfundClient) {
    match client.snapshot().await {
        Some(snapshot) => print!("{}", render_snapshot(&snapshot)),
        None => println!("no snapshot available"),
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campaign_tracker::campaign::{CampaignManager, CampaignStore};
use campaign_tracker::config::Config;
use campaign_tracker::forum::ForumClient;

/// Track forum signature campaign rounds.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Folder where campaign data is saved. Defaults to DATA_FOLDER, then ./campaigns.
    #[arg(long, global = true)]
    data_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Campaign related actions
    #[command(subcommand)]
    Campaign(CampaignCommand),
    /// Round related actions
    #[command(subcommand)]
    Round(RoundCommand),
}

#[derive(Debug, Subcommand)]
enum CampaignCommand {
    /// Add a new campaign
    Add { campaign_name: String },
    /// Add a participant by forum uid
    AddParticipant(ParticipantArgs),
    /// Remove a participant by forum uid
    RemoveParticipant(ParticipantArgs),
}

#[derive(Debug, Args)]
struct ParticipantArgs {
    /// Name of the campaign
    campaign_name: String,
    /// Forum uid of the participant
    uid: u64,
}

#[derive(Debug, Subcommand)]
enum RoundCommand {
    /// Start a new round
    Add {
        #[command(flatten)]
        round: RoundArgs,
        /// Round start in seconds since the epoch. Current time if not provided.
        #[arg(long)]
        round_start: Option<i64>,
    },
    /// End a round and calculate participants' gains
    End(RoundArgs),
    /// Collect participants' posts made during a round
    Posts(RoundArgs),
    /// Write a round to round.csv in its folder
    ToCsv(RoundArgs),
}

#[derive(Debug, Args)]
struct RoundArgs {
    /// Name of the campaign
    campaign_name: String,
    /// Number of the round
    round_number: u32,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let data_folder = cli.data_folder.or_else(|| config.data_folder.clone());
    let store = CampaignStore::open(data_folder.as_deref())
        .await
        .context("Failed to open data folder")?;
    info!(data_folder = %store.root().display(), forum = %config.forum_base_url, "Configuration loaded");

    let forum = ForumClient::new(&config).context("Failed to create forum client")?;
    let manager = CampaignManager::new(store, forum);

    match cli.command {
        Command::Campaign(CampaignCommand::Add { campaign_name }) => {
            manager.add_campaign(&campaign_name).await
        }
        Command::Campaign(CampaignCommand::AddParticipant(args)) => {
            manager.add_participant(&args.campaign_name, args.uid).await
        }
        Command::Campaign(CampaignCommand::RemoveParticipant(args)) => {
            manager
                .remove_participant(&args.campaign_name, args.uid)
                .await
        }
        Command::Round(RoundCommand::Add { round, round_start }) => {
            manager
                .add_round(&round.campaign_name, round.round_number, round_start)
                .await
        }
        Command::Round(RoundCommand::End(round)) => {
            manager
                .end_round(&round.campaign_name, round.round_number)
                .await
        }
        Command::Round(RoundCommand::Posts(round)) => {
            manager
                .collect_round_posts(&round.campaign_name, round.round_number)
                .await
        }
        Command::Round(RoundCommand::ToCsv(round)) => manager
            .round_to_csv(&round.campaign_name, round.round_number)
            .await
            .map(|_| ()),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,campaign_tracker=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

//! CF-CLI: charity funding operator console
//!
//! Talks to a JSON-RPC ledger bridge through the funding engine. The first
//! run provisions a session (deploy or connect); every later command reuses
//! it until it stops resolving.

mod cli;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cf_funding_engine::{
    CoinbaseRateSource, EngineConfig, FileSessionStore, FundingApi, FundingError, FundingService,
    JsonRpcLedger, Provisioner, SessionStore,
};

use crate::cli::{parse_amount, parse_display, Cli, Command, InitArgs};
use crate::output::Renderer;

/// Per-request HTTP timeout towards the ledger bridge.
const RPC_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn init_logging(level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::default().from_env();
    if let Some(url) = &cli.rpc_url {
        config.ledger_rpc_url = url.clone();
    }
    if let Some(path) = &cli.session {
        config.session_path = path.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Attach an operator hint to errors that need one.
fn explain(e: FundingError) -> anyhow::Error {
    match e {
        FundingError::StaleConfiguration(_) => anyhow::Error::new(e).context(
            "The saved session no longer resolves; run `cf-cli init --reset --signer <addr>`",
        ),
        FundingError::Timeout { .. } => anyhow::Error::new(e)
            .context("Outcome unknown; check the project before retrying"),
        other => anyhow::Error::new(other),
    }
}

async fn init(
    args: InitArgs,
    transport: Arc<JsonRpcLedger>,
    store: Arc<FileSessionStore>,
) -> Result<()> {
    let provisioner = Provisioner::new(transport, store.clone());
    if args.reset {
        provisioner.reset()?;
    }
    let session = match args.contract {
        Some(contract) => provisioner.connect(&contract, args.signer)?,
        None => provisioner.ensure_session(args.signer).await?,
    };
    println!(
        "session {}: contract {} signer {}",
        store.path().display(),
        session.contract_address,
        session.signer_address
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    init_logging(&config.log_level, cli.json_logs)?;

    let transport = Arc::new(JsonRpcLedger::new(&config.ledger_rpc_url, RPC_REQUEST_TIMEOUT)?);
    let store = Arc::new(FileSessionStore::new(&config.session_path));

    let command = match cli.command {
        Command::Init(args) => return init(args, transport, store).await,
        command => command,
    };

    let session = store.load()?.with_context(|| {
        format!(
            "No session at {}; run `cf-cli init --signer <address>` first",
            config.session_path
        )
    })?;
    let signer = session.signer().context("Saved signer is not an address")?;
    info!(
        "[cf-cli] Using contract {} as {} via {}",
        session.contract_address, signer, config.ledger_rpc_url
    );

    let rates = Arc::new(CoinbaseRateSource::new(
        &config.rate_source_url,
        config.rate_request_timeout(),
    )?);
    let service = FundingService::new(transport, rates, session, &config);

    // Display conversion is best effort.
    if !matches!(command, Command::Deactivate { .. }) {
        if let Err(e) = service.refresh_rate().await {
            warn!("[cf-cli] No exchange rate, showing native amounts only: {}", e);
        }
    }
    let render = Renderer::new(|a| service.to_display(a), config.currency_pair());

    match command {
        Command::Init(_) => bail!("init runs before a session is loaded"),
        Command::Projects { owner } => {
            let projects = match owner {
                Some(owner) => service.projects_owned_by(owner).await.map_err(explain)?,
                None => {
                    let snapshot = service.list_projects().await.map_err(explain)?;
                    for e in &snapshot.corrupt {
                        eprintln!("skipped: {}", e);
                    }
                    snapshot.projects
                }
            };
            if projects.is_empty() {
                println!("no projects");
            }
            for project in &projects {
                println!("{}", render.project_line(project));
            }
        }
        Command::Project { id } => {
            let project = service.get_project(id).await.map_err(explain)?;
            println!("{}", render.project_detail(&project));
        }
        Command::Contributions { id, donor } => {
            let summary = service
                .contributions(donor.unwrap_or(signer), id)
                .await
                .map_err(explain)?;
            println!("{}", render.contributions(&summary));
        }
        Command::Donations { donor } => {
            let positions = service
                .donated_projects(donor.unwrap_or(signer))
                .await
                .map_err(explain)?;
            if positions.is_empty() {
                println!("no donations");
            }
            for position in &positions {
                println!("{}", render.position(position));
            }
        }
        Command::Create {
            name,
            goal,
            milestones,
        } => {
            let receipt = service
                .create_project(signer, &name, goal, milestones)
                .await
                .map_err(explain)?;
            println!("{}", output::receipt(&receipt));
        }
        Command::Donate {
            id,
            milestone,
            amount,
            display,
        } => {
            let receipt = if display {
                let value = parse_display(&amount).map_err(|e| anyhow!(e))?;
                service.donate_display(id, milestone, signer, value).await
            } else {
                let value = parse_amount(&amount).map_err(|e| anyhow!(e))?;
                service.donate(id, milestone, signer, value).await
            }
            .map_err(explain)?;
            println!("{}", output::receipt(&receipt));
        }
        Command::Deactivate { id } => {
            let receipt = service.deactivate(id, signer).await.map_err(explain)?;
            println!("{}", output::receipt(&receipt));
        }
        Command::Rate => match service.rate() {
            Some(rate) => println!("{}", output::rate(&rate)),
            None => bail!("No exchange rate available for {}", config.currency_pair()),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}

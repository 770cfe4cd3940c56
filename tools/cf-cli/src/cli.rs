//! Command-line surface.

use std::str::FromStr;

use cf_funding_engine::{Address, Amount, MilestoneDraft, MilestoneIndex, ProjectId};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

/// CF-CLI: charity funding operator console
#[derive(Parser, Debug)]
#[command(name = "cf-cli")]
#[command(about = "Milestone crowdfunding over a ledger: projects, donations, rates")]
#[command(version)]
pub struct Cli {
    /// JSON-RPC ledger endpoint (overrides CF_LEDGER_RPC_URL)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Session file (overrides CF_SESSION_PATH)
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision a session: deploy a contract, or connect to an existing one
    Init(InitArgs),

    /// List every project
    Projects {
        /// Only projects owned by this charity
        #[arg(long)]
        owner: Option<Address>,
    },

    /// Show one project with its milestones
    Project {
        /// Project id
        id: ProjectId,
    },

    /// A donor's contributions to a project
    Contributions {
        /// Project id
        id: ProjectId,
        /// Donor (defaults to the session signer)
        #[arg(long)]
        donor: Option<Address>,
    },

    /// Projects a donor has given to
    Donations {
        /// Donor (defaults to the session signer)
        #[arg(long)]
        donor: Option<Address>,
    },

    /// Create a project owned by the session signer
    Create {
        /// Project name
        #[arg(long)]
        name: String,
        /// Funding goal in native units
        #[arg(long, value_parser = parse_amount)]
        goal: Amount,
        /// Milestone as `<description>=<target>`, repeatable, in order
        #[arg(short, long = "milestone", value_parser = parse_milestone)]
        milestones: Vec<MilestoneDraft>,
    },

    /// Donate to a milestone as the session signer
    Donate {
        /// Project id
        id: ProjectId,
        /// Milestone index (0-based)
        milestone: MilestoneIndex,
        /// Amount, native units unless --display
        amount: String,
        /// Amount is in the display currency
        #[arg(long)]
        display: bool,
    },

    /// Deactivate a project (owner only)
    Deactivate {
        /// Project id
        id: ProjectId,
    },

    /// Fetch and show the current exchange rate
    Rate,
}

/// `init` options.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Signing account for writes
    #[arg(long)]
    pub signer: Address,

    /// Connect to this contract instead of deploying
    #[arg(long)]
    pub contract: Option<String>,

    /// Discard any existing session first
    #[arg(long)]
    pub reset: bool,
}

/// Native amount in smallest units, decimal or `0x` hex.
pub fn parse_amount(s: &str) -> Result<Amount, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_digits) => Amount::from_str_radix(hex_digits, 16).ok(),
        None => Amount::from_dec_str(s).ok(),
    };
    parsed.ok_or_else(|| format!("not an amount: {}", s))
}

/// Display-currency amount.
pub fn parse_display(s: &str) -> Result<Decimal, String> {
    Decimal::from_str(s.trim()).map_err(|e| format!("not a decimal: {} ({})", s, e))
}

/// `<description>=<target>`; the last `=` splits, so descriptions may contain `=`.
pub fn parse_milestone(s: &str) -> Result<MilestoneDraft, String> {
    let (description, target) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected <description>=<target>, got {}", s))?;
    Ok(MilestoneDraft::new(description.trim(), parse_amount(target)?))
}

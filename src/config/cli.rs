use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "rankboard")]
#[command(about = "Claims leaderboard with admin-ranked levels")]
pub struct Cli {
    /// Directory holding the board data file.
    #[arg(long, default_value = "./data")]
    pub data_path: String,

    /// Board data file name inside the data directory.
    #[arg(long, default_value = "board.json")]
    pub data_file: String,

    /// Optional TOML config file; values there override the defaults above.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an empty board with one admin account.
    Init {
        #[arg(long)]
        admin: String,
    },
    /// Register a player account.
    AddUser {
        username: String,
        #[arg(long)]
        admin: bool,
    },
    /// Add a level, optionally straight onto the board.
    AddLevel {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
        #[arg(long)]
        rank: Option<u8>,
    },
    /// Move a level on the board; omit --rank to unrank it.
    LevelRank {
        level_id: u64,
        #[arg(long)]
        rank: Option<u8>,
    },
    /// Delete a level with no claims.
    DeleteLevel { level_id: u64 },
    /// Submit a completion claim.
    Submit {
        #[arg(long)]
        user_id: u64,
        #[arg(long)]
        level: String,
        #[arg(long)]
        video: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Approve or reject a pending claim.
    Review {
        claim_id: u64,
        #[arg(long)]
        reviewer: u64,
        #[arg(long, value_enum)]
        action: ReviewAction,
        #[arg(long)]
        rank: Option<u8>,
        #[arg(long)]
        first_victor: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Re-rank an approved claim; omit --rank to unrank it.
    ClaimRank {
        claim_id: u64,
        #[arg(long)]
        rank: Option<u8>,
    },
    /// Move the first-victor flag to a claim (or take it away).
    FirstVictor {
        claim_id: u64,
        #[arg(long)]
        remove: bool,
    },
    /// Rank distribution of the level board, or of one level's claims.
    Describe {
        #[arg(long)]
        level_id: Option<u64>,
    },
    /// Player standings.
    Leaderboard {
        #[arg(long, help = "Emit CSV instead of a table")]
        csv: bool,
    },
    /// Claim and account totals.
    Stats,
    /// Bundle standings and level board into a zip archive.
    Export {
        #[arg(long)]
        filename: Option<String>,
        #[arg(long)]
        include_state: bool,
    },
}

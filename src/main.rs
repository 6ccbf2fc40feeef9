use clap::Parser;
use rankboard::app::leaderboard;
use rankboard::domain::model::{BoardState, ClaimId, LevelId, User, UserId};
use rankboard::utils::error::ErrorSeverity;
use rankboard::utils::{logger, validation::Validate};
use rankboard::{
    BoardConfig, BoardError, BoardRepository, Cli, ClaimService, Command, Exporter, LevelCatalog,
    LocalStorage, RankEngine, ReviewAction, ReviewService,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logger::init_cli_logger(cli.verbose);
    tracing::info!("Starting rankboard CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match run(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::error!("Command failed: {} (severity: {:?})", e, e.severity());
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 2,
                ErrorSeverity::Medium => 3,
                ErrorSeverity::High => 1,
            };
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: Cli) -> rankboard::Result<()> {
    let file_config = match &cli.config {
        Some(path) => {
            let config = BoardConfig::from_file(path)?;
            config.validate()?;
            Some(config)
        }
        None => None,
    };

    let data_path = file_config
        .as_ref()
        .and_then(|c| c.data_path())
        .unwrap_or(&cli.data_path)
        .to_string();
    let data_file = file_config
        .as_ref()
        .and_then(|c| c.data_file())
        .unwrap_or(&cli.data_file)
        .to_string();

    let storage = LocalStorage::new(data_path.clone());
    let repo = BoardRepository::new(storage, data_file);
    let engine = Arc::new(RankEngine::new(repo.clone()));

    match cli.command {
        Command::Init { admin } => {
            if repo.load().await.is_ok() {
                return Err(BoardError::ConfigError {
                    message: format!("a board already exists under {}", data_path),
                });
            }
            let state = BoardState {
                users: vec![User {
                    id: UserId(1),
                    username: admin.clone(),
                    is_admin: true,
                    created_at: chrono::Utc::now(),
                }],
                ..Default::default()
            };
            repo.save(&state).await?;
            println!("✅ Board initialized with admin \"{}\"", admin);
        }

        Command::AddUser { username, admin } => {
            let mut state = repo.load().await?;
            if state.users.iter().any(|u| u.username == username) {
                return Err(BoardError::ValidationError {
                    field: "username".to_string(),
                    reason: "already taken".to_string(),
                });
            }
            let user = User {
                id: state.next_user_id(),
                username: username.clone(),
                is_admin: admin,
                created_at: chrono::Utc::now(),
            };
            let id = user.id;
            state.users.push(user);
            repo.save(&state).await?;
            println!("✅ User \"{}\" added (id {})", username, id);
        }

        Command::AddLevel {
            name,
            description,
            difficulty,
            rank,
        } => {
            let catalog = LevelCatalog::new(repo.clone(), engine.clone());
            let level = catalog
                .add_level(&name, description, difficulty, rank)
                .await?;
            println!(
                "✅ Level \"{}\" added (id {}, rank: {}, points: {})",
                level.name, level.id, level.slot, level.points
            );
        }

        Command::LevelRank { level_id, rank } => {
            let catalog = LevelCatalog::new(repo.clone(), engine.clone());
            let outcome = catalog.update_rank(LevelId(level_id), rank).await?;
            println!(
                "✅ Level {} moved to {} ({} level(s) shifted)",
                level_id,
                outcome.entity.slot,
                outcome.shifted.len()
            );
        }

        Command::DeleteLevel { level_id } => {
            let catalog = LevelCatalog::new(repo.clone(), engine.clone());
            catalog.delete_level(LevelId(level_id)).await?;
            println!("✅ Level {} deleted", level_id);
        }

        Command::Submit {
            user_id,
            level,
            video,
            notes,
        } => {
            let claims = ClaimService::new(repo.clone());
            let claim = claims.submit(UserId(user_id), &level, &video, notes).await?;
            println!(
                "✅ Claim {} submitted for level {} (pending review)",
                claim.id, claim.level_id
            );
        }

        Command::Review {
            claim_id,
            reviewer,
            action,
            rank,
            first_victor,
            notes,
        } => {
            let review = ReviewService::new(repo.clone(), engine.clone());
            match action {
                ReviewAction::Approve => {
                    let outcome = review
                        .approve(ClaimId(claim_id), UserId(reviewer), rank, first_victor, notes)
                        .await?;
                    println!(
                        "✅ Claim {} approved (rank: {}, points: {}, {} claim(s) shifted)",
                        claim_id,
                        outcome.claim.slot,
                        outcome.claim.points,
                        outcome.rank.shifted.len()
                    );
                    if outcome.claim.first_victor {
                        println!("🏆 Marked as first victor");
                    }
                }
                ReviewAction::Reject => {
                    review
                        .reject(ClaimId(claim_id), UserId(reviewer), notes)
                        .await?;
                    println!("✅ Claim {} rejected", claim_id);
                }
            }
        }

        Command::ClaimRank { claim_id, rank } => {
            let review = ReviewService::new(repo.clone(), engine.clone());
            let outcome = review.set_claim_rank(ClaimId(claim_id), rank).await?;
            println!(
                "✅ Claim {} moved to {} ({} claim(s) shifted)",
                claim_id,
                outcome.entity.slot,
                outcome.shifted.len()
            );
        }

        Command::FirstVictor { claim_id, remove } => {
            let review = ReviewService::new(repo.clone(), engine.clone());
            let outcome = review.set_first_victor(ClaimId(claim_id), !remove).await?;
            if outcome.entity_flag {
                println!(
                    "🏆 Claim {} is now first victor ({} previous holder(s) cleared)",
                    claim_id,
                    outcome.cleared.len()
                );
            } else {
                println!("✅ First-victor flag removed from claim {}", claim_id);
            }
        }

        Command::Describe { level_id } => {
            let catalog = LevelCatalog::new(repo.clone(), engine.clone());
            let dist = match level_id {
                Some(id) => catalog.describe_level(LevelId(id)).await?,
                None => catalog.describe_board().await?,
            };
            println!("Occupied ranks:  {}", dist.occupied_count);
            println!("Unranked:        {}", dist.unranked_count);
            match dist.next_available {
                Some(rank) => println!("Next available:  {}", rank),
                None => println!("Next available:  none (board full)"),
            }
            println!("Open slots:      {}", dist.gaps.len());
        }

        Command::Leaderboard { csv } => {
            let state = repo.load().await?;
            let standings = leaderboard::user_standings(&state);
            if csv {
                print!("{}", leaderboard::standings_csv(&standings)?);
            } else if standings.is_empty() {
                println!("No approved claims yet.");
            } else {
                println!("{:<6} {:<20} {:>8} {:>8} {:>8}", "place", "player", "points", "levels", "FV");
                for (i, s) in standings.iter().enumerate() {
                    println!(
                        "{:<6} {:<20} {:>8} {:>8} {:>8}",
                        i + 1,
                        s.username,
                        s.total_points,
                        s.completed_levels,
                        s.first_victor_count
                    );
                }
            }
        }

        Command::Stats => {
            let state = repo.load().await?;
            let stats = leaderboard::board_stats(&state);
            println!("Users:           {}", stats.total_users);
            println!("Levels:          {}", stats.total_levels);
            println!("Pending claims:  {}", stats.pending_claims);
            println!("Approved claims: {}", stats.approved_claims);
            println!("Rejected claims: {}", stats.rejected_claims);
        }

        Command::Export {
            filename,
            include_state,
        } => {
            let dest = LocalStorage::new(data_path.clone());
            let exporter = Exporter::new(repo.clone(), dest);
            let name = filename.unwrap_or_else(|| {
                file_config
                    .as_ref()
                    .map(|c| c.export_filename().to_string())
                    .unwrap_or_else(|| "board_export.zip".to_string())
            });
            let include = include_state
                || file_config
                    .as_ref()
                    .map(|c| c.export_includes_state())
                    .unwrap_or(false);
            let written = exporter.export_archive(&name, include).await?;
            println!("📁 Export saved to {}/{}", data_path, written);
        }
    }

    Ok(())
}

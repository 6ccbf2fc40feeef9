use crate::adapters::BoardRepository;
use crate::core::engine::RankEngine;
use crate::domain::model::{
    AssignOutcome, GroupKey, Level, LevelId, Rank, RankDistribution, RankSlot,
};
use crate::domain::ports::Storage;
use crate::utils::error::{BoardError, Result};
use crate::utils::validation::{validate_max_length, validate_non_empty_string};
use chrono::Utc;
use std::sync::Arc;

/// Admin management of the level list and the global level board.
pub struct LevelCatalog<S> {
    repo: BoardRepository<S>,
    engine: Arc<RankEngine<BoardRepository<S>>>,
}

impl<S: Storage> LevelCatalog<S> {
    pub fn new(repo: BoardRepository<S>, engine: Arc<RankEngine<BoardRepository<S>>>) -> Self {
        Self { repo, engine }
    }

    /// Create a level, optionally straight onto the board: an initial rank
    /// runs the same first-time-assignment cascade as ranking it later
    /// would.
    pub async fn add_level(
        &self,
        name: &str,
        description: Option<String>,
        difficulty: Option<String>,
        initial_rank: Option<u8>,
    ) -> Result<Level> {
        let name = name.trim();
        validate_non_empty_string("name", name)?;
        validate_max_length("name", name, 100)?;
        if let Some(value) = initial_rank {
            Rank::new(value)?;
        }

        let mut state = self.repo.load().await?;
        if state.level_by_name(name).is_some() {
            return Err(BoardError::NameTaken {
                name: name.to_string(),
            });
        }

        let id = state.next_level_id();
        state.levels.push(Level {
            id,
            name: name.to_string(),
            description,
            difficulty,
            slot: RankSlot::Unranked,
            points: 0,
            created_at: Utc::now(),
        });
        state.levels_version += 1;
        self.repo.save(&state).await?;

        if initial_rank.is_some() {
            self.engine
                .assign(id.into(), GroupKey::Levels, initial_rank)
                .await?;
        }

        let state = self.repo.load().await?;
        let level = state.level(id).ok_or(BoardError::UnknownLevel(id))?.clone();
        tracing::info!(level = %id, name = %level.name, rank = %level.slot, "level added");
        Ok(level)
    }

    /// Move a level on the global board, or take it off (`None`).
    pub async fn update_rank(&self, level: LevelId, rank: Option<u8>) -> Result<AssignOutcome> {
        self.engine
            .assign(level.into(), GroupKey::Levels, rank)
            .await
    }

    /// Delete a level that no claim references. A ranked level is cleared
    /// first so the board keeps no hole behind it.
    pub async fn delete_level(&self, level: LevelId) -> Result<()> {
        let state = self.repo.load().await?;
        let record = state.level(level).ok_or(BoardError::UnknownLevel(level))?;

        let claims = state.claims.iter().filter(|c| c.level_id == level).count();
        if claims > 0 {
            return Err(BoardError::LevelInUse { level, claims });
        }

        if record.slot.is_ranked() {
            self.engine.clear(level.into(), GroupKey::Levels).await?;
        }

        let mut state = self.repo.load().await?;
        state.levels.retain(|l| l.id != level);
        state.claim_versions.remove(&level);
        state.levels_version += 1;
        self.repo.save(&state).await?;

        tracing::info!(level = %level, "level deleted");
        Ok(())
    }

    /// Distribution of the global level board.
    pub async fn describe_board(&self) -> Result<RankDistribution> {
        self.engine.describe(GroupKey::Levels).await
    }

    /// Distribution of one level's claim board.
    pub async fn describe_level(&self, level: LevelId) -> Result<RankDistribution> {
        self.engine.describe(GroupKey::LevelClaims(level)).await
    }
}

use crate::domain::model::{
    BoardState, ClaimId, EntityId, GroupKey, LevelId, PopulationMember, PopulationSnapshot, Rank,
    RankWrite,
};
use crate::domain::ports::{PopulationStore, Storage};
use crate::utils::error::{BoardError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Round-trips the whole board through a [`Storage`] document and projects
/// ranked populations out of it for the engine.
///
/// The engine's per-group lock serializes rank writers inside one process;
/// the per-group version check catches everything that slips past it.
pub struct BoardRepository<S> {
    storage: Arc<S>,
    path: String,
}

impl<S> Clone for BoardRepository<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            path: self.path.clone(),
        }
    }
}

impl<S: Storage> BoardRepository<S> {
    pub fn new(storage: S, path: impl Into<String>) -> Self {
        Self {
            storage: Arc::new(storage),
            path: path.into(),
        }
    }

    pub async fn load(&self) -> Result<BoardState> {
        let data = self.storage.read_file(&self.path).await?;
        let state = serde_json::from_slice(&data)?;
        Ok(state)
    }

    pub async fn save(&self, state: &BoardState) -> Result<()> {
        let data = serde_json::to_vec_pretty(state)?;
        self.storage.write_file(&self.path, &data).await
    }

    fn group_version(state: &BoardState, group: &GroupKey) -> u64 {
        match group {
            GroupKey::Levels => state.levels_version,
            GroupKey::LevelClaims(level) => state.claims_version(*level),
        }
    }

    fn bump_group_version(state: &mut BoardState, group: &GroupKey) {
        match group {
            GroupKey::Levels => state.levels_version += 1,
            GroupKey::LevelClaims(level) => {
                *state.claim_versions.entry(*level).or_insert(0) += 1;
            }
        }
    }

    fn check_version(state: &BoardState, group: &GroupKey, expected: u64) -> Result<()> {
        let found = Self::group_version(state, group);
        if found != expected {
            return Err(BoardError::ConcurrentModification {
                group: *group,
                expected,
                found,
            });
        }
        Ok(())
    }

    fn project(state: &BoardState, group: &GroupKey) -> Result<Vec<PopulationMember>> {
        let mut members: Vec<PopulationMember> = match group {
            GroupKey::Levels => state
                .levels
                .iter()
                .map(|l| PopulationMember {
                    id: l.id.into(),
                    slot: l.slot,
                    eligible: true,
                    distinguished: false,
                })
                .collect(),
            GroupKey::LevelClaims(level) => {
                if state.level(*level).is_none() {
                    return Err(BoardError::UnknownLevel(*level));
                }
                state
                    .claims
                    .iter()
                    .filter(|c| c.level_id == *level)
                    .map(|c| PopulationMember {
                        id: c.id.into(),
                        slot: c.slot,
                        eligible: c.is_eligible(),
                        distinguished: c.first_victor,
                    })
                    .collect()
            }
        };

        // Ranked ascending first, then unranked.
        members.sort_by_key(|m| m.slot.rank().map(Rank::get).unwrap_or(u8::MAX));
        Ok(members)
    }
}

#[async_trait]
impl<S: Storage> PopulationStore for BoardRepository<S> {
    async fn load_population(&self, group: &GroupKey) -> Result<PopulationSnapshot> {
        let state = self.load().await?;
        Ok(PopulationSnapshot {
            group: *group,
            version: Self::group_version(&state, group),
            members: Self::project(&state, group)?,
        })
    }

    async fn commit_ranks(
        &self,
        group: &GroupKey,
        expected_version: u64,
        writes: &[RankWrite],
    ) -> Result<()> {
        let mut state = self.load().await?;
        Self::check_version(&state, group, expected_version)?;

        for write in writes {
            match group {
                GroupKey::Levels => {
                    let level = state
                        .level_mut(LevelId(write.id.0))
                        .ok_or(BoardError::NotFound {
                            entity: write.id,
                            group: *group,
                        })?;
                    level.slot = write.slot;
                    level.points = write.points();
                }
                GroupKey::LevelClaims(_) => {
                    let claim = state
                        .claim_mut(ClaimId(write.id.0))
                        .ok_or(BoardError::NotFound {
                            entity: write.id,
                            group: *group,
                        })?;
                    claim.slot = write.slot;
                    claim.points = write.points();
                }
            }
        }

        Self::bump_group_version(&mut state, group);
        self.save(&state).await
    }

    async fn commit_flags(
        &self,
        group: &GroupKey,
        expected_version: u64,
        entity: EntityId,
        value: bool,
        cleared: &[EntityId],
    ) -> Result<()> {
        let level = match group {
            GroupKey::LevelClaims(level) => *level,
            GroupKey::Levels => {
                return Err(BoardError::ValidationError {
                    field: "group".to_string(),
                    reason: "the level population carries no exclusive flag".to_string(),
                })
            }
        };

        let mut state = self.load().await?;
        Self::check_version(&state, group, expected_version)?;
        if state.level(level).is_none() {
            return Err(BoardError::UnknownLevel(level));
        }

        for id in cleared {
            let claim = state.claim_mut(ClaimId(id.0)).ok_or(BoardError::NotFound {
                entity: *id,
                group: *group,
            })?;
            claim.first_victor = false;
        }

        let claim = state
            .claim_mut(ClaimId(entity.0))
            .ok_or(BoardError::NotFound {
                entity,
                group: *group,
            })?;
        claim.first_victor = value;

        Self::bump_group_version(&mut state, group);
        self.save(&state).await
    }
}

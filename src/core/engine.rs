use crate::core::registry;
use crate::domain::model::{
    AssignOutcome, EntityId, FlagOutcome, GroupKey, RankDistribution, RankSlot,
};
use crate::domain::ports::PopulationStore;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Orchestrates slot-registry plans against a population store.
///
/// Writers against one group are serialized through a per-group async lock;
/// different groups proceed in parallel. Every call is a single
/// load-plan-commit unit: the store's version check turns a lost race into
/// `ConcurrentModification`, and the engine never retries on its own.
pub struct RankEngine<S> {
    store: S,
    locks: StdMutex<HashMap<GroupKey, Arc<Mutex<()>>>>,
}

impl<S: PopulationStore> RankEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn group_lock(&self, group: &GroupKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("group lock map poisoned");
        locks.entry(*group).or_default().clone()
    }

    /// Move `entity` to `target_rank` (1-50) or unrank it (`None`), cascading
    /// the rest of the population. Returns the full write set already applied
    /// to the store.
    pub async fn assign(
        &self,
        entity: EntityId,
        group: GroupKey,
        target_rank: Option<u8>,
    ) -> Result<AssignOutcome> {
        let desired = match target_rank {
            Some(value) => RankSlot::from_rank(value)?,
            None => RankSlot::Unranked,
        };

        let lock = self.group_lock(&group);
        let _guard = lock.lock().await;

        let snapshot = self.store.load_population(&group).await?;
        let outcome = registry::plan_assignment(&snapshot, entity, desired)?;
        self.store
            .commit_ranks(&group, snapshot.version, &outcome.writes())
            .await?;

        tracing::info!(
            %group,
            %entity,
            rank = %outcome.entity.slot,
            shifted = outcome.shifted.len(),
            "rank assigned"
        );
        Ok(outcome)
    }

    /// Remove `entity` from the ranking, closing the vacated slot.
    pub async fn clear(&self, entity: EntityId, group: GroupKey) -> Result<AssignOutcome> {
        self.assign(entity, group, None).await
    }

    /// Distribution query. Read-only: no lock, no mutation.
    pub async fn describe(&self, group: GroupKey) -> Result<RankDistribution> {
        let snapshot = self.store.load_population(&group).await?;
        registry::plan_distribution(&snapshot)
    }

    /// Grant or revoke the group's exclusive flag, clearing any other holder
    /// in the same atomic unit.
    pub async fn set_exclusive_flag(
        &self,
        entity: EntityId,
        group: GroupKey,
        value: bool,
    ) -> Result<FlagOutcome> {
        let lock = self.group_lock(&group);
        let _guard = lock.lock().await;

        let snapshot = self.store.load_population(&group).await?;
        let outcome = registry::plan_exclusive_flag(&snapshot, entity, value)?;
        self.store
            .commit_flags(&group, snapshot.version, entity, value, &outcome.cleared)
            .await?;

        tracing::info!(
            %group,
            %entity,
            value,
            cleared = outcome.cleared.len(),
            "exclusive flag set"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{PopulationMember, PopulationSnapshot, Rank};
    use crate::domain::ports::PopulationStore;
    use crate::utils::error::BoardError;
    use async_trait::async_trait;

    struct MemoryPopulation {
        inner: StdMutex<(u64, Vec<PopulationMember>)>,
    }

    impl MemoryPopulation {
        fn new(members: Vec<PopulationMember>) -> Self {
            Self {
                inner: StdMutex::new((1, members)),
            }
        }

        fn ranks(&self) -> Vec<(u64, Option<u8>)> {
            let inner = self.inner.lock().unwrap();
            inner
                .1
                .iter()
                .map(|m| (m.id.0, m.slot.rank().map(Rank::get)))
                .collect()
        }

        fn bump_version(&self) {
            self.inner.lock().unwrap().0 += 1;
        }
    }

    #[async_trait]
    impl PopulationStore for MemoryPopulation {
        async fn load_population(&self, group: &GroupKey) -> Result<PopulationSnapshot> {
            let inner = self.inner.lock().unwrap();
            Ok(PopulationSnapshot {
                group: *group,
                version: inner.0,
                members: inner.1.clone(),
            })
        }

        async fn commit_ranks(
            &self,
            group: &GroupKey,
            expected_version: u64,
            writes: &[crate::domain::model::RankWrite],
        ) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if inner.0 != expected_version {
                return Err(BoardError::ConcurrentModification {
                    group: *group,
                    expected: expected_version,
                    found: inner.0,
                });
            }
            for write in writes {
                let m = inner.1.iter_mut().find(|m| m.id == write.id).unwrap();
                m.slot = write.slot;
            }
            inner.0 += 1;
            Ok(())
        }

        async fn commit_flags(
            &self,
            group: &GroupKey,
            expected_version: u64,
            entity: EntityId,
            value: bool,
            cleared: &[EntityId],
        ) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if inner.0 != expected_version {
                return Err(BoardError::ConcurrentModification {
                    group: *group,
                    expected: expected_version,
                    found: inner.0,
                });
            }
            for id in cleared {
                let m = inner.1.iter_mut().find(|m| m.id == *id).unwrap();
                m.distinguished = false;
            }
            let m = inner.1.iter_mut().find(|m| m.id == entity).unwrap();
            m.distinguished = value;
            inner.0 += 1;
            Ok(())
        }
    }

    fn member(id: u64, rank: Option<u8>) -> PopulationMember {
        PopulationMember {
            id: EntityId(id),
            slot: match rank {
                Some(v) => RankSlot::from_rank(v).unwrap(),
                None => RankSlot::Unranked,
            },
            eligible: true,
            distinguished: false,
        }
    }

    #[tokio::test]
    async fn assign_commits_the_cascade() {
        let store = MemoryPopulation::new(vec![
            member(1, Some(1)),
            member(2, Some(2)),
            member(9, None),
        ]);
        let engine = RankEngine::new(store);

        let outcome = engine
            .assign(EntityId(9), GroupKey::Levels, Some(1))
            .await
            .unwrap();
        assert_eq!(outcome.shifted.len(), 2);

        let ranks = engine.store().ranks();
        assert!(ranks.contains(&(9, Some(1))));
        assert!(ranks.contains(&(1, Some(2))));
        assert!(ranks.contains(&(2, Some(3))));
    }

    #[tokio::test]
    async fn invalid_rank_fails_before_touching_the_store() {
        let store = MemoryPopulation::new(vec![member(1, Some(1))]);
        let engine = RankEngine::new(store);

        let err = engine
            .assign(EntityId(1), GroupKey::Levels, Some(51))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidRank { value: 51 }));
        assert_eq!(engine.store().ranks(), vec![(1, Some(1))]);
    }

    #[tokio::test]
    async fn stale_version_surfaces_concurrent_modification() {
        let store = MemoryPopulation::new(vec![member(1, Some(1)), member(2, None)]);
        let engine = RankEngine::new(store);

        // A writer outside the engine's lock bumps the version mid-call; the
        // easiest stand-in is bumping between two engine calls' load windows.
        engine.store().bump_version();
        // The engine re-reads, so this call still succeeds...
        engine
            .assign(EntityId(2), GroupKey::Levels, Some(2))
            .await
            .unwrap();

        // ...but a commit against a stale snapshot does not.
        let snapshot = engine
            .store()
            .load_population(&GroupKey::Levels)
            .await
            .unwrap();
        engine.store().bump_version();
        let err = engine
            .store()
            .commit_ranks(&GroupKey::Levels, snapshot.version, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::ConcurrentModification { .. }));
    }

    #[tokio::test]
    async fn clear_is_assign_with_no_rank() {
        let store = MemoryPopulation::new(vec![
            member(1, Some(3)),
            member(2, Some(5)),
            member(3, Some(7)),
        ]);
        let engine = RankEngine::new(store);

        engine.clear(EntityId(2), GroupKey::Levels).await.unwrap();
        let ranks = engine.store().ranks();
        assert!(ranks.contains(&(1, Some(3))));
        assert!(ranks.contains(&(2, None)));
        assert!(ranks.contains(&(3, Some(6))));
    }

    #[tokio::test]
    async fn describe_reflects_the_current_population() {
        let store = MemoryPopulation::new(vec![
            member(1, Some(1)),
            member(2, Some(4)),
            member(3, None),
        ]);
        let engine = RankEngine::new(store);

        let dist = engine.describe(GroupKey::Levels).await.unwrap();
        assert_eq!(dist.occupied_count, 2);
        assert_eq!(dist.unranked_count, 1);
        assert_eq!(dist.next_available, Some(Rank::new(2).unwrap()));
    }

    #[tokio::test]
    async fn flag_transfer_is_single_holder() {
        let mut holder = member(1, Some(1));
        holder.distinguished = true;
        let store = MemoryPopulation::new(vec![holder, member(2, Some(2))]);
        let engine = RankEngine::new(store);

        let outcome = engine
            .set_exclusive_flag(EntityId(2), GroupKey::Levels, true)
            .await
            .unwrap();
        assert_eq!(outcome.cleared, vec![EntityId(1)]);

        let inner = engine.store().inner.lock().unwrap();
        let holders: Vec<_> = inner.1.iter().filter(|m| m.distinguished).collect();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].id, EntityId(2));
    }

    #[tokio::test]
    async fn groups_do_not_share_a_lock() {
        // Two concurrent calls against different groups both complete; this
        // is a liveness smoke test, not a proof of parallelism.
        let store_a = MemoryPopulation::new(vec![member(1, None)]);
        let engine = Arc::new(RankEngine::new(store_a));

        let e1 = engine.clone();
        let t1 = tokio::spawn(async move {
            e1.assign(EntityId(1), GroupKey::Levels, Some(1)).await
        });
        let t2 = tokio::spawn({
            let e2 = engine.clone();
            async move { e2.describe(GroupKey::Levels).await }
        });

        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();
    }
}

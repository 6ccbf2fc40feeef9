use crate::domain::model::{EntityId, GroupKey, PopulationSnapshot, RankWrite};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Raw byte storage. Implementations decide where a "file" lives; the board
/// repository only ever asks for whole-document reads and writes.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Must be all-or-nothing: a reader never observes a half-written file.
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// Persistence boundary of the rank engine. The store hands out a versioned
/// snapshot of one population and applies a write set back, refusing the
/// commit with `ConcurrentModification` when the version moved in between.
#[async_trait]
pub trait PopulationStore: Send + Sync {
    /// Snapshot of the population for `group`, ranked members first in
    /// ascending rank order, then unranked members.
    async fn load_population(&self, group: &GroupKey) -> Result<PopulationSnapshot>;

    /// Durably apply a rank write set in one atomic unit.
    async fn commit_ranks(
        &self,
        group: &GroupKey,
        expected_version: u64,
        writes: &[RankWrite],
    ) -> Result<()>;

    /// Durably apply an exclusive-flag transfer in one atomic unit:
    /// `entity` gets the flag value, every id in `cleared` loses it.
    async fn commit_flags(
        &self,
        group: &GroupKey,
        expected_version: u64,
        entity: EntityId,
        value: bool,
        cleared: &[EntityId],
    ) -> Result<()>;
}

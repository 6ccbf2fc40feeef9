pub mod engine;
pub mod registry;

pub use crate::domain::model::{
    AssignOutcome, EntityId, FlagOutcome, GroupKey, PopulationMember, PopulationSnapshot, Rank,
    RankDistribution, RankSlot, RankWrite, MAX_RANK,
};
pub use crate::domain::ports::{PopulationStore, Storage};
pub use crate::utils::error::Result;

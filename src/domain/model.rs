use crate::utils::error::{BoardError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Highest assignable rank. Ranks live in `1..=MAX_RANK`; everything else is
/// unranked.
pub const MAX_RANK: u8 = 50;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(UserId);
id_type!(LevelId);
id_type!(ClaimId);

/// Identifier of a member inside one ranked population. Levels and claims
/// both project into this when they pass through the slot registry.
id_type!(EntityId);

impl From<LevelId> for EntityId {
    fn from(id: LevelId) -> Self {
        EntityId(id.0)
    }
}

impl From<ClaimId> for EntityId {
    fn from(id: ClaimId) -> Self {
        EntityId(id.0)
    }
}

/// A rank in `1..=MAX_RANK`. Construction is the only validation boundary;
/// a `Rank` value is in range by definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rank(u8);

impl Rank {
    pub fn new(value: u8) -> Result<Self> {
        if (1..=MAX_RANK).contains(&value) {
            Ok(Rank(value))
        } else {
            Err(BoardError::InvalidRank { value: value as i64 })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Points awarded for holding this rank: `51 - rank`. The single place
    /// the formula exists; everything else goes through here or
    /// [`RankSlot::points`].
    pub fn points(self) -> u32 {
        (MAX_RANK as u32) + 1 - (self.0 as u32)
    }

    /// Next rank down the board, or `None` past `MAX_RANK`.
    pub fn succ(self) -> Option<Rank> {
        if self.0 < MAX_RANK {
            Some(Rank(self.0 + 1))
        } else {
            None
        }
    }

    /// Next rank up the board, or `None` above rank 1.
    pub fn pred(self) -> Option<Rank> {
        if self.0 > 1 {
            Some(Rank(self.0 - 1))
        } else {
            None
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = BoardError;

    fn try_from(value: u8) -> Result<Self> {
        Rank::new(value)
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> u8 {
        rank.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rank state of an entity: a slot on the board or unranked. Serialized as
/// a plain optional integer (`null` / `1..=50`) so stored board files stay
/// readable, while in memory out-of-range ranks are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<u8>", into = "Option<u8>")]
pub enum RankSlot {
    #[default]
    Unranked,
    Ranked(Rank),
}

impl RankSlot {
    pub fn from_rank(value: u8) -> Result<Self> {
        Ok(RankSlot::Ranked(Rank::new(value)?))
    }

    pub fn rank(self) -> Option<Rank> {
        match self {
            RankSlot::Unranked => None,
            RankSlot::Ranked(r) => Some(r),
        }
    }

    pub fn is_ranked(self) -> bool {
        matches!(self, RankSlot::Ranked(_))
    }

    /// Points derived from this slot: `51 - rank` when ranked, `0` otherwise.
    pub fn points(self) -> u32 {
        match self {
            RankSlot::Unranked => 0,
            RankSlot::Ranked(r) => r.points(),
        }
    }
}

impl TryFrom<Option<u8>> for RankSlot {
    type Error = BoardError;

    fn try_from(value: Option<u8>) -> Result<Self> {
        match value {
            None => Ok(RankSlot::Unranked),
            Some(v) => RankSlot::from_rank(v),
        }
    }
}

impl From<RankSlot> for Option<u8> {
    fn from(slot: RankSlot) -> Option<u8> {
        slot.rank().map(Rank::get)
    }
}

impl fmt::Display for RankSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankSlot::Unranked => write!(f, "unranked"),
            RankSlot::Ranked(r) => write!(f, "{}", r),
        }
    }
}

/// One pending write produced by the slot registry: an entity, the slot it
/// moves to, and the points that slot is worth. Points are computed at
/// construction so a write can never carry a rank/points pair that disagrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankWrite {
    pub id: EntityId,
    pub slot: RankSlot,
    points: u32,
}

impl RankWrite {
    pub fn new(id: EntityId, slot: RankSlot) -> Self {
        RankWrite {
            id,
            slot,
            points: slot.points(),
        }
    }

    pub fn points(&self) -> u32 {
        self.points
    }
}

/// Partition key for a ranked population. Cascades never cross groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// The global level ranking.
    Levels,
    /// Approved claims within one level.
    LevelClaims(LevelId),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Levels => write!(f, "levels"),
            GroupKey::LevelClaims(id) => write!(f, "claims/level-{}", id),
        }
    }
}

/// A member of a population as the registry sees it. Ineligible members are
/// carried so the planner can tell "not eligible" apart from "not found",
/// but they never participate in a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationMember {
    pub id: EntityId,
    pub slot: RankSlot,
    pub eligible: bool,
    pub distinguished: bool,
}

/// Read snapshot of one population, ordered ranked-first ascending. The
/// version is checked again at commit time; a mismatch means another writer
/// got in between and the whole call fails with `ConcurrentModification`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationSnapshot {
    pub group: GroupKey,
    pub version: u64,
    pub members: Vec<PopulationMember>,
}

impl PopulationSnapshot {
    pub fn member(&self, id: EntityId) -> Option<&PopulationMember> {
        self.members.iter().find(|m| m.id == id)
    }
}

/// Result of an assign or clear call: the write for the targeted entity plus
/// the cascade applied to everyone else in the population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignOutcome {
    pub entity: RankWrite,
    pub shifted: Vec<RankWrite>,
}

impl AssignOutcome {
    /// All writes in safe sequential-application order: the cascade first
    /// (already ordered away from the vacated slot), the target last.
    pub fn writes(&self) -> Vec<RankWrite> {
        let mut all = self.shifted.clone();
        all.push(self.entity);
        all
    }
}

/// Answer to the distribution query: how full the board is and where the
/// holes are. Counts only eligible members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankDistribution {
    pub occupied_count: usize,
    pub unranked_count: usize,
    pub gaps: Vec<Rank>,
    pub next_available: Option<Rank>,
}

/// Result of an exclusive-flag transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagOutcome {
    pub entity_flag: bool,
    pub cleared: Vec<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::Pending => write!(f, "pending"),
            ClaimStatus::Approved => write!(f, "approved"),
            ClaimStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// A named level on the global board. Every level is eligible for ranking;
/// `points` is always `slot.points()` — services write both through
/// [`RankWrite`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, rename = "rank")]
    pub slot: RankSlot,
    #[serde(default)]
    pub points: u32,
    pub created_at: DateTime<Utc>,
}

/// A user's claim of completing a level. Only approved claims enter the
/// per-level ranked population; pending and rejected claims carry
/// `Unranked` / 0 points unconditionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub user_id: UserId,
    pub level_id: LevelId,
    pub video_url: String,
    #[serde(default)]
    pub user_notes: Option<String>,
    pub status: ClaimStatus,
    #[serde(default, rename = "rank")]
    pub slot: RankSlot,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub first_victor: bool,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<UserId>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

impl Claim {
    pub fn is_eligible(&self) -> bool {
        self.status == ClaimStatus::Approved
    }
}

/// The persisted aggregate: everything one board knows. Versions are
/// per-population so writers against different groups never trip each other's
/// concurrency checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardState {
    #[serde(default)]
    pub levels_version: u64,
    #[serde(default)]
    pub claim_versions: HashMap<LevelId, u64>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub levels: Vec<Level>,
    #[serde(default)]
    pub claims: Vec<Claim>,
}

impl BoardState {
    pub fn level(&self, id: LevelId) -> Option<&Level> {
        self.levels.iter().find(|l| l.id == id)
    }

    pub fn level_mut(&mut self, id: LevelId) -> Option<&mut Level> {
        self.levels.iter_mut().find(|l| l.id == id)
    }

    pub fn level_by_name(&self, name: &str) -> Option<&Level> {
        self.levels.iter().find(|l| l.name == name)
    }

    pub fn claim(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.iter().find(|c| c.id == id)
    }

    pub fn claim_mut(&mut self, id: ClaimId) -> Option<&mut Claim> {
        self.claims.iter_mut().find(|c| c.id == id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn next_level_id(&self) -> LevelId {
        LevelId(self.levels.iter().map(|l| l.id.0).max().unwrap_or(0) + 1)
    }

    pub fn next_claim_id(&self) -> ClaimId {
        ClaimId(self.claims.iter().map(|c| c.id.0).max().unwrap_or(0) + 1)
    }

    pub fn next_user_id(&self) -> UserId {
        UserId(self.users.iter().map(|u| u.id.0).max().unwrap_or(0) + 1)
    }

    pub fn claims_version(&self, level: LevelId) -> u64 {
        self.claim_versions.get(&level).copied().unwrap_or(0)
    }
}

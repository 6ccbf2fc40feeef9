//! Ordered slot registry: pure planning over one population snapshot.
//!
//! Nothing here mutates anything. Each planner takes a snapshot and returns
//! the full write set the caller must apply in one atomic unit. The same
//! planners serve both instantiations (global level ranking, per-level claim
//! ranking); the population decides which.

use crate::domain::model::{
    AssignOutcome, EntityId, FlagOutcome, PopulationMember, PopulationSnapshot, Rank,
    RankDistribution, RankSlot, RankWrite, MAX_RANK,
};
use crate::utils::error::{BoardError, Result};
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included};

/// Occupied slots of the eligible population, keyed by rank. Rejects a
/// snapshot that already holds duplicate ranks — that can only mean another
/// writer (or a corrupt store) got in between.
fn occupied_slots(snapshot: &PopulationSnapshot) -> Result<BTreeMap<Rank, EntityId>> {
    let mut occupied = BTreeMap::new();
    for member in snapshot.members.iter().filter(|m| m.eligible) {
        if let RankSlot::Ranked(rank) = member.slot {
            if occupied.insert(rank, member.id).is_some() {
                return Err(BoardError::ConcurrentModification {
                    group: snapshot.group,
                    expected: snapshot.version,
                    found: snapshot.version,
                });
            }
        }
    }
    Ok(occupied)
}

fn find_member(snapshot: &PopulationSnapshot, entity: EntityId) -> Result<&PopulationMember> {
    snapshot.member(entity).ok_or(BoardError::NotFound {
        entity,
        group: snapshot.group,
    })
}

fn require_eligible(snapshot: &PopulationSnapshot, member: &PopulationMember) -> Result<()> {
    if member.eligible {
        Ok(())
    } else {
        Err(BoardError::IneligibleEntity {
            entity: member.id,
            group: snapshot.group,
            reason: "not part of the ranked population".to_string(),
        })
    }
}

/// Shift every occupied slot in `[from, to]` down the board by one. A member
/// already at the bottom falls off and becomes unranked. Writes are emitted
/// highest source rank first so sequential application never passes through
/// a duplicate.
fn shift_down(
    occupied: &BTreeMap<Rank, EntityId>,
    skip: EntityId,
    from: Rank,
    to: Rank,
) -> Vec<RankWrite> {
    occupied
        .range((Included(from), Included(to)))
        .rev()
        .filter(|(_, &id)| id != skip)
        .map(|(&rank, &id)| {
            let dest = match rank.succ() {
                Some(next) => RankSlot::Ranked(next),
                None => RankSlot::Unranked,
            };
            RankWrite::new(id, dest)
        })
        .collect()
}

/// Shift every occupied slot in `(above, to]` up the board by one, closing
/// the gap at `above`. Emitted lowest source rank first, toward the vacated
/// slot.
fn shift_up(
    occupied: &BTreeMap<Rank, EntityId>,
    skip: EntityId,
    above: Rank,
    to: Rank,
) -> Vec<RankWrite> {
    occupied
        .range((Excluded(above), Included(to)))
        .filter(|(_, &id)| id != skip)
        .filter_map(|(&rank, &id)| {
            rank.pred()
                .map(|prev| RankWrite::new(id, RankSlot::Ranked(prev)))
        })
        .collect()
}

/// Plan moving `entity` to `desired`, cascading the rest of the population
/// so occupied ranks stay unique. Clearing is the `Unranked` target; the two
/// directions of movement and first-time assignment all reduce to a single
/// contiguous range translated by one.
pub fn plan_assignment(
    snapshot: &PopulationSnapshot,
    entity: EntityId,
    desired: RankSlot,
) -> Result<AssignOutcome> {
    let member = find_member(snapshot, entity)?;
    require_eligible(snapshot, member)?;
    let occupied = occupied_slots(snapshot)?;
    let old = member.slot;

    let bottom = Rank::new(MAX_RANK)?;

    let shifted = match (old, desired) {
        _ if old == desired => Vec::new(),
        // First-time assignment: everyone at or below the target moves down.
        (RankSlot::Unranked, RankSlot::Ranked(new)) => shift_down(&occupied, entity, new, bottom),
        // Moving down the board: the range between closes the gap upward.
        (RankSlot::Ranked(o), RankSlot::Ranked(new)) if o < new => {
            shift_up(&occupied, entity, o, new)
        }
        // Moving up the board: displaced members slide down.
        (RankSlot::Ranked(o), RankSlot::Ranked(new)) => {
            debug_assert!(new < o);
            let stop = match o.pred() {
                Some(p) => p,
                // old == 1 and new < old is impossible; nothing to shift.
                None => return Ok(no_op(entity, old)),
            };
            shift_down(&occupied, entity, new, stop)
        }
        // Clearing: everything below the vacated slot moves up.
        (RankSlot::Ranked(o), RankSlot::Unranked) => shift_up(&occupied, entity, o, bottom),
        // Unranked -> Unranked was caught by the equality arm.
        (RankSlot::Unranked, RankSlot::Unranked) => Vec::new(),
    };

    Ok(AssignOutcome {
        entity: RankWrite::new(entity, desired),
        shifted,
    })
}

fn no_op(entity: EntityId, slot: RankSlot) -> AssignOutcome {
    AssignOutcome {
        entity: RankWrite::new(entity, slot),
        shifted: Vec::new(),
    }
}

/// Read-only distribution of the population: occupied and unranked counts,
/// the sorted gap list, and the lowest open slot.
pub fn plan_distribution(snapshot: &PopulationSnapshot) -> Result<RankDistribution> {
    let occupied = occupied_slots(snapshot)?;

    let unranked_count = snapshot
        .members
        .iter()
        .filter(|m| m.eligible && !m.slot.is_ranked())
        .count();

    let gaps: Vec<Rank> = (1..=MAX_RANK)
        .filter_map(|v| Rank::new(v).ok())
        .filter(|r| !occupied.contains_key(r))
        .collect();

    Ok(RankDistribution {
        occupied_count: occupied.len(),
        unranked_count,
        next_available: gaps.first().copied(),
        gaps,
    })
}

/// Plan transferring the exclusive flag. Granting it clears every other
/// holder in the group first; revoking touches only the target.
pub fn plan_exclusive_flag(
    snapshot: &PopulationSnapshot,
    entity: EntityId,
    value: bool,
) -> Result<FlagOutcome> {
    let member = find_member(snapshot, entity)?;
    require_eligible(snapshot, member)?;

    let cleared = if value {
        snapshot
            .members
            .iter()
            .filter(|m| m.distinguished && m.id != entity)
            .map(|m| m.id)
            .collect()
    } else {
        Vec::new()
    };

    Ok(FlagOutcome {
        entity_flag: value,
        cleared,
    })
}

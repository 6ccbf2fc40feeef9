use crate::domain::model::{BoardState, ClaimStatus, Level, LevelId, Rank, UserId};
use crate::utils::error::{BoardError, Result};
use std::collections::BTreeSet;

/// One row of the player leaderboard. Total points come from the *levels* a
/// player has completed (one approved claim per level counts once), so a
/// player's score moves when the level board moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStanding {
    pub user_id: UserId,
    pub username: String,
    pub total_points: u32,
    pub completed_levels: usize,
    pub first_victor_count: usize,
}

/// One row of the public level board, with victor attribution.
#[derive(Debug, Clone)]
pub struct LevelBoardEntry {
    pub level: Level,
    pub first_victor: Option<String>,
    pub other_victors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardStats {
    pub pending_claims: usize,
    pub approved_claims: usize,
    pub rejected_claims: usize,
    pub total_users: usize,
    pub total_levels: usize,
}

/// Player standings, highest score first (username breaks ties so output is
/// stable). Users without an approved claim do not appear.
pub fn user_standings(state: &BoardState) -> Vec<UserStanding> {
    let mut standings = Vec::new();

    for user in &state.users {
        let approved: Vec<_> = state
            .claims
            .iter()
            .filter(|c| c.user_id == user.id && c.status == ClaimStatus::Approved)
            .collect();
        if approved.is_empty() {
            continue;
        }

        let completed: BTreeSet<LevelId> = approved.iter().map(|c| c.level_id).collect();
        let total_points = completed
            .iter()
            .filter_map(|id| state.level(*id))
            .map(|l| l.points)
            .sum();
        let first_victor_count = approved.iter().filter(|c| c.first_victor).count();

        standings.push(UserStanding {
            user_id: user.id,
            username: user.username.clone(),
            total_points,
            completed_levels: completed.len(),
            first_victor_count,
        });
    }

    standings.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.username.cmp(&b.username))
    });
    standings
}

/// Levels ordered for display: ranked ascending, unranked after, name as the
/// final tie-break.
pub fn level_board(state: &BoardState) -> Vec<LevelBoardEntry> {
    let mut levels: Vec<&Level> = state.levels.iter().collect();
    levels.sort_by(|a, b| {
        let ka = a.slot.rank().map(Rank::get).unwrap_or(u8::MAX);
        let kb = b.slot.rank().map(Rank::get).unwrap_or(u8::MAX);
        ka.cmp(&kb).then_with(|| a.name.cmp(&b.name))
    });

    levels
        .into_iter()
        .map(|level| {
            let mut victors: Vec<_> = state
                .claims
                .iter()
                .filter(|c| c.level_id == level.id && c.status == ClaimStatus::Approved)
                .collect();
            victors.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));

            let username = |id: UserId| {
                state
                    .user(id)
                    .map(|u| u.username.clone())
                    .unwrap_or_else(|| format!("user-{}", id))
            };

            let first_victor = victors
                .iter()
                .find(|c| c.first_victor)
                .map(|c| username(c.user_id));
            let other_victors = victors
                .iter()
                .filter(|c| !c.first_victor)
                .map(|c| username(c.user_id))
                .collect();

            LevelBoardEntry {
                level: level.clone(),
                first_victor,
                other_victors,
            }
        })
        .collect()
}

pub fn board_stats(state: &BoardState) -> BoardStats {
    let count = |status: ClaimStatus| state.claims.iter().filter(|c| c.status == status).count();
    BoardStats {
        pending_claims: count(ClaimStatus::Pending),
        approved_claims: count(ClaimStatus::Approved),
        rejected_claims: count(ClaimStatus::Rejected),
        total_users: state.users.len(),
        total_levels: state.levels.len(),
    }
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr
        .into_inner()
        .map_err(|e| BoardError::IoError(std::io::Error::other(e.to_string())))?;
    String::from_utf8(data)
        .map_err(|e| BoardError::IoError(std::io::Error::other(e.to_string())))
}

pub fn standings_csv(standings: &[UserStanding]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "place",
        "username",
        "total_points",
        "completed_levels",
        "first_victor_count",
    ])?;
    for (i, s) in standings.iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string(),
            s.username.clone(),
            s.total_points.to_string(),
            s.completed_levels.to_string(),
            s.first_victor_count.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

pub fn level_board_csv(entries: &[LevelBoardEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["rank", "name", "points", "difficulty", "first_victor"])?;
    for e in entries {
        wtr.write_record([
            e.level
                .slot
                .rank()
                .map(|r| r.get().to_string())
                .unwrap_or_default(),
            e.level.name.clone(),
            e.level.points.to_string(),
            e.level.difficulty.clone().unwrap_or_default(),
            e.first_victor.clone().unwrap_or_default(),
        ])?;
    }
    finish_csv(wtr)
}

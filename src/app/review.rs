use crate::adapters::BoardRepository;
use crate::core::engine::RankEngine;
use crate::domain::model::{
    AssignOutcome, Claim, ClaimId, ClaimStatus, FlagOutcome, GroupKey, Rank, UserId,
};
use crate::domain::ports::Storage;
use crate::utils::error::{BoardError, Result};
use chrono::Utc;
use std::sync::Arc;

/// What an approval did: the updated claim, the rank cascade, and the
/// first-victor transfer.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub claim: Claim,
    pub rank: AssignOutcome,
    pub flag: FlagOutcome,
}

/// Admin review of claims. The reviewer is always an explicit parameter —
/// attribution never comes from ambient state.
pub struct ReviewService<S> {
    repo: BoardRepository<S>,
    engine: Arc<RankEngine<BoardRepository<S>>>,
}

impl<S: Storage> ReviewService<S> {
    pub fn new(repo: BoardRepository<S>, engine: Arc<RankEngine<BoardRepository<S>>>) -> Self {
        Self { repo, engine }
    }

    /// Approve a claim, optionally placing it on the level's board and
    /// marking it the level's first victor.
    ///
    /// A user may hold at most one approved claim per level; a second one is
    /// refused before anything is written.
    pub async fn approve(
        &self,
        claim_id: ClaimId,
        reviewer: UserId,
        assigned_rank: Option<u8>,
        first_victor: bool,
        admin_notes: Option<String>,
    ) -> Result<ReviewOutcome> {
        // Reject a bad rank before any state is touched.
        if let Some(value) = assigned_rank {
            Rank::new(value)?;
        }

        let mut state = self.repo.load().await?;
        if state.user(reviewer).is_none() {
            return Err(BoardError::UnknownUser(reviewer));
        }
        let claim = state
            .claim(claim_id)
            .ok_or(BoardError::UnknownClaim(claim_id))?
            .clone();

        if let Some(existing) = state.claims.iter().find(|c| {
            c.id != claim_id
                && c.user_id == claim.user_id
                && c.level_id == claim.level_id
                && c.status == ClaimStatus::Approved
        }) {
            return Err(BoardError::DuplicateApproval {
                user: claim.user_id,
                level: claim.level_id,
                existing: existing.id,
            });
        }

        let group = GroupKey::LevelClaims(claim.level_id);

        {
            let record = state
                .claim_mut(claim_id)
                .ok_or(BoardError::UnknownClaim(claim_id))?;
            record.status = ClaimStatus::Approved;
            record.reviewed_by = Some(reviewer);
            record.reviewed_at = Some(Utc::now());
            record.admin_notes = admin_notes;
        }
        // Eligibility changed: invalidate snapshots taken before this point.
        *state.claim_versions.entry(claim.level_id).or_insert(0) += 1;
        self.repo.save(&state).await?;

        let rank = self
            .engine
            .assign(claim_id.into(), group, assigned_rank)
            .await?;
        let flag = self
            .engine
            .set_exclusive_flag(claim_id.into(), group, first_victor)
            .await?;

        let state = self.repo.load().await?;
        let claim = state
            .claim(claim_id)
            .ok_or(BoardError::UnknownClaim(claim_id))?
            .clone();

        tracing::info!(
            claim = %claim_id,
            reviewer = %reviewer,
            rank = %rank.entity.slot,
            first_victor,
            "claim approved"
        );
        Ok(ReviewOutcome { claim, rank, flag })
    }

    /// Reject a claim. A previously approved, ranked claim leaves the board
    /// and the vacated slot is closed before the status flips.
    pub async fn reject(
        &self,
        claim_id: ClaimId,
        reviewer: UserId,
        admin_notes: Option<String>,
    ) -> Result<Claim> {
        let state = self.repo.load().await?;
        if state.user(reviewer).is_none() {
            return Err(BoardError::UnknownUser(reviewer));
        }
        let claim = state
            .claim(claim_id)
            .ok_or(BoardError::UnknownClaim(claim_id))?
            .clone();
        let group = GroupKey::LevelClaims(claim.level_id);

        // While the claim is still eligible, pull it out of the ranking and
        // drop its flag through the engine, so the cascade stays unified.
        if claim.status == ClaimStatus::Approved {
            self.engine.clear(claim_id.into(), group).await?;
            if claim.first_victor {
                self.engine
                    .set_exclusive_flag(claim_id.into(), group, false)
                    .await?;
            }
        }

        let mut state = self.repo.load().await?;
        {
            let record = state
                .claim_mut(claim_id)
                .ok_or(BoardError::UnknownClaim(claim_id))?;
            record.status = ClaimStatus::Rejected;
            record.first_victor = false;
            record.reviewed_by = Some(reviewer);
            record.reviewed_at = Some(Utc::now());
            record.admin_notes = admin_notes;
        }
        *state.claim_versions.entry(claim.level_id).or_insert(0) += 1;
        self.repo.save(&state).await?;

        let state = self.repo.load().await?;
        let claim = state
            .claim(claim_id)
            .ok_or(BoardError::UnknownClaim(claim_id))?
            .clone();
        tracing::info!(claim = %claim_id, reviewer = %reviewer, "claim rejected");
        Ok(claim)
    }

    /// Re-rank an already approved claim (the manage-ranks screen).
    pub async fn set_claim_rank(
        &self,
        claim_id: ClaimId,
        rank: Option<u8>,
    ) -> Result<AssignOutcome> {
        let state = self.repo.load().await?;
        let claim = state
            .claim(claim_id)
            .ok_or(BoardError::UnknownClaim(claim_id))?;
        let group = GroupKey::LevelClaims(claim.level_id);
        self.engine.assign(claim_id.into(), group, rank).await
    }

    /// Move the first-victor flag (or take it away).
    pub async fn set_first_victor(&self, claim_id: ClaimId, value: bool) -> Result<FlagOutcome> {
        let state = self.repo.load().await?;
        let claim = state
            .claim(claim_id)
            .ok_or(BoardError::UnknownClaim(claim_id))?;
        let group = GroupKey::LevelClaims(claim.level_id);
        self.engine
            .set_exclusive_flag(claim_id.into(), group, value)
            .await
    }
}

use crate::adapters::BoardRepository;
use crate::domain::model::{Claim, ClaimStatus, Level, RankSlot, UserId};
use crate::domain::ports::Storage;
use crate::utils::error::{BoardError, Result};
use crate::utils::validation::{validate_max_length, validate_non_empty_string, validate_video_url};
use chrono::Utc;

/// Player-facing claim submission. A claim enters as `Pending` and stays out
/// of the ranked population until a reviewer approves it.
pub struct ClaimService<S> {
    repo: BoardRepository<S>,
}

impl<S: Storage> ClaimService<S> {
    pub fn new(repo: BoardRepository<S>) -> Self {
        Self { repo }
    }

    /// Submit a completion claim. The named level is created on the fly
    /// (unranked) when it does not exist yet, matching how players name
    /// levels the board has not seen before.
    pub async fn submit(
        &self,
        user: UserId,
        level_name: &str,
        video_url: &str,
        user_notes: Option<String>,
    ) -> Result<Claim> {
        let level_name = level_name.trim();
        validate_non_empty_string("level_name", level_name)?;
        validate_max_length("level_name", level_name, 100)?;
        validate_video_url("video_url", video_url)?;

        let mut state = self.repo.load().await?;
        if state.user(user).is_none() {
            return Err(BoardError::UnknownUser(user));
        }

        let level_id = match state.level_by_name(level_name) {
            Some(level) => level.id,
            None => {
                let id = state.next_level_id();
                state.levels.push(Level {
                    id,
                    name: level_name.to_string(),
                    description: None,
                    difficulty: None,
                    slot: RankSlot::Unranked,
                    points: 0,
                    created_at: Utc::now(),
                });
                tracing::info!(level = %id, name = level_name, "level auto-created from claim");
                id
            }
        };

        let claim = Claim {
            id: state.next_claim_id(),
            user_id: user,
            level_id,
            video_url: video_url.to_string(),
            user_notes,
            status: ClaimStatus::Pending,
            slot: RankSlot::Unranked,
            points: 0,
            first_victor: false,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            admin_notes: None,
        };

        state.claims.push(claim.clone());
        self.repo.save(&state).await?;

        tracing::info!(claim = %claim.id, user = %user, level = %level_id, "claim submitted");
        Ok(claim)
    }

    /// A user's claims, newest first.
    pub async fn claims_for_user(&self, user: UserId) -> Result<Vec<Claim>> {
        let state = self.repo.load().await?;
        let mut claims: Vec<Claim> = state
            .claims
            .iter()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect();
        claims.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(claims)
    }

    /// All pending claims, oldest first (review queue order).
    pub async fn pending_claims(&self) -> Result<Vec<Claim>> {
        let state = self.repo.load().await?;
        let mut claims: Vec<Claim> = state
            .claims
            .iter()
            .filter(|c| c.status == ClaimStatus::Pending)
            .cloned()
            .collect();
        claims.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStorage;
    use crate::domain::model::{BoardState, User};

    async fn service_with_user() -> ClaimService<MemoryStorage> {
        let repo = BoardRepository::new(MemoryStorage::new(), "board.json");
        let state = BoardState {
            users: vec![User {
                id: UserId(1),
                username: "player".to_string(),
                is_admin: false,
                created_at: Utc::now(),
            }],
            ..Default::default()
        };
        repo.save(&state).await.unwrap();
        ClaimService::new(repo)
    }

    #[tokio::test]
    async fn submit_creates_pending_claim_and_level() {
        let service = service_with_user().await;

        let claim = service
            .submit(
                UserId(1),
                "Bloodbath",
                "https://youtu.be/dQw4w9WgXcQ",
                None,
            )
            .await
            .unwrap();

        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.slot, RankSlot::Unranked);
        assert_eq!(claim.points, 0);

        let state = service.repo.load().await.unwrap();
        let level = state.level_by_name("Bloodbath").unwrap();
        assert_eq!(level.slot, RankSlot::Unranked);
    }

    #[tokio::test]
    async fn submit_reuses_an_existing_level() {
        let service = service_with_user().await;

        service
            .submit(UserId(1), "Bloodbath", "https://youtu.be/dQw4w9WgXcQ", None)
            .await
            .unwrap();
        service
            .submit(
                UserId(1),
                "  Bloodbath  ",
                "https://youtu.be/aaaaaaaaaaa",
                None,
            )
            .await
            .unwrap();

        let state = service.repo.load().await.unwrap();
        assert_eq!(state.levels.len(), 1);
        assert_eq!(state.claims.len(), 2);
    }

    #[tokio::test]
    async fn submit_rejects_a_bad_video_link() {
        let service = service_with_user().await;
        let err = service
            .submit(UserId(1), "Bloodbath", "https://example.com/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn submit_requires_a_known_user() {
        let service = service_with_user().await;
        let err = service
            .submit(UserId(9), "Bloodbath", "https://youtu.be/dQw4w9WgXcQ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::UnknownUser(_)));
    }

    #[tokio::test]
    async fn pending_queue_is_oldest_first() {
        let service = service_with_user().await;
        let a = service
            .submit(UserId(1), "One", "https://youtu.be/dQw4w9WgXcQ", None)
            .await
            .unwrap();
        let b = service
            .submit(UserId(1), "Two", "https://youtu.be/dQw4w9WgXcQ", None)
            .await
            .unwrap();

        let pending = service.pending_claims().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].id == a.id && pending[1].id == b.id);
    }
}

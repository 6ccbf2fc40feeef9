use chrono::Utc;
use rankboard::domain::model::{
    BoardState, EntityId, GroupKey, Level, LevelId, Rank, RankSlot,
};
use rankboard::{BoardError, BoardRepository, MemoryStorage, RankEngine};
use std::sync::Arc;

fn level(id: u64, rank: Option<u8>) -> Level {
    let slot = rank
        .map(|v| RankSlot::from_rank(v).unwrap())
        .unwrap_or_default();
    Level {
        id: LevelId(id),
        name: format!("Level {}", id),
        description: None,
        difficulty: None,
        slot,
        points: slot.points(),
        created_at: Utc::now(),
    }
}

async fn engine_with(
    levels: Vec<Level>,
) -> (
    Arc<RankEngine<BoardRepository<MemoryStorage>>>,
    BoardRepository<MemoryStorage>,
) {
    let repo = BoardRepository::new(MemoryStorage::new(), "board.json");
    let state = BoardState {
        levels,
        ..Default::default()
    };
    repo.save(&state).await.unwrap();
    (Arc::new(RankEngine::new(repo.clone())), repo)
}

/// After any successful operation the board must hold no duplicate ranks and
/// every points value must match its rank.
async fn assert_board_consistent(repo: &BoardRepository<MemoryStorage>) {
    let state = repo.load().await.unwrap();
    let mut seen = std::collections::HashSet::new();
    for l in &state.levels {
        assert_eq!(l.points, l.slot.points(), "points drifted for {}", l.name);
        if let Some(rank) = l.slot.rank() {
            assert!(seen.insert(rank), "duplicate rank {} on the board", rank);
        }
    }
}

#[tokio::test]
async fn moving_the_tail_to_the_head_rotates_the_board() {
    // {A:1, B:2, C:3}; assign(C, 1) => {C:1, A:2, B:3}
    let (engine, repo) =
        engine_with(vec![level(1, Some(1)), level(2, Some(2)), level(3, Some(3))]).await;

    engine
        .assign(EntityId(3), GroupKey::Levels, Some(1))
        .await
        .unwrap();

    let state = repo.load().await.unwrap();
    assert_eq!(state.level(LevelId(3)).unwrap().slot.rank().unwrap().get(), 1);
    assert_eq!(state.level(LevelId(1)).unwrap().slot.rank().unwrap().get(), 2);
    assert_eq!(state.level(LevelId(2)).unwrap().slot.rank().unwrap().get(), 3);
    assert_board_consistent(&repo).await;
}

#[tokio::test]
async fn density_preserving_insert() {
    let (engine, repo) = engine_with(vec![
        level(1, Some(1)),
        level(2, Some(2)),
        level(4, None),
    ])
    .await;

    let outcome = engine
        .assign(EntityId(4), GroupKey::Levels, Some(1))
        .await
        .unwrap();
    assert_eq!(outcome.shifted.len(), 2);

    let state = repo.load().await.unwrap();
    assert_eq!(state.level(LevelId(4)).unwrap().slot.rank().unwrap().get(), 1);
    assert_eq!(state.level(LevelId(1)).unwrap().slot.rank().unwrap().get(), 2);
    assert_eq!(state.level(LevelId(2)).unwrap().slot.rank().unwrap().get(), 3);
    assert_board_consistent(&repo).await;
}

#[tokio::test]
async fn full_board_demotes_the_displaced_occupant() {
    let mut levels: Vec<Level> = (1..=50).map(|v| level(v as u64, Some(v))).collect();
    levels.push(level(99, None));
    let (engine, repo) = engine_with(levels).await;

    engine
        .assign(EntityId(99), GroupKey::Levels, Some(50))
        .await
        .unwrap();

    let state = repo.load().await.unwrap();
    let demoted = state.level(LevelId(50)).unwrap();
    assert_eq!(demoted.slot, RankSlot::Unranked);
    assert_eq!(demoted.points, 0);
    assert_eq!(
        state.level(LevelId(99)).unwrap().slot.rank().unwrap().get(),
        50
    );
    assert_board_consistent(&repo).await;
}

#[tokio::test]
async fn clear_shifts_only_lower_ranks() {
    // {X:3, A:5, Y:7}; clear(A) => Y:6, X untouched.
    let (engine, repo) =
        engine_with(vec![level(1, Some(3)), level(2, Some(5)), level(3, Some(7))]).await;

    engine.clear(EntityId(2), GroupKey::Levels).await.unwrap();

    let state = repo.load().await.unwrap();
    assert_eq!(state.level(LevelId(1)).unwrap().slot.rank().unwrap().get(), 3);
    assert_eq!(state.level(LevelId(2)).unwrap().slot, RankSlot::Unranked);
    assert_eq!(state.level(LevelId(3)).unwrap().slot.rank().unwrap().get(), 6);
    assert_board_consistent(&repo).await;
}

#[tokio::test]
async fn assign_then_clear_restores_everyone_else() {
    let (engine, repo) = engine_with(vec![
        level(1, Some(1)),
        level(2, Some(2)),
        level(3, Some(3)),
        level(9, None),
    ])
    .await;

    engine
        .assign(EntityId(9), GroupKey::Levels, Some(2))
        .await
        .unwrap();
    engine.clear(EntityId(9), GroupKey::Levels).await.unwrap();

    let state = repo.load().await.unwrap();
    for (id, expected) in [(1u64, 1u8), (2, 2), (3, 3)] {
        assert_eq!(
            state.level(LevelId(id)).unwrap().slot.rank().unwrap().get(),
            expected
        );
    }
    assert_eq!(state.level(LevelId(9)).unwrap().slot, RankSlot::Unranked);
    assert_board_consistent(&repo).await;
}

#[tokio::test]
async fn reassigning_the_same_rank_shifts_nobody() {
    let (engine, repo) =
        engine_with(vec![level(1, Some(1)), level(2, Some(2))]).await;

    let before = repo.load().await.unwrap();
    let outcome = engine
        .assign(EntityId(2), GroupKey::Levels, Some(2))
        .await
        .unwrap();
    assert!(outcome.shifted.is_empty());

    let after = repo.load().await.unwrap();
    for (b, a) in before.levels.iter().zip(after.levels.iter()) {
        assert_eq!(b.slot, a.slot);
    }
}

#[tokio::test]
async fn points_track_every_move() {
    let (engine, repo) =
        engine_with(vec![level(1, Some(1)), level(2, Some(2)), level(3, None)]).await;

    engine
        .assign(EntityId(3), GroupKey::Levels, Some(1))
        .await
        .unwrap();
    engine
        .assign(EntityId(1), GroupKey::Levels, Some(3))
        .await
        .unwrap();
    engine.clear(EntityId(2), GroupKey::Levels).await.unwrap();

    assert_board_consistent(&repo).await;
    let state = repo.load().await.unwrap();
    let ranked_points: u32 = state.levels.iter().map(|l| l.points).sum();
    let expected: u32 = state
        .levels
        .iter()
        .filter_map(|l| l.slot.rank())
        .map(Rank::points)
        .sum();
    assert_eq!(ranked_points, expected);
}

#[tokio::test]
async fn describe_matches_the_board() {
    let (engine, _repo) =
        engine_with(vec![level(1, Some(1)), level(2, Some(4)), level(3, None)]).await;

    let dist = engine.describe(GroupKey::Levels).await.unwrap();
    assert_eq!(dist.occupied_count, 2);
    assert_eq!(dist.unranked_count, 1);
    assert_eq!(dist.next_available.map(|r| r.get()), Some(2));
    assert_eq!(dist.gaps.len(), 48);
}

#[tokio::test]
async fn out_of_range_target_fails_cleanly() {
    let (engine, repo) = engine_with(vec![level(1, Some(1))]).await;

    let err = engine
        .assign(EntityId(1), GroupKey::Levels, Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::InvalidRank { .. }));

    let state = repo.load().await.unwrap();
    assert_eq!(state.level(LevelId(1)).unwrap().slot.rank().unwrap().get(), 1);
    assert_eq!(state.levels_version, 0);
}

#[tokio::test]
async fn unknown_entity_fails_cleanly() {
    let (engine, repo) = engine_with(vec![level(1, Some(1))]).await;

    let err = engine
        .assign(EntityId(42), GroupKey::Levels, Some(2))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::NotFound { .. }));
    assert_eq!(repo.load().await.unwrap().levels_version, 0);
}

#[tokio::test]
async fn cascades_stay_inside_their_group() {
    // Levels and one level's claims are independent populations: ranking a
    // level never moves a claim, even when ids collide numerically.
    use rankboard::domain::model::{Claim, ClaimId, ClaimStatus, UserId};

    let repo = BoardRepository::new(MemoryStorage::new(), "board.json");
    let slot1 = RankSlot::from_rank(1).unwrap();
    let state = BoardState {
        levels: vec![level(1, Some(1)), level(2, None)],
        claims: vec![Claim {
            id: ClaimId(2),
            user_id: UserId(1),
            level_id: LevelId(1),
            video_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            user_notes: None,
            status: ClaimStatus::Approved,
            slot: slot1,
            points: slot1.points(),
            first_victor: false,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            admin_notes: None,
        }],
        users: vec![],
        ..Default::default()
    };
    repo.save(&state).await.unwrap();
    let engine = RankEngine::new(repo.clone());

    engine
        .assign(EntityId(2), GroupKey::Levels, Some(1))
        .await
        .unwrap();

    let state = repo.load().await.unwrap();
    // The claim with the same numeric id keeps its rank.
    assert_eq!(state.claim(ClaimId(2)).unwrap().slot, slot1);
    assert_eq!(state.level(LevelId(2)).unwrap().slot.rank().unwrap().get(), 1);
}

#[cfg(test)]
mod database_tests {
    use crate::*;
    use chrono::Utc;
    use types::{CardId, GameResult, RoundRecord, UserId};

    pub async fn setup_test_db() -> SqliteStore {
        let pool = DatabaseConfig::new("sqlite::memory:")
            .create_pool()
            .await
            .expect("Failed to create test database pool");
        let store = SqliteStore::new(pool);
        store
            .run_migrations()
            .await
            .expect("Failed to run test migrations");
        store
    }

    fn new_card(name: &str, index: f64) -> NewCard {
        NewCard {
            name: name.to_string(),
            image_ref: format!("/images/cards/{}.jpg", name.replace(' ', "_")),
            misfortune_index: index,
        }
    }

    #[tokio::test]
    async fn test_insert_and_retrieve_card() {
        let store = setup_test_db().await;
        let mut txn = store.begin().await.expect("Failed to begin");

        let card = txn
            .insert_card(&new_card("Phone in the lake", 61.5))
            .await
            .expect("Failed to insert card");
        let fetched = txn
            .card_by_id(card.id)
            .await
            .expect("Failed to fetch card")
            .expect("Card should exist");

        assert_eq!(fetched, card);
        assert_eq!(txn.card_by_id(CardId(9999)).await.unwrap(), None);
        txn.commit().await.expect("Failed to commit");
    }

    #[tokio::test]
    async fn test_catalog_constraint_rejects_bad_index() {
        let store = setup_test_db().await;
        let mut txn = store.begin().await.unwrap();

        assert!(txn.insert_card(&new_card("Impossible", 101.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_random_cards_excludes_ids() {
        let store = setup_test_db().await;
        let mut txn = store.begin().await.unwrap();
        let mut ids = Vec::new();
        for i in 0..6 {
            let card = txn
                .insert_card(&new_card(&format!("card {i}"), i as f64 * 10.0))
                .await
                .unwrap();
            ids.push(card.id);
        }

        for _ in 0..10 {
            let drawn = txn.random_cards(3, &ids[..3]).await.unwrap();
            let mut drawn_ids: Vec<CardId> = drawn.iter().map(|c| c.id).collect();
            drawn_ids.sort();
            assert_eq!(drawn_ids, ids[3..].to_vec());
        }

        let err = txn.random_cards(1, &ids).await.unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InsufficientCards {
                requested: 1,
                available: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_game_lifecycle() {
        let store = setup_test_db().await;
        let owner = UserId::new();
        let mut txn = store.begin().await.unwrap();

        let a = txn.insert_card(&new_card("a", 20.0)).await.unwrap();
        let b = txn.insert_card(&new_card("b", 50.0)).await.unwrap();
        let c = txn.insert_card(&new_card("c", 80.0)).await.unwrap();
        let game = txn
            .insert_game(&NewGame::starting_now(Some(owner)))
            .await
            .expect("Failed to insert game");
        assert!(!game.guest);

        for (order, card) in [&c, &a, &b].iter().enumerate() {
            txn.append_hand_entry(game.id, card.id, order as u32 + 1)
                .await
                .expect("Failed to add hand entry");
        }
        assert!(txn.append_hand_entry(game.id, a.id, 4).await.is_err());

        let hand = txn.hand_cards(game.id).await.unwrap();
        assert_eq!(
            hand.iter().map(|h| h.card.id).collect::<Vec<_>>(),
            vec![c.id, a.id, b.id]
        );
        assert_eq!(txn.hand_size(game.id).await.unwrap(), 3);

        txn.set_pending_card(game.id, Some(b.id)).await.unwrap();
        let locked = txn.lock_game(game.id).await.unwrap().expect("game exists");
        assert_eq!(locked.pending_card_id, Some(b.id));
        assert_eq!(locked.owner_id, Some(owner));

        txn.append_round(&RoundRecord {
            game_id: game.id,
            round_number: 1,
            presented_card_id: b.id,
            chosen_position: -1,
            correct_position: 1,
            is_correct: false,
            time_taken_seconds: Some(30),
        })
        .await
        .unwrap();
        assert_eq!(txn.increment_incorrect_attempts(game.id).await.unwrap(), 1);
        assert_eq!(txn.count_rounds(game.id).await.unwrap(), 1);
        assert_eq!(txn.count_incorrect_rounds(game.id).await.unwrap(), 1);

        let rounds = txn.rounds_for_game(game.id).await.unwrap();
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].card_name, "b");
        assert_eq!(rounds[0].card_misfortune_index, 50.0);
        assert_eq!(rounds[0].record.chosen_position, -1);
        assert_eq!(rounds[0].record.time_taken_seconds, Some(30));

        assert!(txn
            .finish_game(game.id, GameResult::Lost, Utc::now())
            .await
            .unwrap());
        assert!(!txn
            .finish_game(game.id, GameResult::Won, Utc::now())
            .await
            .unwrap());
        txn.commit().await.unwrap();

        let mut txn = store.begin().await.unwrap();
        let finished = txn.game_by_id(game.id).await.unwrap().unwrap();
        assert_eq!(finished.result, Some(GameResult::Lost));
        assert!(finished.ended_at.is_some());
        assert_eq!(finished.pending_card_id, None);
        assert_eq!(finished.incorrect_attempts, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_game() {
        let store = setup_test_db().await;

        let mut txn = store.begin().await.unwrap();
        let game = txn.insert_game(&NewGame::starting_now(None)).await.unwrap();
        txn.rollback().await.expect("Failed to roll back");

        let mut txn = store.begin().await.unwrap();
        assert_eq!(txn.game_by_id(game.id).await.unwrap(), None);
        assert_eq!(txn.lock_game(game.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_games_for_owner_counts_cards() {
        let store = setup_test_db().await;
        let owner = UserId::new();
        let mut txn = store.begin().await.unwrap();
        let card = txn.insert_card(&new_card("x", 5.0)).await.unwrap();

        let older = txn
            .insert_game(&NewGame {
                owner_id: Some(owner),
                started_at: Utc::now() - chrono::Duration::minutes(5),
            })
            .await
            .unwrap();
        let newer = txn
            .insert_game(&NewGame::starting_now(Some(owner)))
            .await
            .unwrap();
        txn.insert_game(&NewGame::starting_now(None)).await.unwrap();
        txn.append_hand_entry(older.id, card.id, 1).await.unwrap();

        let games = txn.games_for_owner(owner).await.unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].game.id, newer.id);
        assert_eq!(games[0].card_count, 0);
        assert_eq!(games[1].game.id, older.id);
        assert_eq!(games[1].card_count, 1);

        assert!(txn.games_for_owner(UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_owner_keeps_guest_flag() {
        let store = setup_test_db().await;
        let mut txn = store.begin().await.unwrap();
        let game = txn.insert_game(&NewGame::starting_now(None)).await.unwrap();
        let user = UserId::new();

        txn.set_owner(game.id, user).await.unwrap();
        let game = txn.game_by_id(game.id).await.unwrap().unwrap();

        assert_eq!(game.owner_id, Some(user));
        assert!(game.guest);
    }
}

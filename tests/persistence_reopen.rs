use std::path::Path;
use std::rc::Rc;

use encore::catalog::Catalog;
use encore::challenge::ChallengeId;
use encore::challenge_store::ChallengeStore;
use encore::engine::SimulatedEngine;
use encore::history::{CompletionRecord, HistoryDb};
use encore::ledger::Ledger;
use encore::monitor::CompletionRules;
use encore::persistence::{autosave, load_challenges, load_ledger, SqliteKv};
use encore::player::Player;
use tempfile::tempdir;

fn open(db: &Path) -> (ChallengeStore, Ledger) {
    let kv = Rc::new(SqliteKv::open(db).unwrap());
    let mut challenges =
        load_challenges(kv.as_ref(), Catalog::builtin().unwrap().challenges).unwrap();
    let mut ledger = load_ledger(kv.as_ref()).unwrap();
    autosave(kv, &mut challenges, &mut ledger);
    (challenges, ledger)
}

fn play_to_end(player: &mut Player<SimulatedEngine>, id: &ChallengeId) {
    player.play(id).unwrap();
    for _ in 0..20 {
        player.engine_mut().advance(60.0);
        player.poll();
    }
}

#[test]
fn completion_survives_restart_without_reaward() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("state").join("encore.db");
    let id = ChallengeId::from("city-pulse");

    {
        let (challenges, ledger) = open(&db);
        let mut player = Player::new(
            SimulatedEngine::new(),
            challenges,
            ledger,
            CompletionRules::default(),
        );
        play_to_end(&mut player, &id);
        assert_eq!(player.ledger().total_points(), 75);
    }

    let (challenges, ledger) = open(&db);
    assert_eq!(ledger.total_points(), 75);
    assert!(ledger.is_completed(&id));
    let restored = challenges.get(&id).unwrap();
    assert!(restored.completed);
    assert_eq!(restored.progress, 100.0);
    assert!(restored.completed_at.is_some());

    let mut player = Player::new(
        SimulatedEngine::new(),
        challenges,
        ledger,
        CompletionRules::default(),
    );
    play_to_end(&mut player, &id);
    assert_eq!(player.ledger().total_points(), 75);
    assert_eq!(player.ledger().completed_count(), 1);
}

#[test]
fn partial_progress_is_restored() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("encore.db");
    let id = ChallengeId::from("aurora");

    {
        let (challenges, ledger) = open(&db);
        let mut player = Player::new(
            SimulatedEngine::new(),
            challenges,
            ledger,
            CompletionRules::default(),
        );
        player.play(&id).unwrap();
        player.engine_mut().advance(1.0);
        player.engine_mut().advance(150.0);
        player.poll();
        player.stop();
    }

    let (challenges, ledger) = open(&db);
    assert_eq!(challenges.get(&id).unwrap().progress, 50.0);
    assert!(!challenges.get(&id).unwrap().completed);
    assert_eq!(ledger.total_points(), 0);
}

#[test]
fn history_shares_the_database_file() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("encore.db");

    let (challenges, ledger) = open(&db);
    let history = HistoryDb::open(&db).unwrap();
    let mut player = Player::new(
        SimulatedEngine::new(),
        challenges,
        ledger,
        CompletionRules::default(),
    );
    let event = player
        .complete_challenge(&"midnight-run".into())
        .unwrap()
        .expect("first manual completion");
    history
        .record(&CompletionRecord::from_event(
            &event,
            player.challenges().get(&event.challenge_id),
        ))
        .unwrap();

    let reopened = HistoryDb::open(&db).unwrap();
    let rows = reopened.list().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].challenge_id, "midnight-run");
    assert_eq!(rows[0].points_awarded, 120);
    assert_eq!(rows[0].trigger, "manual");
}

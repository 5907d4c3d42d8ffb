//! Integration tests for the tournament bracket engine.
//!
//! These tests drive the full engine — manager, builder, and store —
//! through the in-memory backend, from creation through result submission
//! to final standings.

use std::sync::Arc;

use pong_arena::store::InMemoryBracketStore;
use pong_arena::tournament::{
    BracketKind, CreateTournament, InviteState, MatchStatus, NewParticipant, TournamentError,
    TournamentManager, TournamentStatus,
};

fn manager() -> TournamentManager {
    TournamentManager::new(Arc::new(InMemoryBracketStore::new()))
}

fn request(name: &str, entrants: Vec<NewParticipant>) -> CreateTournament {
    CreateTournament {
        name: name.to_string(),
        owner_id: 42,
        kind: BracketKind::SingleElimination,
        entrants,
        scheduled_at: None,
    }
}

fn players(n: usize) -> Vec<NewParticipant> {
    (0..n)
        .map(|i| NewParticipant::local(format!("player{i}")))
        .collect()
}

/// Play every pending match by letting slot A win 11-N until the bracket
/// completes; returns the champion's participant id.
async fn play_out(mgr: &TournamentManager, tournament_id: i64) -> i64 {
    loop {
        let bracket = mgr.bracket(tournament_id).await.unwrap();
        let next = bracket.matches.iter().find(|m| {
            m.status == MatchStatus::Pending
                && m.player_a.invite_state != InviteState::Placeholder
                && m.player_b.invite_state != InviteState::Placeholder
        });
        let Some(m) = next else {
            panic!("no playable match but bracket not complete");
        };
        let outcome = mgr
            .submit_result(m.id, m.player_a.participant_id, Some(11), Some(6))
            .await
            .unwrap();
        if outcome.bracket_complete {
            return outcome.finished.winner_id.unwrap();
        }
    }
}

#[tokio::test]
async fn test_five_player_tournament_with_byes_runs_to_completion() {
    let mgr = manager();
    let created = mgr
        .create_tournament(request("Bye Cup", players(5)))
        .await
        .unwrap();
    let id = created.tournament.id;

    // 5 entrants pad to a bracket of 8: three byes, three AI opponents.
    let bracket = mgr.bracket(id).await.unwrap();
    let ai_count = bracket
        .participants
        .iter()
        .filter(|p| p.invite_state == InviteState::Ai)
        .count();
    assert_eq!(ai_count, 3);
    assert_eq!(bracket.matches.len(), 7);

    // Every round-1 match is a real game: no placeholder slots anywhere
    // in round 1, and at most one AI per pairing.
    for m in bracket.matches.iter().filter(|m| m.round == 1) {
        assert_ne!(m.player_a.invite_state, InviteState::Placeholder);
        assert_ne!(m.player_b.invite_state, InviteState::Placeholder);
        let ais = [&m.player_a, &m.player_b]
            .iter()
            .filter(|s| s.invite_state == InviteState::Ai)
            .count();
        assert!(ais <= 1);
    }

    let champion = play_out(&mgr, id).await;

    let standings = mgr.standings(id).await.unwrap();
    assert_eq!(standings[0].participant_id, champion);
    assert!(standings[0].is_winner);
    assert_eq!(standings[0].rank, 1);
    // Placeholder never ranks; everyone else does (5 real + 3 AI).
    assert_eq!(standings.len(), 8);
}

#[tokio::test]
async fn test_sixteen_player_bracket_structure() {
    let mgr = manager();
    let created = mgr
        .create_tournament(request("Big Cup", players(16)))
        .await
        .unwrap();
    let bracket = mgr.bracket(created.tournament.id).await.unwrap();

    // 8 + 4 + 2 + 1 matches over 4 rounds.
    assert_eq!(bracket.matches.len(), 15);
    for (round, expected) in [(1u32, 8usize), (2, 4), (3, 2), (4, 1)] {
        assert_eq!(
            bracket.matches.iter().filter(|m| m.round == round).count(),
            expected,
            "round {round}"
        );
    }

    // No AI participants in a full field.
    assert!(
        bracket
            .participants
            .iter()
            .all(|p| p.invite_state != InviteState::Ai)
    );
}

#[tokio::test]
async fn test_winners_propagate_into_the_correct_slots() {
    let mgr = manager();
    let created = mgr
        .create_tournament(request("Slot Cup", players(8)))
        .await
        .unwrap();
    let id = created.tournament.id;
    let r1: Vec<_> = created.matches.iter().filter(|m| m.round == 1).collect();

    // Finish matches 0 and 1; their winners must land in slot A and slot B
    // of the first round-2 match, in that order.
    mgr.submit_result(r1[0].id, r1[0].player_a, Some(11), Some(2))
        .await
        .unwrap();
    mgr.submit_result(r1[1].id, r1[1].player_b, Some(3), Some(11))
        .await
        .unwrap();

    let bracket = mgr.bracket(id).await.unwrap();
    let r2: Vec<_> = bracket.matches.iter().filter(|m| m.round == 2).collect();
    assert_eq!(r2[0].player_a.participant_id, r1[0].player_a);
    assert_eq!(r2[0].player_b.participant_id, r1[1].player_b);

    // The second round-2 match is untouched until its feeders finish.
    assert_eq!(r2[1].player_a.invite_state, InviteState::Placeholder);
    assert_eq!(r2[1].player_b.invite_state, InviteState::Placeholder);
}

#[tokio::test]
async fn test_round_two_match_is_rejected_until_fed() {
    let mgr = manager();
    let created = mgr
        .create_tournament(request("Eager Cup", players(8)))
        .await
        .unwrap();
    let r1: Vec<_> = created.matches.iter().filter(|m| m.round == 1).collect();
    let r2_first = created
        .matches
        .iter()
        .find(|m| m.round == 2)
        .unwrap();

    // Only one feeder has finished: the match still has an undecided slot.
    mgr.submit_result(r1[0].id, r1[0].player_a, Some(11), Some(2))
        .await
        .unwrap();
    let err = mgr
        .submit_result(r2_first.id, r1[0].player_a, Some(11), Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::MatchNotReady(_)));

    // Once both feeders are done the match becomes playable.
    mgr.submit_result(r1[1].id, r1[1].player_a, Some(11), Some(9))
        .await
        .unwrap();
    mgr.submit_result(r2_first.id, r1[0].player_a, Some(11), Some(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_completed_results_survive_stale_resubmissions() {
    let mgr = manager();
    let created = mgr
        .create_tournament(request("Replay Cup", players(2)))
        .await
        .unwrap();
    let m = &created.matches[0];

    mgr.submit_result(m.id, m.player_a, Some(11), Some(8))
        .await
        .unwrap();

    // A stale client re-reporting the same game, even with a different
    // winner, cannot rewrite history.
    for winner in [m.player_a, m.player_b] {
        let err = mgr
            .submit_result(m.id, winner, Some(11), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyFinished(_)));
    }

    let bracket = mgr.bracket(created.tournament.id).await.unwrap();
    assert_eq!(bracket.matches[0].winner_id, Some(m.player_a));
    assert_eq!(bracket.matches[0].score_a, Some(11));
    assert_eq!(bracket.matches[0].score_b, Some(8));
}

#[tokio::test]
async fn test_listing_and_status_handoff() {
    let mgr = manager();
    let created = mgr
        .create_tournament(request("Status Cup", players(4)))
        .await
        .unwrap();
    let id = created.tournament.id;
    assert_eq!(created.tournament.status, TournamentStatus::Ready);

    let ready = mgr
        .list_tournaments(Some(TournamentStatus::Ready))
        .await
        .unwrap();
    assert_eq!(ready.len(), 1);

    // The engine reports completion; the status transition itself belongs
    // to the caller's policy.
    let champion = play_out(&mgr, id).await;
    assert!(champion > 0);
    mgr.set_status(id, TournamentStatus::Completed).await.unwrap();

    let completed = mgr
        .list_tournaments(Some(TournamentStatus::Completed))
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert!(
        mgr.list_tournaments(Some(TournamentStatus::Ready))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_bracket_views_resolve_aliases() {
    let mgr = manager();
    let created = mgr
        .create_tournament(request(
            "View Cup",
            vec![
                NewParticipant::local("ada"),
                NewParticipant::local("grace"),
                NewParticipant::local("alan"),
            ],
        ))
        .await
        .unwrap();

    let bracket = mgr.bracket(created.tournament.id).await.unwrap();

    // Seeding over [1, 4, 2, 3]: ada meets the AI substitute, grace meets
    // alan.
    let r1: Vec<_> = bracket.matches.iter().filter(|m| m.round == 1).collect();
    assert_eq!(r1[0].player_a.alias, "ada");
    assert_eq!(r1[0].player_b.alias, "@AI-1");
    assert_eq!(r1[1].player_a.alias, "grace");
    assert_eq!(r1[1].player_b.alias, "alan");

    // The final's slots render as the placeholder until fed.
    let final_match = bracket.matches.iter().find(|m| m.round == 2).unwrap();
    assert_eq!(final_match.player_a.alias, "@TBD");
    assert_eq!(final_match.player_b.alias, "@TBD");
}

#[tokio::test]
async fn test_identical_requests_build_identical_brackets() {
    let mgr = manager();
    let first = mgr
        .create_tournament(request("Det Cup", players(13)))
        .await
        .unwrap();
    let second = mgr
        .create_tournament(request("Det Cup 2", players(13)))
        .await
        .unwrap();

    let shape = |created: &pong_arena::CreatedTournament| {
        created
            .matches
            .iter()
            .map(|m| {
                let alias = |id| {
                    created
                        .participants
                        .iter()
                        .find(|p| p.id == id)
                        .map(|p| p.alias.clone())
                        .unwrap()
                };
                (m.round, alias(m.player_a), alias(m.player_b))
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(shape(&first), shape(&second));
}

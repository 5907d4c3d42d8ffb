//! Tournament manager: creation, result recording, and winner propagation.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};

use super::builder;
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    BracketKind, BracketView, CreatedTournament, MAX_PARTICIPANTS, MIN_BRACKET_SIZE, MatchId,
    MatchStatus, MatchView, NewParticipant, NewTournament, ParticipantId, RESERVED_ALIAS_PREFIX,
    SlotView, SubmitOutcome, Tournament, TournamentId, TournamentStatus, UserId,
};
use super::standings::{StandingsEntry, compute_standings};
use crate::store::BracketStore;

/// Request to create a tournament with its bracket
#[derive(Debug, Clone)]
pub struct CreateTournament {
    pub name: String,
    pub owner_id: UserId,
    pub kind: BracketKind,
    /// Real entrants in seed order; the first element is seed 1
    pub entrants: Vec<NewParticipant>,
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn BracketStore>,
}

impl TournamentManager {
    /// Create a new tournament manager over an entity store
    pub fn new(store: Arc<dyn BracketStore>) -> Self {
        Self { store }
    }

    /// Create a tournament and generate its bracket atomically.
    ///
    /// Entrants are seeded by list position. Fields of two or more get a
    /// full bracket: round-1 matches (byes converted into AI opponents)
    /// plus placeholder matches for every later round. A single entrant is
    /// stored without any rounds.
    pub async fn create_tournament(
        &self,
        request: CreateTournament,
    ) -> TournamentResult<CreatedTournament> {
        validate_entrants(&request.entrants)?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(TournamentError::InvalidName(request.name));
        }

        let (plan, status) = if request.entrants.len() >= MIN_BRACKET_SIZE {
            (
                Some(builder::build_bracket(request.entrants.len())?),
                TournamentStatus::Ready,
            )
        } else {
            (None, TournamentStatus::Draft)
        };

        let created = self
            .store
            .create_tournament(
                NewTournament {
                    name: name.to_string(),
                    owner_id: request.owner_id,
                    kind: request.kind,
                    status,
                    scheduled_at: request.scheduled_at,
                },
                &request.entrants,
                plan.as_ref(),
            )
            .await?;

        if let Some(plan) = &plan {
            // Cheap post-construction assertion; a failure here is an
            // engine bug, not bad input.
            builder::verify_bracket_shape(&created.matches, plan.size)?;
        }

        info!(
            "Created tournament {} ({:?}) with {} entrants, {} matches",
            created.tournament.id,
            created.tournament.name,
            request.entrants.len(),
            created.matches.len(),
        );

        Ok(created)
    }

    /// Record a match result and advance the winner into the next round.
    ///
    /// Both scores must be supplied together; a finished match rejects any
    /// further submission. On success the winner replaces the placeholder
    /// in the slot of the downstream match this one feeds, and the outcome
    /// reports whether the bracket is now complete so the caller's status
    /// policy can act on it.
    pub async fn submit_result(
        &self,
        match_id: MatchId,
        winner_id: ParticipantId,
        score_a: Option<i32>,
        score_b: Option<i32>,
    ) -> TournamentResult<SubmitOutcome> {
        let mut m = self
            .store
            .match_by_id(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;

        if m.status == MatchStatus::Finished {
            return Err(TournamentError::AlreadyFinished(match_id));
        }

        let placeholder = self.store.placeholder_id(m.tournament_id).await?;
        if let Some(placeholder) = placeholder {
            // A slot still holding the sentinel means an earlier round has
            // not decided this match's entrants yet.
            if m.player_a == placeholder || m.player_b == placeholder {
                return Err(TournamentError::MatchNotReady(match_id));
            }
        }

        if !m.has_player(winner_id) {
            return Err(TournamentError::InvalidWinner {
                match_id,
                winner: winner_id,
            });
        }

        let (score_a, score_b) = match (score_a, score_b) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(TournamentError::ScoresRequired),
        };
        for score in [score_a, score_b] {
            if score < 0 {
                return Err(TournamentError::InvalidScore(score));
            }
        }

        if !self
            .store
            .finish_match(match_id, winner_id, score_a, score_b)
            .await?
        {
            // A concurrent submission got there first.
            return Err(TournamentError::AlreadyFinished(match_id));
        }

        m.status = MatchStatus::Finished;
        m.winner_id = Some(winner_id);
        m.score_a = Some(score_a);
        m.score_b = Some(score_b);

        let mut propagated_to = None;
        if let Some((target, slot)) = m.feeds_into {
            let placeholder = placeholder.ok_or_else(|| {
                TournamentError::Construction(format!(
                    "tournament {} has linked rounds but no placeholder",
                    m.tournament_id
                ))
            })?;
            if self
                .store
                .fill_slot(target, slot, winner_id, placeholder)
                .await?
            {
                debug!(
                    "Advanced participant {winner_id} into match {target} slot {slot:?} \
                     (from match {match_id})"
                );
                propagated_to = Some((target, slot));
            } else {
                // The slot only ever has one feeder, so this indicates a
                // replayed propagation (e.g. retry after a partial failure),
                // not a lost write.
                warn!("Slot {slot:?} of match {target} was already decided; propagation skipped");
            }
        }

        let bracket_complete = m.is_final();
        if bracket_complete {
            info!(
                "Tournament {} final decided: participant {} wins {}-{}",
                m.tournament_id, winner_id, score_a, score_b
            );
        }

        Ok(SubmitOutcome {
            finished: m,
            propagated_to,
            bracket_complete,
        })
    }

    /// Fetch a tournament by id
    pub async fn tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.store
            .tournament(id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    /// List tournaments, optionally filtered by status
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        self.store.list_tournaments(status).await
    }

    /// Full bracket state: participants by seed, matches by round, each
    /// slot resolved to its occupant
    pub async fn bracket(&self, id: TournamentId) -> TournamentResult<BracketView> {
        let tournament = self.tournament(id).await?;
        let participants = self.store.participants(id).await?;
        let matches = self.store.matches(id).await?;

        let resolve = |participant: ParticipantId| -> TournamentResult<SlotView> {
            participants
                .iter()
                .find(|p| p.id == participant)
                .map(|p| SlotView {
                    participant_id: p.id,
                    alias: p.alias.clone(),
                    invite_state: p.invite_state,
                })
                .ok_or_else(|| {
                    TournamentError::Construction(format!(
                        "match slot references unknown participant {participant}"
                    ))
                })
        };

        let matches = matches
            .iter()
            .map(|m| {
                Ok(MatchView {
                    id: m.id,
                    round: m.round,
                    player_a: resolve(m.player_a)?,
                    player_b: resolve(m.player_b)?,
                    status: m.status,
                    winner_id: m.winner_id,
                    score_a: m.score_a,
                    score_b: m.score_b,
                    scheduled_at: m.scheduled_at,
                })
            })
            .collect::<TournamentResult<Vec<_>>>()?;

        Ok(BracketView {
            tournament,
            participants,
            matches,
        })
    }

    /// Final standings for a tournament
    pub async fn standings(&self, id: TournamentId) -> TournamentResult<Vec<StandingsEntry>> {
        // Ensure a missing id surfaces as NotFound rather than an empty list.
        self.tournament(id).await?;
        let participants = self.store.participants(id).await?;
        let matches = self.store.matches(id).await?;
        Ok(compute_standings(&participants, &matches))
    }

    /// Overwrite a tournament's status on behalf of the external
    /// status-transition policy
    pub async fn set_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<()> {
        self.store.set_status(id, status).await
    }
}

fn validate_entrants(entrants: &[NewParticipant]) -> TournamentResult<()> {
    if entrants.is_empty() {
        return Err(TournamentError::NoParticipants);
    }
    if entrants.len() > MAX_PARTICIPANTS {
        return Err(TournamentError::TooManyParticipants {
            count: entrants.len(),
            max: MAX_PARTICIPANTS,
        });
    }

    let mut seen = HashSet::with_capacity(entrants.len());
    for entrant in entrants {
        if entrant.alias.trim().is_empty() {
            return Err(TournamentError::InvalidAlias(entrant.alias.clone()));
        }
        if entrant.alias.starts_with(RESERVED_ALIAS_PREFIX) {
            return Err(TournamentError::ReservedAlias(entrant.alias.clone()));
        }
        if !entrant.invite_state.is_real() {
            return Err(TournamentError::InvalidInviteState(entrant.invite_state));
        }
        // Aliases are compared exactly as stored: case-sensitive.
        if !seen.insert(entrant.alias.as_str()) {
            return Err(TournamentError::DuplicateAlias(entrant.alias.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBracketStore;
    use crate::tournament::models::InviteState;

    fn manager() -> TournamentManager {
        TournamentManager::new(Arc::new(InMemoryBracketStore::new()))
    }

    fn request(entrants: Vec<NewParticipant>) -> CreateTournament {
        CreateTournament {
            name: "Friday Cup".to_string(),
            owner_id: 7,
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

    #[tokio::test]
    async fn test_create_full_bracket() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(8))).await.unwrap();

        assert_eq!(created.tournament.status, TournamentStatus::Ready);
        // 8 entrants + placeholder, no AI.
        assert_eq!(created.participants.len(), 9);
        assert_eq!(created.matches.len(), 7);
        assert_eq!(
            created.matches.iter().filter(|m| m.round == 1).count(),
            4
        );
        assert_eq!(
            created.matches.iter().filter(|m| m.is_final()).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_create_with_byes_substitutes_ai() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(5))).await.unwrap();

        let ai: Vec<_> = created
            .participants
            .iter()
            .filter(|p| p.invite_state == InviteState::Ai)
            .collect();
        assert_eq!(ai.len(), 3);
        assert!(ai.iter().all(|p| p.alias.starts_with("@AI-")));

        // Every round-1 match pairs a real entrant against a real entrant
        // or an AI opponent; never a placeholder, never two AIs.
        let placeholder = created
            .participants
            .iter()
            .find(|p| p.is_placeholder())
            .unwrap();
        for m in created.matches.iter().filter(|m| m.round == 1) {
            assert_ne!(m.player_a, placeholder.id);
            assert_ne!(m.player_b, placeholder.id);
            let ai_slots = [m.player_a, m.player_b]
                .iter()
                .filter(|id| ai.iter().any(|p| p.id == **id))
                .count();
            assert!(ai_slots <= 1);
        }
    }

    #[tokio::test]
    async fn test_create_single_entrant_skips_rounds() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(1))).await.unwrap();
        assert_eq!(created.tournament.status, TournamentStatus::Draft);
        assert_eq!(created.participants.len(), 1);
        assert!(created.matches.is_empty());
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let mgr = manager();

        let err = mgr.create_tournament(request(vec![])).await.unwrap_err();
        assert!(matches!(err, TournamentError::NoParticipants));

        let err = mgr
            .create_tournament(request(players(MAX_PARTICIPANTS + 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::TooManyParticipants { .. }));

        let err = mgr
            .create_tournament(request(vec![
                NewParticipant::local("dup"),
                NewParticipant::local("dup"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::DuplicateAlias(_)));

        let err = mgr
            .create_tournament(request(vec![
                NewParticipant::local("ok"),
                NewParticipant::local("@sneaky"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::ReservedAlias(_)));

        let err = mgr
            .create_tournament(request(vec![
                NewParticipant::local("ok"),
                NewParticipant::local("   "),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidAlias(_)));
    }

    #[tokio::test]
    async fn test_aliases_are_case_sensitive() {
        let mgr = manager();
        let created = mgr
            .create_tournament(request(vec![
                NewParticipant::local("Ada"),
                NewParticipant::local("ada"),
            ]))
            .await
            .unwrap();
        assert_eq!(created.participants.len(), 3); // both entrants + placeholder
    }

    #[tokio::test]
    async fn test_submit_result_happy_path_propagates_winner() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(4))).await.unwrap();
        let first = &created.matches[0];
        let (target, slot) = first.feeds_into.unwrap();

        let outcome = mgr
            .submit_result(first.id, first.player_a, Some(11), Some(4))
            .await
            .unwrap();

        assert_eq!(outcome.finished.status, MatchStatus::Finished);
        assert_eq!(outcome.finished.winner_id, Some(first.player_a));
        assert_eq!(outcome.propagated_to, Some((target, slot)));
        assert!(!outcome.bracket_complete);

        // The fed slot now holds the winner; the sibling slot is untouched.
        let bracket = mgr.bracket(created.tournament.id).await.unwrap();
        let fed = bracket.matches.iter().find(|m| m.id == target).unwrap();
        assert_eq!(fed.player_a.participant_id, first.player_a);
        assert_eq!(fed.player_b.invite_state, InviteState::Placeholder);
    }

    #[tokio::test]
    async fn test_submit_result_match_not_found() {
        let mgr = manager();
        let err = mgr
            .submit_result(424242, 1, Some(11), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::MatchNotFound(424242)));
    }

    #[tokio::test]
    async fn test_submit_result_invalid_winner_keeps_match_pending() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(4))).await.unwrap();
        let first = &created.matches[0];

        let err = mgr
            .submit_result(first.id, 999_999, Some(11), Some(4))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidWinner { .. }));

        let bracket = mgr.bracket(created.tournament.id).await.unwrap();
        let stored = bracket.matches.iter().find(|m| m.id == first.id).unwrap();
        assert_eq!(stored.status, MatchStatus::Pending);
        assert_eq!(stored.winner_id, None);
    }

    #[tokio::test]
    async fn test_submit_result_requires_both_scores() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(2))).await.unwrap();
        let m = &created.matches[0];

        for (a, b) in [(None, None), (Some(11), None), (None, Some(7))] {
            let err = mgr.submit_result(m.id, m.player_a, a, b).await.unwrap_err();
            assert!(matches!(err, TournamentError::ScoresRequired));
        }

        let err = mgr
            .submit_result(m.id, m.player_a, Some(-1), Some(7))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidScore(-1)));
    }

    #[tokio::test]
    async fn test_submit_result_rejects_resubmission() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(2))).await.unwrap();
        let m = &created.matches[0];

        mgr.submit_result(m.id, m.player_a, Some(11), Some(9))
            .await
            .unwrap();

        let err = mgr
            .submit_result(m.id, m.player_b, Some(11), Some(9))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::AlreadyFinished(_)));

        // History is untouched by the rejected overwrite.
        let bracket = mgr.bracket(created.tournament.id).await.unwrap();
        assert_eq!(bracket.matches[0].winner_id, Some(m.player_a));
    }

    #[tokio::test]
    async fn test_submit_result_rejects_undecided_match() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(4))).await.unwrap();
        let final_match = created.matches.iter().find(|m| m.is_final()).unwrap();
        let placeholder = created
            .participants
            .iter()
            .find(|p| p.is_placeholder())
            .unwrap();

        // Both slots still hold the sentinel; even naming the sentinel as
        // winner must fail.
        let err = mgr
            .submit_result(final_match.id, placeholder.id, Some(11), Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::MatchNotReady(_)));
    }

    #[tokio::test]
    async fn test_full_tournament_to_standings() {
        let mgr = manager();
        let created = mgr.create_tournament(request(players(4))).await.unwrap();
        let id = created.tournament.id;

        // Seeding over [1, 4, 2, 3]: match 0 is p0 vs p3, match 1 is p1 vs p2.
        let r1: Vec<_> = created.matches.iter().filter(|m| m.round == 1).collect();
        mgr.submit_result(r1[0].id, r1[0].player_a, Some(11), Some(5))
            .await
            .unwrap();
        mgr.submit_result(r1[1].id, r1[1].player_a, Some(11), Some(9))
            .await
            .unwrap();

        let final_match = created.matches.iter().find(|m| m.is_final()).unwrap();
        let outcome = mgr
            .submit_result(final_match.id, r1[0].player_a, Some(11), Some(7))
            .await
            .unwrap();
        assert!(outcome.bracket_complete);
        assert_eq!(outcome.propagated_to, None);

        let standings = mgr.standings(id).await.unwrap();
        assert_eq!(standings.len(), 4);
        assert!(standings[0].is_winner);
        assert_eq!(standings[0].participant_id, r1[0].player_a);
        assert_eq!(standings[0].total_score, 22);
        assert_eq!(standings[0].rank, 1);
        // Runner-up lost the final 7-11 after an 11-9 round 1.
        assert_eq!(standings[1].participant_id, r1[1].player_a);
        assert_eq!(standings[1].total_score, 18);
        // Round-1 losers tie on round, split on total score.
        assert_eq!(standings[2].total_score, 9);
        assert_eq!(standings[3].total_score, 5);
    }

    #[tokio::test]
    async fn test_queries_for_missing_tournament() {
        let mgr = manager();
        assert!(matches!(
            mgr.bracket(5555).await.unwrap_err(),
            TournamentError::TournamentNotFound(5555)
        ));
        assert!(matches!(
            mgr.standings(5555).await.unwrap_err(),
            TournamentError::TournamentNotFound(5555)
        ));
    }
}

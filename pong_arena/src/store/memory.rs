//! In-memory implementation of the entity store.
//!
//! Backs the integration test suites and the server's `--in-memory` demo
//! mode. All state lives behind a single mutex, which trivially provides
//! the same at-most-once transition guarantees the PostgreSQL store gets
//! from conditional single-row updates.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::repository::BracketStore;
use crate::tournament::builder::BracketPlan;
use crate::tournament::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{
    AI_ALIAS_PREFIX, CreatedTournament, InviteState, Match, MatchId, MatchSlot, MatchStatus,
    NewParticipant, NewTournament, PLACEHOLDER_ALIAS, Participant, ParticipantId, Tournament,
    TournamentId, TournamentStatus,
};

#[derive(Default)]
struct MemoryInner {
    tournaments: BTreeMap<TournamentId, Tournament>,
    participants: BTreeMap<ParticipantId, Participant>,
    matches: BTreeMap<MatchId, Match>,
    next_id: i64,
}

impl MemoryInner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_participant(
        &mut self,
        tournament_id: TournamentId,
        alias: String,
        user_id: Option<i64>,
        invite_state: InviteState,
        seed: Option<u32>,
    ) -> TournamentResult<Participant> {
        let duplicate = self
            .participants
            .values()
            .any(|p| p.tournament_id == tournament_id && p.alias == alias);
        if duplicate {
            // Mirrors the unique (tournament_id, alias) constraint.
            return Err(TournamentError::DuplicateAlias(alias));
        }
        let participant = Participant {
            id: self.next_id(),
            tournament_id,
            alias,
            user_id,
            invite_state,
            seed,
            joined_at: Utc::now(),
        };
        self.participants.insert(participant.id, participant.clone());
        Ok(participant)
    }
}

/// In-memory [`BracketStore`]
#[derive(Default)]
pub struct InMemoryBracketStore {
    inner: Mutex<MemoryInner>,
}

impl InMemoryBracketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BracketStore for InMemoryBracketStore {
    async fn create_tournament(
        &self,
        new: NewTournament,
        entrants: &[NewParticipant],
        plan: Option<&BracketPlan>,
    ) -> TournamentResult<CreatedTournament> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");

        let tournament = Tournament {
            id: inner.next_id(),
            name: new.name,
            owner_id: new.owner_id,
            kind: new.kind,
            status: new.status,
            scheduled_at: new.scheduled_at,
            created_at: Utc::now(),
        };
        inner.tournaments.insert(tournament.id, tournament.clone());

        let mut real = Vec::with_capacity(entrants.len());
        for (i, entrant) in entrants.iter().enumerate() {
            real.push(inner.insert_participant(
                tournament.id,
                entrant.alias.clone(),
                entrant.user_id,
                entrant.invite_state,
                Some(i as u32 + 1),
            )?);
        }

        let mut participants = real.clone();
        let mut matches = Vec::new();

        if let Some(plan) = plan {
            let placeholder = inner.insert_participant(
                tournament.id,
                PLACEHOLDER_ALIAS.to_string(),
                None,
                InviteState::Placeholder,
                None,
            )?;

            let mut ai = Vec::with_capacity(plan.ai_count);
            for n in 0..plan.ai_count {
                ai.push(inner.insert_participant(
                    tournament.id,
                    format!("{}{}", AI_ALIAS_PREFIX, n + 1),
                    None,
                    InviteState::Ai,
                    None,
                )?);
            }

            let resolved = plan.resolve(&real, &ai, &placeholder)?;
            let ids: Vec<MatchId> = resolved.iter().map(|_| inner.next_id()).collect();

            for (idx, m) in resolved.iter().enumerate() {
                let stored = Match {
                    id: ids[idx],
                    tournament_id: tournament.id,
                    round: m.round,
                    player_a: m.player_a,
                    player_b: m.player_b,
                    status: MatchStatus::Pending,
                    winner_id: None,
                    score_a: None,
                    score_b: None,
                    scheduled_at: None,
                    feeds_into: m.feeds_into.map(|(target, slot)| (ids[target], slot)),
                };
                inner.matches.insert(stored.id, stored.clone());
                matches.push(stored);
            }

            participants.push(placeholder);
            participants.extend(ai);
        }

        Ok(CreatedTournament {
            tournament,
            participants,
            matches,
        })
    }

    async fn tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.tournaments.get(&id).cloned())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut tournaments: Vec<Tournament> = inner
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tournaments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tournaments)
    }

    async fn set_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.tournaments.get_mut(&id) {
            Some(t) => {
                t.status = status;
                Ok(())
            }
            None => Err(TournamentError::TournamentNotFound(id)),
        }
    }

    async fn participants(&self, id: TournamentId) -> TournamentResult<Vec<Participant>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut participants: Vec<Participant> = inner
            .participants
            .values()
            .filter(|p| p.tournament_id == id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| match (a.seed, b.seed) {
            (Some(x), Some(y)) => x.cmp(&y).then(a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        Ok(participants)
    }

    async fn insert_participant(
        &self,
        tournament_id: TournamentId,
        new: &NewParticipant,
        seed: Option<u32>,
    ) -> TournamentResult<Participant> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if !inner.tournaments.contains_key(&tournament_id) {
            return Err(TournamentError::TournamentNotFound(tournament_id));
        }
        inner.insert_participant(
            tournament_id,
            new.alias.clone(),
            new.user_id,
            new.invite_state,
            seed,
        )
    }

    async fn placeholder_id(&self, id: TournamentId) -> TournamentResult<Option<ParticipantId>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .participants
            .values()
            .find(|p| p.tournament_id == id && p.invite_state == InviteState::Placeholder)
            .map(|p| p.id))
    }

    async fn matches(&self, id: TournamentId) -> TournamentResult<Vec<Match>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut matches: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.tournament_id == id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.round.cmp(&b.round).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn match_by_id(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.matches.get(&id).cloned())
    }

    async fn finish_match(
        &self,
        id: MatchId,
        winner: ParticipantId,
        score_a: i32,
        score_b: i32,
    ) -> TournamentResult<bool> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.matches.get_mut(&id) {
            Some(m) if m.status == MatchStatus::Pending => {
                m.status = MatchStatus::Finished;
                m.winner_id = Some(winner);
                m.score_a = Some(score_a);
                m.score_b = Some(score_b);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(TournamentError::MatchNotFound(id)),
        }
    }

    async fn fill_slot(
        &self,
        id: MatchId,
        slot: MatchSlot,
        participant: ParticipantId,
        placeholder: ParticipantId,
    ) -> TournamentResult<bool> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let m = inner
            .matches
            .get_mut(&id)
            .ok_or(TournamentError::MatchNotFound(id))?;
        let target = match slot {
            MatchSlot::A => &mut m.player_a,
            MatchSlot::B => &mut m.player_b,
        };
        if *target == placeholder {
            *target = participant;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn health_check(&self) -> TournamentResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::builder::build_bracket;
    use crate::tournament::models::BracketKind;

    fn new_tournament(name: &str) -> NewTournament {
        NewTournament {
            name: name.to_string(),
            owner_id: 1,
            kind: BracketKind::SingleElimination,
            status: TournamentStatus::Ready,
            scheduled_at: None,
        }
    }

    fn entrants(n: usize) -> Vec<NewParticipant> {
        (0..n)
            .map(|i| NewParticipant::local(format!("player{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_create_tournament_with_bracket() {
        let store = InMemoryBracketStore::new();
        let plan = build_bracket(4).unwrap();
        let created = store
            .create_tournament(new_tournament("Cup"), &entrants(4), Some(&plan))
            .await
            .unwrap();

        // 4 entrants + placeholder, no AI needed for a full bracket.
        assert_eq!(created.participants.len(), 5);
        assert_eq!(created.matches.len(), 3);

        let stored = store.matches(created.tournament.id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].round, 1);
        assert_eq!(stored[2].round, 2);
    }

    #[tokio::test]
    async fn test_duplicate_alias_rejected() {
        let store = InMemoryBracketStore::new();
        let result = store
            .create_tournament(
                new_tournament("Cup"),
                &[
                    NewParticipant::local("same"),
                    NewParticipant::local("same"),
                ],
                None,
            )
            .await;
        assert!(matches!(result, Err(TournamentError::DuplicateAlias(_))));
    }

    #[tokio::test]
    async fn test_finish_match_wins_only_once() {
        let store = InMemoryBracketStore::new();
        let plan = build_bracket(2).unwrap();
        let created = store
            .create_tournament(new_tournament("Cup"), &entrants(2), Some(&plan))
            .await
            .unwrap();
        let m = &created.matches[0];

        assert!(store.finish_match(m.id, m.player_a, 11, 3).await.unwrap());
        assert!(!store.finish_match(m.id, m.player_b, 11, 3).await.unwrap());

        let stored = store.match_by_id(m.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Finished);
        assert_eq!(stored.winner_id, Some(m.player_a));
    }

    #[tokio::test]
    async fn test_fill_slot_only_overwrites_placeholder() {
        let store = InMemoryBracketStore::new();
        let plan = build_bracket(4).unwrap();
        let created = store
            .create_tournament(new_tournament("Cup"), &entrants(4), Some(&plan))
            .await
            .unwrap();
        let placeholder = store
            .placeholder_id(created.tournament.id)
            .await
            .unwrap()
            .unwrap();
        let final_match = created.matches.last().unwrap();
        let advancing = created.matches[0].player_a;

        assert!(
            store
                .fill_slot(final_match.id, MatchSlot::A, advancing, placeholder)
                .await
                .unwrap()
        );
        // Second write to the same slot loses.
        assert!(
            !store
                .fill_slot(final_match.id, MatchSlot::A, advancing + 1, placeholder)
                .await
                .unwrap()
        );

        let stored = store.match_by_id(final_match.id).await.unwrap().unwrap();
        assert_eq!(stored.player_a, advancing);
        assert_eq!(stored.player_b, placeholder);
    }

    #[tokio::test]
    async fn test_participants_ordered_by_seed_then_id() {
        let store = InMemoryBracketStore::new();
        let plan = build_bracket(3).unwrap();
        let created = store
            .create_tournament(new_tournament("Cup"), &entrants(3), Some(&plan))
            .await
            .unwrap();

        let participants = store.participants(created.tournament.id).await.unwrap();
        let seeds: Vec<Option<u32>> = participants.iter().map(|p| p.seed).collect();
        assert_eq!(seeds, vec![Some(1), Some(2), Some(3), None, None]);
    }

    #[tokio::test]
    async fn test_late_participant_insertion() {
        let store = InMemoryBracketStore::new();
        let created = store
            .create_tournament(new_tournament("Cup"), &entrants(1), None)
            .await
            .unwrap();

        let added = store
            .insert_participant(
                created.tournament.id,
                &NewParticipant::local("latecomer"),
                Some(2),
            )
            .await
            .unwrap();
        assert_eq!(added.seed, Some(2));

        let missing = store
            .insert_participant(9999, &NewParticipant::local("nobody"), None)
            .await;
        assert!(matches!(
            missing,
            Err(TournamentError::TournamentNotFound(9999))
        ));
    }
}

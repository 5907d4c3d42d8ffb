//! Entity-store trait definition and its PostgreSQL implementation.
//!
//! The engine talks to persistence through [`BracketStore`], which keeps
//! the bracket logic testable against the in-memory store and lets the
//! server pick its backend at startup. The two mutating hot paths,
//! [`BracketStore::finish_match`] and [`BracketStore::fill_slot`], are
//! conditional single-row updates: the returned `bool` tells the caller
//! whether this invocation won the transition, which is what serializes
//! concurrent result submissions without read-modify-write cycles.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::tournament::builder::BracketPlan;
use crate::tournament::errors::TournamentResult;
use crate::tournament::models::{
    AI_ALIAS_PREFIX, BracketKind, CreatedTournament, InviteState, Match, MatchId, MatchSlot,
    MatchStatus, NewParticipant, NewTournament, PLACEHOLDER_ALIAS, Participant, ParticipantId,
    Tournament, TournamentId, TournamentStatus,
};

/// Persistence contract for tournaments, participants, and matches
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Atomically create a tournament, its participants, and its bracket.
    ///
    /// `entrants` is the seed-ordered real participant list. When `plan`
    /// is given, the placeholder sentinel, the plan's AI participants, and
    /// every planned match (with its feeds-into link) are written in the
    /// same transaction. With `plan == None` only the tournament row and
    /// entrants are stored.
    async fn create_tournament(
        &self,
        new: NewTournament,
        entrants: &[NewParticipant],
        plan: Option<&BracketPlan>,
    ) -> TournamentResult<CreatedTournament>;

    /// Fetch a tournament by id
    async fn tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// List tournaments, optionally filtered by status, newest first
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>>;

    /// Overwrite a tournament's status (driven by the external
    /// status-transition policy, not by the engine)
    async fn set_status(&self, id: TournamentId, status: TournamentStatus)
    -> TournamentResult<()>;

    /// Participants of a tournament, ordered by seed then id
    async fn participants(&self, id: TournamentId) -> TournamentResult<Vec<Participant>>;

    /// Insert a single participant after construction (late-discovered
    /// byes; not used by the static creation path)
    async fn insert_participant(
        &self,
        tournament_id: TournamentId,
        new: &NewParticipant,
        seed: Option<u32>,
    ) -> TournamentResult<Participant>;

    /// Id of the tournament's placeholder sentinel, if one exists
    async fn placeholder_id(&self, id: TournamentId) -> TournamentResult<Option<ParticipantId>>;

    /// Matches of a tournament, ordered by round then id
    async fn matches(&self, id: TournamentId) -> TournamentResult<Vec<Match>>;

    /// Fetch a match by id
    async fn match_by_id(&self, id: MatchId) -> TournamentResult<Option<Match>>;

    /// Transition a match PENDING -> FINISHED, storing winner and scores.
    ///
    /// Returns `false` when the match was already finished; at most one
    /// caller ever observes `true` for a given match.
    async fn finish_match(
        &self,
        id: MatchId,
        winner: ParticipantId,
        score_a: i32,
        score_b: i32,
    ) -> TournamentResult<bool>;

    /// Write `participant` into one slot of a match, but only while that
    /// slot still holds the placeholder sentinel.
    ///
    /// Returns `false` when the slot was already decided.
    async fn fill_slot(
        &self,
        id: MatchId,
        slot: MatchSlot,
        participant: ParticipantId,
        placeholder: ParticipantId,
    ) -> TournamentResult<bool>;

    /// Probe backend liveness
    async fn health_check(&self) -> TournamentResult<()>;
}

/// PostgreSQL implementation of [`BracketStore`]
pub struct PgBracketStore {
    pool: PgPool,
}

impl PgBracketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn tournament_from_row(row: &PgRow) -> Tournament {
    Tournament {
        id: row.get("id"),
        name: row.get("name"),
        owner_id: row.get("owner_id"),
        kind: BracketKind::from_db_str(row.get("kind")),
        status: TournamentStatus::from_db_str(row.get("status")),
        scheduled_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("scheduled_at")
            .map(|dt| dt.and_utc()),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn participant_from_row(row: &PgRow) -> Participant {
    Participant {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        alias: row.get("alias"),
        user_id: row.get("user_id"),
        invite_state: InviteState::from_db_str(row.get("invite_state")),
        seed: row.get::<Option<i32>, _>("seed").map(|s| s as u32),
        joined_at: row.get::<chrono::NaiveDateTime, _>("joined_at").and_utc(),
    }
}

fn match_from_row(row: &PgRow) -> Match {
    let feeds_match: Option<MatchId> = row.get("feeds_into_match_id");
    let feeds_slot: Option<String> = row.get("feeds_into_slot");
    Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round: row.get::<i32, _>("round") as u32,
        player_a: row.get("player_a"),
        player_b: row.get("player_b"),
        status: MatchStatus::from_db_str(row.get("status")),
        winner_id: row.get("winner_id"),
        score_a: row.get("score_a"),
        score_b: row.get("score_b"),
        scheduled_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("scheduled_at")
            .map(|dt| dt.and_utc()),
        feeds_into: feeds_match
            .zip(feeds_slot)
            .map(|(id, slot)| (id, MatchSlot::from_db_str(&slot))),
    }
}

const SELECT_MATCH: &str = "SELECT id, tournament_id, round, player_a, player_b, status, \
     winner_id, score_a, score_b, scheduled_at, feeds_into_match_id, feeds_into_slot \
     FROM matches";

const SELECT_PARTICIPANT: &str =
    "SELECT id, tournament_id, alias, user_id, invite_state, seed, joined_at FROM participants";

const SELECT_TOURNAMENT: &str =
    "SELECT id, name, owner_id, kind, status, scheduled_at, created_at FROM tournaments";

async fn insert_participant_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    tournament_id: TournamentId,
    alias: &str,
    user_id: Option<i64>,
    invite_state: InviteState,
    seed: Option<u32>,
) -> Result<Participant, sqlx::Error> {
    let row = sqlx::query(
        "INSERT INTO participants (tournament_id, alias, user_id, invite_state, seed) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, tournament_id, alias, user_id, invite_state, seed, joined_at",
    )
    .bind(tournament_id)
    .bind(alias)
    .bind(user_id)
    .bind(invite_state.as_db_str())
    .bind(seed.map(|s| s as i32))
    .fetch_one(&mut **tx)
    .await?;
    Ok(participant_from_row(&row))
}

#[async_trait]
impl BracketStore for PgBracketStore {
    async fn create_tournament(
        &self,
        new: NewTournament,
        entrants: &[NewParticipant],
        plan: Option<&BracketPlan>,
    ) -> TournamentResult<CreatedTournament> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO tournaments (name, owner_id, kind, status, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, name, owner_id, kind, status, scheduled_at, created_at",
        )
        .bind(&new.name)
        .bind(new.owner_id)
        .bind(new.kind.as_db_str())
        .bind(new.status.as_db_str())
        .bind(new.scheduled_at.map(|dt| dt.naive_utc()))
        .fetch_one(&mut *tx)
        .await?;
        let tournament = tournament_from_row(&row);

        let mut real = Vec::with_capacity(entrants.len());
        for (i, entrant) in entrants.iter().enumerate() {
            real.push(
                insert_participant_tx(
                    &mut tx,
                    tournament.id,
                    &entrant.alias,
                    entrant.user_id,
                    entrant.invite_state,
                    Some(i as u32 + 1),
                )
                .await?,
            );
        }

        let mut participants = real.clone();
        let mut matches = Vec::new();

        if let Some(plan) = plan {
            let placeholder = insert_participant_tx(
                &mut tx,
                tournament.id,
                PLACEHOLDER_ALIAS,
                None,
                InviteState::Placeholder,
                None,
            )
            .await?;

            let mut ai = Vec::with_capacity(plan.ai_count);
            for n in 0..plan.ai_count {
                ai.push(
                    insert_participant_tx(
                        &mut tx,
                        tournament.id,
                        &format!("{}{}", AI_ALIAS_PREFIX, n + 1),
                        None,
                        InviteState::Ai,
                        None,
                    )
                    .await?,
                );
            }

            let resolved = plan.resolve(&real, &ai, &placeholder)?;

            // Insert later rounds first so feeds-into targets already have
            // ids, keeping each round's matches in pairing order.
            let mut ids: Vec<Option<MatchId>> = vec![None; resolved.len()];
            for round in (1..=plan.rounds).rev() {
                for (idx, m) in resolved.iter().enumerate().filter(|(_, m)| m.round == round) {
                    let feeds_id = m.feeds_into.map(|(target, _)| {
                        ids[target].expect("later rounds are inserted before their feeders")
                    });
                    let feeds_slot = m.feeds_into.map(|(_, slot)| slot.as_db_str());
                    let row = sqlx::query(
                        "INSERT INTO matches (tournament_id, round, player_a, player_b, \
                         status, feeds_into_match_id, feeds_into_slot) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
                    )
                    .bind(tournament.id)
                    .bind(m.round as i32)
                    .bind(m.player_a)
                    .bind(m.player_b)
                    .bind(MatchStatus::Pending.as_db_str())
                    .bind(feeds_id)
                    .bind(feeds_slot)
                    .fetch_one(&mut *tx)
                    .await?;
                    ids[idx] = Some(row.get::<MatchId, _>("id"));
                }
            }

            for (idx, m) in resolved.iter().enumerate() {
                matches.push(Match {
                    id: ids[idx].expect("every planned match was inserted"),
                    tournament_id: tournament.id,
                    round: m.round,
                    player_a: m.player_a,
                    player_b: m.player_b,
                    status: MatchStatus::Pending,
                    winner_id: None,
                    score_a: None,
                    score_b: None,
                    scheduled_at: None,
                    feeds_into: m
                        .feeds_into
                        .map(|(target, slot)| (ids[target].expect("inserted"), slot)),
                });
            }

            participants.push(placeholder);
            participants.extend(ai);
        }

        tx.commit().await?;

        Ok(CreatedTournament {
            tournament,
            participants,
            matches,
        })
    }

    async fn tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(&format!("{SELECT_TOURNAMENT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(tournament_from_row))
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let rows = if let Some(status) = status {
            sqlx::query(&format!(
                "{SELECT_TOURNAMENT} WHERE status = $1 ORDER BY created_at DESC, id DESC"
            ))
            .bind(status.as_db_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "{SELECT_TOURNAMENT} ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows.iter().map(tournament_from_row).collect())
    }

    async fn set_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<()> {
        sqlx::query("UPDATE tournaments SET status = $1 WHERE id = $2")
            .bind(status.as_db_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn participants(&self, id: TournamentId) -> TournamentResult<Vec<Participant>> {
        let rows = sqlx::query(&format!(
            "{SELECT_PARTICIPANT} WHERE tournament_id = $1 ORDER BY seed NULLS LAST, id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(participant_from_row).collect())
    }

    async fn insert_participant(
        &self,
        tournament_id: TournamentId,
        new: &NewParticipant,
        seed: Option<u32>,
    ) -> TournamentResult<Participant> {
        let mut tx = self.pool.begin().await?;
        let participant = insert_participant_tx(
            &mut tx,
            tournament_id,
            &new.alias,
            new.user_id,
            new.invite_state,
            seed,
        )
        .await?;
        tx.commit().await?;
        Ok(participant)
    }

    async fn placeholder_id(&self, id: TournamentId) -> TournamentResult<Option<ParticipantId>> {
        let row = sqlx::query(
            "SELECT id FROM participants WHERE tournament_id = $1 AND invite_state = $2",
        )
        .bind(id)
        .bind(InviteState::Placeholder.as_db_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.get("id")))
    }

    async fn matches(&self, id: TournamentId) -> TournamentResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "{SELECT_MATCH} WHERE tournament_id = $1 ORDER BY round, id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn match_by_id(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(&format!("{SELECT_MATCH} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(match_from_row))
    }

    async fn finish_match(
        &self,
        id: MatchId,
        winner: ParticipantId,
        score_a: i32,
        score_b: i32,
    ) -> TournamentResult<bool> {
        let result = sqlx::query(
            "UPDATE matches SET status = $1, winner_id = $2, score_a = $3, score_b = $4 \
             WHERE id = $5 AND status = $6",
        )
        .bind(MatchStatus::Finished.as_db_str())
        .bind(winner)
        .bind(score_a)
        .bind(score_b)
        .bind(id)
        .bind(MatchStatus::Pending.as_db_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn fill_slot(
        &self,
        id: MatchId,
        slot: MatchSlot,
        participant: ParticipantId,
        placeholder: ParticipantId,
    ) -> TournamentResult<bool> {
        let query = match slot {
            MatchSlot::A => {
                "UPDATE matches SET player_a = $1 WHERE id = $2 AND player_a = $3"
            }
            MatchSlot::B => {
                "UPDATE matches SET player_b = $1 WHERE id = $2 AND player_b = $3"
            }
        };
        let result = sqlx::query(query)
            .bind(participant)
            .bind(id)
            .bind(placeholder)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn health_check(&self) -> TournamentResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

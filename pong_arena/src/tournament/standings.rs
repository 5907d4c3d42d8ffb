//! Final standings computation.
//!
//! Standings are a pure fold over a tournament's participant and match
//! sets: each participant accumulates the points they scored across every
//! finished match, the highest round they occupied a slot in, and (for the
//! winner of the highest-round match) the champion flag. The placeholder
//! sentinel is excluded entirely; AI opponents rank like anyone else.

use std::collections::HashMap;

use serde::Serialize;

use super::models::{InviteState, Match, MatchStatus, Participant, ParticipantId};

/// One row of the final standings
#[derive(Debug, Clone, Serialize)]
pub struct StandingsEntry {
    /// 1-based place; tied entries share the rank of the first member of
    /// their tie group
    pub rank: u32,
    pub participant_id: ParticipantId,
    pub alias: String,
    pub invite_state: InviteState,
    /// Sum of the participant's own score across finished matches
    pub total_score: i64,
    /// Highest round in which the participant occupied a slot
    pub max_round: u32,
    /// Winner of the highest-round match
    pub is_winner: bool,
}

/// Compute ranked standings from a tournament's participants and matches.
///
/// Ordering: winner first, then by `max_round` descending, then by
/// `total_score` descending. Entries equal on all criteria share a rank;
/// the next distinct group resumes at its positional rank.
pub fn compute_standings(participants: &[Participant], matches: &[Match]) -> Vec<StandingsEntry> {
    let mut totals: HashMap<ParticipantId, i64> = HashMap::new();
    let mut rounds: HashMap<ParticipantId, u32> = HashMap::new();

    for m in matches {
        for player in [m.player_a, m.player_b] {
            let entry = rounds.entry(player).or_insert(0);
            *entry = (*entry).max(m.round);
        }
        if m.status == MatchStatus::Finished {
            if let (Some(a), Some(b)) = (m.score_a, m.score_b) {
                *totals.entry(m.player_a).or_insert(0) += i64::from(a);
                *totals.entry(m.player_b).or_insert(0) += i64::from(b);
            }
        }
    }

    // The champion is the winner of the highest-round match, and only once
    // that match has finished.
    let champion = matches
        .iter()
        .max_by_key(|m| m.round)
        .filter(|m| m.status == MatchStatus::Finished)
        .and_then(|m| m.winner_id);

    let mut entries: Vec<StandingsEntry> = participants
        .iter()
        .filter(|p| !p.is_placeholder())
        .map(|p| StandingsEntry {
            rank: 0,
            participant_id: p.id,
            alias: p.alias.clone(),
            invite_state: p.invite_state,
            total_score: totals.get(&p.id).copied().unwrap_or(0),
            max_round: rounds.get(&p.id).copied().unwrap_or(0),
            is_winner: champion == Some(p.id),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.is_winner
            .cmp(&a.is_winner)
            .then(b.max_round.cmp(&a.max_round))
            .then(b.total_score.cmp(&a.total_score))
    });

    let mut prev: Option<(bool, u32, i64, u32)> = None;
    for (i, entry) in entries.iter_mut().enumerate() {
        let key = (entry.is_winner, entry.max_round, entry.total_score);
        entry.rank = match prev {
            Some((w, r, s, rank)) if (w, r, s) == key => rank,
            _ => i as u32 + 1,
        };
        prev = Some((key.0, key.1, key.2, entry.rank));
    }

    entries
}

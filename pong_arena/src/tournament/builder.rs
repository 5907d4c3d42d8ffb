//! Seeding and bracket construction.
//!
//! The builder is a pure function from a participant count to a
//! [`BracketPlan`]: a list of construction commands (which AI opponents to
//! create, which matches to insert, and how matches feed into the next
//! round). The entity store applies a plan atomically; nothing here performs
//! I/O, which keeps the seeding algorithm independently testable.
//!
//! Seeding follows standard bracket order: seed 1 is paired with seed N,
//! seed 2 with seed N-1, and so on, arranged so the top two seeds can only
//! meet in the final. When the field is smaller than the bracket size, the
//! missing bottom seeds become byes, so the top seeds are the ones that
//! receive AI opponents.

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    MAX_PARTICIPANTS, MIN_BRACKET_SIZE, Match, MatchSlot, Participant, ParticipantId,
};

/// Occupant of a planned match slot, before ids exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedSlot {
    /// Index into the seed-ordered entrant list
    Entrant(usize),
    /// 0-based ordinal of an AI participant to create
    Ai(usize),
    /// The per-tournament placeholder sentinel
    Placeholder,
}

/// A match to insert, with slots and downstream link expressed in
/// plan-local terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMatch {
    /// 1-based round number
    pub round: u32,
    pub slot_a: PlannedSlot,
    pub slot_b: PlannedSlot,
    /// Plan index of the next-round match this one feeds, and which slot;
    /// `None` only for the final
    pub feeds_into: Option<(usize, MatchSlot)>,
}

/// Construction commands for a complete bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPlan {
    /// Bracket size: next power of two >= entrant count
    pub size: usize,
    /// Total number of rounds, down to exactly one final match
    pub rounds: u32,
    /// How many AI participants must be created for round-1 byes
    pub ai_count: usize,
    /// Matches in round order; position within a round is pairing order
    pub matches: Vec<PlannedMatch>,
}

/// A planned match with slots resolved to stored participant ids.
///
/// `feeds_into` still refers to a plan index; the store maps it to the
/// inserted match's id.
#[derive(Debug, Clone)]
pub struct ResolvedMatch {
    pub round: u32,
    pub player_a: ParticipantId,
    pub player_b: ParticipantId,
    pub feeds_into: Option<(usize, MatchSlot)>,
}

/// Bracket-order seed positions for a power-of-two bracket.
///
/// Built by the usual doubling recursion: `[1]`, then each seed `x` in a
/// bracket of size `n` expands to the pair `(x, 2n+1-x)`. For size 8 this
/// yields `[1, 8, 4, 5, 2, 7, 3, 6]`, read two at a time as the round-1
/// pairings.
pub fn seed_positions(size: usize) -> Vec<u32> {
    debug_assert!(size.is_power_of_two());
    let mut order = vec![1u32];
    let mut n = 1usize;
    while n < size {
        n *= 2;
        let mut next = Vec::with_capacity(n);
        for &seed in &order {
            next.push(seed);
            next.push(n as u32 + 1 - seed);
        }
        order = next;
    }
    order
}

/// Build the construction plan for `entrant_count` seed-ordered entrants.
///
/// Round 1 pairs the padded seed list two at a time; a pairing against a
/// missing seed becomes a playable match against a fresh AI participant,
/// never an auto-advance. Every later round is planned with both slots on
/// the placeholder sentinel, halving the match count down to exactly one
/// final match.
pub fn build_bracket(entrant_count: usize) -> TournamentResult<BracketPlan> {
    if entrant_count < MIN_BRACKET_SIZE {
        return Err(TournamentError::Construction(format!(
            "bracket needs at least {MIN_BRACKET_SIZE} entrants, got {entrant_count}"
        )));
    }
    if entrant_count > MAX_PARTICIPANTS {
        return Err(TournamentError::Construction(format!(
            "bracket cannot hold {entrant_count} entrants (max {MAX_PARTICIPANTS})"
        )));
    }

    let size = entrant_count.next_power_of_two();
    let rounds = size.trailing_zeros();
    let positions = seed_positions(size);

    let mut matches = Vec::with_capacity(size - 1);
    let mut ai_count = 0usize;

    // Round 1: pair the padded seed order two at a time.
    for pair in positions.chunks(2) {
        let a = pair[0] as usize;
        let b = pair[1] as usize;
        let (slot_a, slot_b) = match (a <= entrant_count, b <= entrant_count) {
            (true, true) => (PlannedSlot::Entrant(a - 1), PlannedSlot::Entrant(b - 1)),
            (true, false) => {
                let ai = PlannedSlot::Ai(ai_count);
                ai_count += 1;
                (PlannedSlot::Entrant(a - 1), ai)
            }
            (false, true) => {
                let ai = PlannedSlot::Ai(ai_count);
                ai_count += 1;
                (ai, PlannedSlot::Entrant(b - 1))
            }
            // Cannot happen while padding only extends to the next power of
            // two: every pairing contains exactly one seed from the top
            // half, and the top half is always fully populated.
            (false, false) => {
                return Err(TournamentError::Construction(format!(
                    "seeds {a} and {b} are both byes"
                )));
            }
        };
        matches.push(PlannedMatch {
            round: 1,
            slot_a,
            slot_b,
            feeds_into: None,
        });
    }

    // Later rounds: halve the match count each round. The loop keeps
    // emitting after the count reaches one so the final's single match is
    // part of the plan rather than falling off the end.
    let mut in_round = size / 2;
    let mut round = 1u32;
    while in_round > 1 {
        in_round /= 2;
        round += 1;
        for _ in 0..in_round {
            matches.push(PlannedMatch {
                round,
                slot_a: PlannedSlot::Placeholder,
                slot_b: PlannedSlot::Placeholder,
                feeds_into: None,
            });
        }
    }

    // Link every non-final match to the slot it decides: match i of a
    // round feeds slot A of match i/2 in the next round when i is even,
    // slot B when i is odd.
    let mut offset = 0usize;
    let mut count = size / 2;
    for _ in 1..rounds {
        let next_offset = offset + count;
        for i in 0..count {
            let slot = if i % 2 == 0 { MatchSlot::A } else { MatchSlot::B };
            matches[offset + i].feeds_into = Some((next_offset + i / 2, slot));
        }
        offset = next_offset;
        count /= 2;
    }

    Ok(BracketPlan {
        size,
        rounds,
        ai_count,
        matches,
    })
}

impl BracketPlan {
    /// Resolve planned slots to stored participant ids.
    ///
    /// `entrants` must be the real participants in seed order, `ai` the AI
    /// participants in creation order, and `placeholder` the tournament's
    /// sentinel row.
    pub fn resolve(
        &self,
        entrants: &[Participant],
        ai: &[Participant],
        placeholder: &Participant,
    ) -> TournamentResult<Vec<ResolvedMatch>> {
        let lookup = |slot: PlannedSlot| -> TournamentResult<ParticipantId> {
            match slot {
                PlannedSlot::Entrant(i) => entrants
                    .get(i)
                    .map(|p| p.id)
                    .ok_or_else(|| TournamentError::Construction(format!("missing entrant {i}"))),
                PlannedSlot::Ai(i) => ai
                    .get(i)
                    .map(|p| p.id)
                    .ok_or_else(|| TournamentError::Construction(format!("missing AI {i}"))),
                PlannedSlot::Placeholder => Ok(placeholder.id),
            }
        };

        self.matches
            .iter()
            .map(|m| {
                Ok(ResolvedMatch {
                    round: m.round,
                    player_a: lookup(m.slot_a)?,
                    player_b: lookup(m.slot_b)?,
                    feeds_into: m.feeds_into,
                })
            })
            .collect()
    }

    /// Number of matches planned for `round` (1-based)
    pub fn matches_in_round(&self, round: u32) -> usize {
        self.matches.iter().filter(|m| m.round == round).count()
    }
}

/// Check the structural invariants of a stored bracket.
///
/// Used by tests and by the manager as a cheap post-construction assertion:
/// each round holds half the matches of the previous one, the final round
/// holds exactly one, and every round-1 slot is a real entrant or an AI
/// opponent.
pub fn verify_bracket_shape(matches: &[Match], size: usize) -> TournamentResult<()> {
    let rounds = size.trailing_zeros();
    for round in 1..=rounds {
        let expected = size >> round;
        let actual = matches.iter().filter(|m| m.round == round).count();
        if actual != expected {
            return Err(TournamentError::Construction(format!(
                "round {round} has {actual} matches, expected {expected}"
            )));
        }
    }
    if matches.iter().any(|m| m.round > rounds || m.round == 0) {
        return Err(TournamentError::Construction(
            "match outside the planned rounds".to_string(),
        ));
    }
    Ok(())
}

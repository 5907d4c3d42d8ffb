//! Tournament data models for single-elimination brackets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

/// Participant ID type
pub type ParticipantId = i64;

/// Match ID type
pub type MatchId = i64;

/// Platform user ID type (owned by the accounts subsystem)
pub type UserId = i64;

/// Upper bound on real participants per tournament
pub const MAX_PARTICIPANTS: usize = 64;

/// Minimum number of real participants for bracket construction to run
pub const MIN_BRACKET_SIZE: usize = 2;

/// Prefix reserved for synthetic participants; user aliases may not start with it
pub const RESERVED_ALIAS_PREFIX: char = '@';

/// Alias of the per-tournament placeholder sentinel
pub const PLACEHOLDER_ALIAS: &str = "@TBD";

/// Alias prefix for AI participants substituted for byes (`@AI-1`, `@AI-2`, ...)
pub const AI_ALIAS_PREFIX: &str = "@AI-";

/// Tournament lifecycle status.
///
/// Status transitions are owned by an external policy; the engine only
/// stores the value it is handed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Created but bracket not yet generated
    Draft,
    /// Bracket generated, waiting to start
    Ready,
    /// Matches being played
    Running,
    /// Final match finished
    Completed,
}

impl TournamentStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Ready => "ready",
            TournamentStatus::Running => "running",
            TournamentStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "ready" => TournamentStatus::Ready,
            "running" => TournamentStatus::Running,
            "completed" => TournamentStatus::Completed,
            _ => TournamentStatus::Draft,
        }
    }
}

/// Bracket kind (only single elimination is supported)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketKind {
    SingleElimination,
}

impl BracketKind {
    pub fn as_db_str(self) -> &'static str {
        match self {
            BracketKind::SingleElimination => "single_elimination",
        }
    }

    pub fn from_db_str(_s: &str) -> Self {
        BracketKind::SingleElimination
    }
}

/// Invite/membership state of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteState {
    /// Entered locally by the tournament owner
    Local,
    /// Invited account, not yet accepted
    Invited,
    /// Invited account that accepted
    Accepted,
    /// Per-tournament sentinel occupying not-yet-decided slots
    Placeholder,
    /// Automatic opponent substituted for a bye
    Ai,
}

impl InviteState {
    pub fn as_db_str(self) -> &'static str {
        match self {
            InviteState::Local => "local",
            InviteState::Invited => "invited",
            InviteState::Accepted => "accepted",
            InviteState::Placeholder => "placeholder",
            InviteState::Ai => "ai",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "invited" => InviteState::Invited,
            "accepted" => InviteState::Accepted,
            "placeholder" => InviteState::Placeholder,
            "ai" => InviteState::Ai,
            _ => InviteState::Local,
        }
    }

    /// Whether this state is valid for a submitted (real) entrant
    pub fn is_real(self) -> bool {
        matches!(
            self,
            InviteState::Local | InviteState::Invited | InviteState::Accepted
        )
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Pending,
    Finished,
}

impl MatchStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Finished => "finished",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "finished" => MatchStatus::Finished,
            _ => MatchStatus::Pending,
        }
    }
}

/// One of the two player slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSlot {
    A,
    B,
}

impl MatchSlot {
    pub fn as_db_str(self) -> &'static str {
        match self {
            MatchSlot::A => "a",
            MatchSlot::B => "b",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "b" => MatchSlot::B,
            _ => MatchSlot::A,
        }
    }
}

/// A stored tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    /// Owning user (accounts subsystem reference)
    pub owner_id: UserId,
    pub kind: BracketKind,
    pub status: TournamentStatus,
    /// Optional scheduled start time, stored but never interpreted here
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A stored participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    /// Display alias, unique within the tournament (case-sensitive)
    pub alias: String,
    /// Linked account, if any
    pub user_id: Option<UserId>,
    pub invite_state: InviteState,
    /// 1-based seed; `None` for synthetic participants
    pub seed: Option<u32>,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn is_placeholder(&self) -> bool {
        self.invite_state == InviteState::Placeholder
    }
}

/// A stored match.
///
/// Player slots always hold a participant reference: a real entrant or AI
/// opponent in round 1, the placeholder sentinel in not-yet-decided slots
/// of later rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1-based; round 1 holds the first real games
    pub round: u32,
    pub player_a: ParticipantId,
    pub player_b: ParticipantId,
    pub status: MatchStatus,
    /// Winner, set exactly once; always one of the two slot occupants
    pub winner_id: Option<ParticipantId>,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Downstream match and slot this match's winner advances into;
    /// `None` only for the final. Assigned at construction time.
    pub feeds_into: Option<(MatchId, MatchSlot)>,
}

impl Match {
    /// Whether `participant` occupies one of the two slots
    pub fn has_player(&self, participant: ParticipantId) -> bool {
        self.player_a == participant || self.player_b == participant
    }

    pub fn is_final(&self) -> bool {
        self.feeds_into.is_none()
    }
}

/// Input for creating a tournament row
#[derive(Debug, Clone)]
pub struct NewTournament {
    pub name: String,
    pub owner_id: UserId,
    pub kind: BracketKind,
    pub status: TournamentStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Input for creating a participant row
#[derive(Debug, Clone, Deserialize)]
pub struct NewParticipant {
    pub alias: String,
    pub user_id: Option<UserId>,
    pub invite_state: InviteState,
}

impl NewParticipant {
    /// A locally-entered participant with no linked account
    pub fn local(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            user_id: None,
            invite_state: InviteState::Local,
        }
    }
}

/// Everything written by an atomic tournament creation
#[derive(Debug, Clone)]
pub struct CreatedTournament {
    pub tournament: Tournament,
    /// All participants: real entrants (by seed), then synthetics
    pub participants: Vec<Participant>,
    /// All matches, ordered by round then position
    pub matches: Vec<Match>,
}

/// A match slot resolved to its occupant, as served to clients
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub participant_id: ParticipantId,
    pub alias: String,
    pub invite_state: InviteState,
}

/// A match with both slots resolved, as served to clients
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub id: MatchId,
    pub round: u32,
    pub player_a: SlotView,
    pub player_b: SlotView,
    pub status: MatchStatus,
    pub winner_id: Option<ParticipantId>,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Full bracket state for a tournament
#[derive(Debug, Clone, Serialize)]
pub struct BracketView {
    pub tournament: Tournament,
    /// Ordered by seed, then id
    pub participants: Vec<Participant>,
    /// Ordered by round, then id
    pub matches: Vec<MatchView>,
}

/// Outcome of a successful result submission
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The finished match, with winner and scores set
    pub finished: Match,
    /// Slot of the next-round match the winner was advanced into
    pub propagated_to: Option<(MatchId, MatchSlot)>,
    /// True when the finished match was the final
    pub bracket_complete: bool,
}

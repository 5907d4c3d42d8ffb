//! Tournament error types.

use thiserror::Error;

use super::models::{InviteState, MatchId, ParticipantId, TournamentId};

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Tournament name is empty or whitespace-only
    #[error("Invalid tournament name: {0:?}")]
    InvalidName(String),

    /// Participant list is empty
    #[error("Participant list is empty")]
    NoParticipants,

    /// Participant list exceeds the bracket limit
    #[error("Too many participants: {count} (max {max})")]
    TooManyParticipants { count: usize, max: usize },

    /// Alias is empty or whitespace-only
    #[error("Invalid alias: {0:?}")]
    InvalidAlias(String),

    /// Alias collides with the reserved synthetic-participant prefix
    #[error("Alias uses reserved prefix: {0:?}")]
    ReservedAlias(String),

    /// Alias used more than once within the tournament
    #[error("Duplicate alias: {0:?}")]
    DuplicateAlias(String),

    /// Entrant submitted with a synthetic invite state
    #[error("Invite state {0:?} is not valid for an entrant")]
    InvalidInviteState(InviteState),

    /// Submitted winner is not one of the match's slot occupants
    #[error("Participant {winner} is not a player of match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner: ParticipantId,
    },

    /// Finishing a match requires both scores
    #[error("Both scores are required to finish a match")]
    ScoresRequired,

    /// Scores must be non-negative
    #[error("Invalid score: {0}")]
    InvalidScore(i32),

    /// Result submitted against a match still waiting on an earlier round
    #[error("Match {0} still has an undecided slot")]
    MatchNotReady(MatchId),

    /// Result submitted against an already-finished match
    #[error("Match {0} is already finished")]
    AlreadyFinished(MatchId),

    /// Bracket size invariant violated; indicates a builder bug
    #[error("Bracket construction failed: {0}")]
    Construction(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TournamentError {
    /// Get a client-safe error message that doesn't leak internals.
    ///
    /// Database and construction errors are sanitized; construction errors
    /// can only arise from an engine bug, never from client input.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) | TournamentError::Construction(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Whether the error indicates an internal failure rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            TournamentError::Database(_) | TournamentError::Construction(_)
        )
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_sanitizes_internal_errors() {
        let err = TournamentError::Construction("uneven round".to_string());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.is_internal());
    }

    #[test]
    fn test_client_message_keeps_user_errors() {
        let err = TournamentError::InvalidWinner {
            match_id: 7,
            winner: 42,
        };
        assert!(err.client_message().contains("42"));
        assert!(!err.is_internal());

        let err = TournamentError::AlreadyFinished(7);
        assert!(err.client_message().contains('7'));
    }
}

//! # Pong Arena
//!
//! Tournament bracket engine for a browser-based multiplayer Pong platform.
//!
//! The engine owns the tournament data model and the three operations of a
//! single-elimination bracket's life:
//!
//! - **Construction**: an ordered entrant list is seeded into a
//!   power-of-two bracket; byes are converted into playable matches
//!   against AI opponents, and every later round is materialized up front
//!   with a placeholder sentinel in its undecided slots.
//! - **Progression**: match results are recorded exactly once, and each
//!   winner advances along a feeds-into link assigned at construction
//!   time.
//! - **Standings**: final placement is derived from the match set with
//!   deterministic tie-breaks (deepest round reached, then total points).
//!
//! Everything else the platform does — accounts, sessions, chat, the
//! realtime game loop that actually plays a match — lives in external
//! collaborators. They drive the engine through
//! [`tournament::TournamentManager`] and a [`store::BracketStore`]
//! backend.
//!
//! ## Core Modules
//!
//! - [`tournament`]: models, bracket builder, result recording, standings
//! - [`store`]: entity-store trait with PostgreSQL and in-memory backends

/// Tournament engine: models, bracket construction, results, standings.
pub mod tournament;
pub use tournament::{
    BracketKind, BracketView, CreateTournament, CreatedTournament, InviteState, Match, MatchId,
    MatchSlot, MatchStatus, NewParticipant, Participant, ParticipantId, StandingsEntry,
    SubmitOutcome, Tournament, TournamentError, TournamentId, TournamentManager, TournamentResult,
    TournamentStatus, UserId,
};

/// Entity store backends and connection pooling.
pub mod store;
pub use store::{BracketStore, Database, DatabaseConfig, InMemoryBracketStore, PgBracketStore};

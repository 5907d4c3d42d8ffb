//! Tournament module: single-elimination bracket generation and progression.
//!
//! This module provides the bracket engine:
//! - Tournament creation with seeded round-1 pairing
//! - AI substitution for byes (no auto-advances)
//! - Result recording with winner propagation into later rounds
//! - Final standings with deterministic tie-breaks
//!
//! ## Example
//!
//! ```no_run
//! use pong_arena::store::InMemoryBracketStore;
//! use pong_arena::tournament::{
//!     BracketKind, CreateTournament, NewParticipant, TournamentManager,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(InMemoryBracketStore::new()));
//!
//!     let created = manager
//!         .create_tournament(CreateTournament {
//!             name: "Friday Cup".to_string(),
//!             owner_id: 1,
//!             kind: BracketKind::SingleElimination,
//!             entrants: vec![
//!                 NewParticipant::local("ada"),
//!                 NewParticipant::local("grace"),
//!                 NewParticipant::local("alan"),
//!             ],
//!             scheduled_at: None,
//!         })
//!         .await?;
//!
//!     let first = &created.matches[0];
//!     manager
//!         .submit_result(first.id, first.player_a, Some(11), Some(6))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod errors;
pub mod manager;
pub mod models;
pub mod standings;

pub use builder::{BracketPlan, PlannedMatch, PlannedSlot, build_bracket, seed_positions};
pub use errors::{TournamentError, TournamentResult};
pub use manager::{CreateTournament, TournamentManager};
pub use models::{
    BracketKind, BracketView, CreatedTournament, InviteState, MAX_PARTICIPANTS, MIN_BRACKET_SIZE,
    Match, MatchId, MatchSlot, MatchStatus, MatchView, NewParticipant, NewTournament, Participant,
    ParticipantId, SlotView, SubmitOutcome, Tournament, TournamentId, TournamentStatus, UserId,
};
pub use standings::{StandingsEntry, compute_standings};

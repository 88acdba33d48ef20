// src/session/mod.rs

//! Timed quiz sessions: the state machine, its scoring, and the task that
//! drives it against a backend.

pub mod backend;
pub mod driver;
pub mod engine;
pub mod scoring;
pub mod view;

pub use backend::{BackendError, QuizBackend, StoreBackend};
pub use driver::{SessionHandle, spawn_session};
pub use engine::{
    PendingSubmission, QuizSession, SessionError, SessionPhase, SubmitTrigger, TickOutcome,
};
pub use scoring::{Score, round_percent, score_answers};
pub use view::{SessionView, format_clock};

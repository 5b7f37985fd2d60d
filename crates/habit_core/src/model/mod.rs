//! Habit domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep persisted records (`Habit`) apart from transient edit state.
//!
//! # Invariants
//! - Every habit is identified by a stable `HabitId`.
//! - Deleting a habit removes it; there are no tombstones.

pub mod edit_state;
pub mod habit;

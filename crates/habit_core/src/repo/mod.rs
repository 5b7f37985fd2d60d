//! Entity store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from edit/session orchestration.
//!
//! # Invariants
//! - Store writes enforce `HabitDraft::validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod completion_repo;
pub mod habit_repo;

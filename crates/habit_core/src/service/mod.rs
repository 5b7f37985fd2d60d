//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store and scheduler calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage and platform details.

pub mod habit_editor;
pub mod habit_service;

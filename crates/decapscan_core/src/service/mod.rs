//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate history loading and analysis into use-case level APIs.
//! - Keep CLI layers decoupled from storage and tracker details.

pub mod analysis_service;

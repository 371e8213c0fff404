//! Rendering of analysis results.
//!
//! # Responsibility
//! - Define the reporter contract consumed by callers of the analysis.
//! - Provide console and JSON renderings.
//!
//! # Invariants
//! - Reporters only render sets they are given; filtering and ordering are
//!   decided by the caller.

use crate::analysis::decapsulation::DecapsulationSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;

mod console;
mod json;

pub use console::ConsoleReporter;
pub use json::JsonReporter;

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "cannot write report: {err}"),
            Self::Json(err) => write!(f, "cannot encode report: {err}"),
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Renders decapsulation sets to an output stream.
pub trait Reporter {
    fn report(&self, sets: &[&DecapsulationSet], out: &mut dyn Write) -> ReportResult<()>;
}

//! Structured error handling and exit codes.

use serde::Serialize;

use crate::analyzer::AnalysisError;
use crate::records::RecordError;

/// Exit codes for the blockdedupe binary.
///
/// - 0: Success (at least one dedupe group, or duplicate set, reported)
/// - 1: General error (unexpected failure)
/// - 2: Nothing found (completed normally, no groups)
/// - 3: Invalid input (a checksum listing could not be parsed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: groups were found.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// Nothing found: the run completed without any group.
    NoGroups = 2,
    /// Invalid input: a record could not be parsed.
    InvalidInput = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "BD000",
            Self::GeneralError => "BD001",
            Self::NoGroups => "BD002",
            Self::InvalidInput => "BD003",
        }
    }

    /// Pick the exit code for a failed run.
    ///
    /// Unparsable records map to [`ExitCode::InvalidInput`]; everything
    /// else is a general error.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        let unparsable = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<RecordError>(),
                Some(RecordError::Unparsable { .. })
            ) || matches!(
                cause.downcast_ref::<AnalysisError>(),
                Some(AnalysisError::Record(RecordError::Unparsable { .. }))
            )
        });
        if unparsable {
            Self::InvalidInput
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "BD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, causes included
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}

//! Exit codes for the eh-core CLI.
//!
//! Exit codes communicate the verdict without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-3: Evaluation outcomes (parse the verdict from the code, not the output)
//! - 10-19: User/input errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use eh_common::{Error, Severity};

/// Exit codes for eh-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Evaluation Outcomes (0-3)
    // ========================================================================
    /// Success, or overall status Normal
    Clean = 0,

    /// Overall status Warning
    Warning = 1,

    /// Overall status Critical
    Critical = 2,

    /// Not enough history yet for this vehicle and gear
    ColdStart = 3,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments or configuration
    ArgsError = 10,

    /// Malformed telemetry input
    InputError = 11,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal or I/O error
    InternalError = 20,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Exit code for a successful evaluation.
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Normal => ExitCode::Clean,
            Severity::Warning => ExitCode::Warning,
            Severity::Critical => ExitCode::Critical,
        }
    }

    /// Exit code for a failed operation.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::BaselineUnavailable { .. } | Error::InsufficientBaseline { .. } => {
                ExitCode::ColdStart
            }
            Error::Config(_) | Error::InvalidConfig(_) => ExitCode::ArgsError,
            Error::MalformedSample(_) | Error::Json(_) => ExitCode::InputError,
            Error::Persistence(_) | Error::Io(_) => ExitCode::InternalError,
        }
    }

    /// Check if this exit code is an evaluation outcome (codes 0-3).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_NORMAL",
            ExitCode::Warning => "OK_WARNING",
            ExitCode::Critical => "OK_CRITICAL",
            ExitCode::ColdStart => "OK_COLD_START",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::InternalError => "ERR_INTERNAL",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

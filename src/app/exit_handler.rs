//! Exit code logic for the canvas-dl process.
//!
//! Single responsibility: map a command outcome to the process exit code.

use std::process::ExitCode;

/// Outcome of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(outcome: ProcessExit) -> Self {
        match outcome {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
        }
    }
}

/// Outcome of a download run from its failure count.
pub(crate) fn determine_exit_outcome(failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else {
        ProcessExit::Failure
    }
}

//! Exit code logic for the litefetch process.
//!
//! Single responsibility: map final task statuses to the process exit outcome.

use crate::ProcessExit;

/// Determines the process exit outcome from final task counts.
pub(crate) fn determine_exit_outcome(
    completed: usize,
    failed: usize,
    interrupted: bool,
) -> ProcessExit {
    if interrupted {
        ProcessExit::Interrupted
    } else if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

//! Exit-code translation for CI gates.
//!
//! Uses the same severity order as the report headline, so the printed
//! banner and the process status can never disagree.

use crate::classifier::RunMode;
use crate::report::Summary;

/// Every claim verified (or honestly disabled under lenient mode).
pub const EXIT_OK: u8 = 0;
/// At least one failure, or a disabled target under strict mode.
pub const EXIT_FAILURE: u8 = 1;
/// At least one fabricated success claim.
pub const EXIT_DISHONESTY: u8 = 2;

/// Map a run summary to a process exit status.
///
/// An empty run verified nothing and exits non-zero.
pub fn translate(summary: &Summary, mode: RunMode) -> u8 {
    if summary.liars > 0 {
        EXIT_DISHONESTY
    } else if summary.fail > 0 || summary.total == 0 {
        EXIT_FAILURE
    } else if summary.disabled > 0 && mode == RunMode::Strict {
        EXIT_FAILURE
    } else {
        EXIT_OK
    }
}

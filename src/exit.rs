//! Process exit codes
//!
//! | code | meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | success, or an image stream that went quiet         |
//! | 1    | execution ended in BUILD_FAILED / FAILED / KILLED    |
//! | 2    | usage, configuration or backend error               |
//! | 3    | image or job not found                              |
//! | 4    | log stream unavailable after repeated failures      |
//! | 80   | interrupted (SIGINT)                                |

use crate::tail::StopReason;

pub const EXIT_CODE_OK: i32 = 0;
pub const EXIT_CODE_FAILED: i32 = 1;
pub const EXIT_CODE_ERROR: i32 = 2;
pub const EXIT_CODE_NOT_FOUND: i32 = 3;
pub const EXIT_CODE_UNAVAILABLE: i32 = 4;

/// Exit code for interrupted follows
pub const EXIT_CODE_INTERRUPTED: i32 = 80;

/// Exit code for a tail that stopped on its own.
pub fn for_stop(reason: StopReason) -> i32 {
    match reason {
        StopReason::NotFound => EXIT_CODE_NOT_FOUND,
        StopReason::Unavailable => EXIT_CODE_UNAVAILABLE,
        other if other.is_success() => EXIT_CODE_OK,
        _ => EXIT_CODE_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlog_protocol::{ImageStatus, JobStatus};

    #[test]
    fn test_stop_reason_codes() {
        assert_eq!(for_stop(StopReason::Terminal(JobStatus::Success.into())), 0);
        assert_eq!(for_stop(StopReason::Terminal(ImageStatus::BuildSuccess.into())), 0);
        assert_eq!(for_stop(StopReason::Stalled), 0);
        assert_eq!(for_stop(StopReason::Terminal(JobStatus::Killed.into())), 1);
        assert_eq!(for_stop(StopReason::Terminal(ImageStatus::BuildFailed.into())), 1);
        assert_eq!(for_stop(StopReason::NotFound), 3);
        assert_eq!(for_stop(StopReason::Unavailable), 4);
    }
}

//! Terminal status classification.

use runlog_protocol::{ExecutionStatus, ImageStatus, JobStatus, OwnerKind};

/// Whether more log output or state changes are expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    NonTerminal,
    Terminal,
}

impl Classification {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}

impl TerminalState for ImageStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, ImageStatus::BuildSuccess | ImageStatus::BuildFailed)
    }
}

impl TerminalState for JobStatus {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Killed
        )
    }
}

impl TerminalState for ExecutionStatus {
    fn is_terminal(&self) -> bool {
        match self {
            ExecutionStatus::Image(s) => s.is_terminal(),
            ExecutionStatus::Job(s) => s.is_terminal(),
        }
    }
}

/// Classify a status.
pub fn classify(status: ExecutionStatus) -> Classification {
    if status.is_terminal() {
        Classification::Terminal
    } else {
        Classification::NonTerminal
    }
}

/// Classify a raw wire code. Unknown codes yield `None`.
pub fn classify_code(kind: OwnerKind, code: u8) -> Option<Classification> {
    ExecutionStatus::from_code(kind, code).ok().map(classify)
}

/// Whether a terminal status means the execution succeeded.
pub fn is_success(status: ExecutionStatus) -> bool {
    matches!(
        status,
        ExecutionStatus::Image(ImageStatus::BuildSuccess) | ExecutionStatus::Job(JobStatus::Success)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_table() {
        assert_eq!(classify(ImageStatus::Dormant.into()), Classification::NonTerminal);
        assert_eq!(classify(ImageStatus::Building.into()), Classification::NonTerminal);
        assert_eq!(classify(ImageStatus::BuildSuccess.into()), Classification::Terminal);
        assert_eq!(classify(ImageStatus::BuildFailed.into()), Classification::Terminal);
    }

    #[test]
    fn test_job_table() {
        assert_eq!(classify(JobStatus::Pending.into()), Classification::NonTerminal);
        assert_eq!(classify(JobStatus::Running.into()), Classification::NonTerminal);
        assert_eq!(classify(JobStatus::Success.into()), Classification::Terminal);
        assert_eq!(classify(JobStatus::Failed.into()), Classification::Terminal);
        assert_eq!(classify(JobStatus::Killed.into()), Classification::Terminal);
    }

    #[test]
    fn test_classify_code() {
        assert_eq!(classify_code(OwnerKind::Job, 1), Some(Classification::NonTerminal));
        assert_eq!(classify_code(OwnerKind::Job, 4), Some(Classification::Terminal));
        assert_eq!(classify_code(OwnerKind::Image, 0), Some(Classification::NonTerminal));
        assert_eq!(classify_code(OwnerKind::Image, 4), None);
        assert_eq!(classify_code(OwnerKind::Job, 9), None);
    }

    #[test]
    fn test_is_success() {
        assert!(is_success(JobStatus::Success.into()));
        assert!(is_success(ImageStatus::BuildSuccess.into()));
        assert!(!is_success(JobStatus::Killed.into()));
        assert!(!is_success(ImageStatus::BuildFailed.into()));
    }
}

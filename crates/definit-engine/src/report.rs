use crate::error::{DeinitError, DeinitResult};

/// What a single traversal did.
#[derive(Debug, Default)]
pub struct DeinitReport {
    /// Cleanup operations that succeeded.
    pub released: usize,
    /// Cleanup operations that returned an error.
    pub failed: usize,
    /// Composites the engine descended into.
    pub composites_entered: usize,
    /// Values skipped because they survive into the next structure.
    pub survivors_skipped: usize,
    /// Composites skipped because they were already entered in this call.
    pub cycles_skipped: usize,
    /// Resources skipped because they were already released in this call.
    pub repeats_skipped: usize,
    /// The failure signalled to the caller, if any.
    pub error: Option<DeinitError>,
}

impl DeinitReport {
    /// Returns `true` if no failure was signalled.
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }

    /// Number of cleanup operations invoked.
    pub fn attempted(&self) -> usize {
        self.released + self.failed
    }

    /// Drop the statistics, keeping only the outcome.
    pub fn into_result(self) -> DeinitResult<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_is_ok() {
        let report = DeinitReport {
            released: 3,
            ..Default::default()
        };
        assert!(report.is_clean());
        assert_eq!(report.attempted(), 3);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn failed_report_carries_error() {
        let report = DeinitReport {
            released: 1,
            failed: 1,
            error: Some(DeinitError::DepthExceeded { limit: 1 }),
            ..Default::default()
        };
        assert!(!report.is_clean());
        assert_eq!(report.attempted(), 2);
        assert!(matches!(
            report.into_result(),
            Err(DeinitError::DepthExceeded { limit: 1 })
        ));
    }
}

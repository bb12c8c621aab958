use std::num::NonZeroUsize;
use std::time::Duration;

use lp_block::ReceiverLeg;

pub const DEFAULT_WINDOW_SIZE: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};
pub const DEFAULT_PAUSE_AFTER: NonZeroUsize = match NonZeroUsize::new(55) {
    Some(n) => n,
    None => unreachable!(),
};
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// A single pause in the middle of the dispatch burst, so that the endpoint does not receive the whole window
/// at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    /// Number of fetches launched before pausing. `0` never pauses.
    pub pause_after: usize,
    pub pause: Duration,
}

impl PacingPolicy {
    pub const fn new(pause_after: usize, pause: Duration) -> Self {
        Self { pause_after, pause }
    }

    pub const fn disabled() -> Self {
        Self { pause_after: usize::MAX, pause: Duration::ZERO }
    }

    /// Whether to pause before launching the fetch at index `launched`.
    pub fn should_pause_before(&self, launched: usize) -> bool {
        launched > 0 && launched == self.pause_after && !self.pause.is_zero()
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PAUSE_AFTER.get(), DEFAULT_PAUSE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    pub pacing: PacingPolicy,
    /// Upper bound on in-flight fetches. `None` launches every fetch at once.
    pub max_concurrent_fetches: Option<NonZeroUsize>,
    /// Per-fetch deadline. `None` waits for the block source indefinitely.
    pub fetch_timeout: Option<Duration>,
}

/// What a failed block fetch does to the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first failed fetch aborts the scan and no ranking is produced.
    #[default]
    FailFast,
    /// Failed blocks are logged and left out of the ledger.
    SkipFailedBlocks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub window_size: NonZeroUsize,
    pub dispatch: DispatchConfig,
    pub failure_policy: FailurePolicy,
    pub receiver_leg: ReceiverLeg,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            dispatch: DispatchConfig::default(),
            failure_policy: FailurePolicy::default(),
            receiver_leg: ReceiverLeg::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(54, false)]
    #[case(55, true)]
    #[case(56, false)]
    fn default_pacing_pauses_once_before_the_56th_fetch(#[case] launched: usize, #[case] expected: bool) {
        assert_eq!(PacingPolicy::default().should_pause_before(launched), expected);
    }

    #[test]
    fn disabled_pacing_never_pauses() {
        let pacing = PacingPolicy::disabled();
        assert!((0..1000).all(|launched| !pacing.should_pause_before(launched)));
    }

    #[test]
    fn zero_pause_after_never_pauses() {
        let pacing = PacingPolicy::new(0, Duration::from_secs(1));
        assert!((0..100).all(|launched| !pacing.should_pause_before(launched)));
    }

    #[test]
    fn zero_pause_never_pauses() {
        assert!(!PacingPolicy::new(3, Duration::ZERO).should_pause_before(3));
    }
}

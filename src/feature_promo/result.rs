use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a promo could not be queued or shown.
///
/// Precondition providers pick whichever of these fits the check that
/// failed. The queue itself only ever originates `AlreadyQueued`,
/// `Canceled` and `TimedOut`; every other value is forwarded as-is.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failure {
    #[error("promo was canceled")]
    Canceled,
    #[error("internal error")]
    Error,
    #[error("blocked by UI state")]
    BlockedByUi,
    #[error("blocked by another promo")]
    BlockedByPromo,
    #[error("blocked by feature configuration")]
    BlockedByConfig,
    #[error("promo is snoozed")]
    Snoozed,
    #[error("blocked by browser context")]
    BlockedByContext,
    #[error("feature is disabled")]
    FeatureDisabled,
    #[error("promo was permanently dismissed")]
    PermanentlyDismissed,
    #[error("blocked by session grace period")]
    BlockedByGracePeriod,
    #[error("blocked by promo cooldown")]
    BlockedByCooldown,
    #[error("recently aborted")]
    RecentlyAborted,
    #[error("exceeded maximum show count")]
    ExceededMaxShowCount,
    #[error("blocked by new profile")]
    BlockedByNewProfile,
    #[error("blocked by reshow delay")]
    BlockedByReshowDelay,
    #[error("timed out waiting in queue")]
    TimedOut,
    #[error("promo is already queued")]
    AlreadyQueued,
    #[error("promo system is shutting down")]
    Shutdown,
}

impl Failure {
    /// Stable label, used as a metrics tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Failure::Canceled => "canceled",
            Failure::Error => "error",
            Failure::BlockedByUi => "blocked_by_ui",
            Failure::BlockedByPromo => "blocked_by_promo",
            Failure::BlockedByConfig => "blocked_by_config",
            Failure::Snoozed => "snoozed",
            Failure::BlockedByContext => "blocked_by_context",
            Failure::FeatureDisabled => "feature_disabled",
            Failure::PermanentlyDismissed => "permanently_dismissed",
            Failure::BlockedByGracePeriod => "blocked_by_grace_period",
            Failure::BlockedByCooldown => "blocked_by_cooldown",
            Failure::RecentlyAborted => "recently_aborted",
            Failure::ExceededMaxShowCount => "exceeded_max_show_count",
            Failure::BlockedByNewProfile => "blocked_by_new_profile",
            Failure::BlockedByReshowDelay => "blocked_by_reshow_delay",
            Failure::TimedOut => "timed_out",
            Failure::AlreadyQueued => "already_queued",
            Failure::Shutdown => "shutdown",
        }
    }
}

/// Outcome of a precondition check or of a promo request as a whole.
///
/// Either success, or exactly one [`Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FeaturePromoResult {
    failure: Option<Failure>,
}

impl FeaturePromoResult {
    pub const fn success() -> Self {
        Self { failure: None }
    }

    pub const fn failed(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.failure.is_none()
    }

    pub fn failure(&self) -> Option<Failure> {
        self.failure
    }

    pub fn into_result(self) -> Result<(), Failure> {
        match self.failure {
            None => Ok(()),
            Some(failure) => Err(failure),
        }
    }
}

impl From<Failure> for FeaturePromoResult {
    fn from(failure: Failure) -> Self {
        Self::failed(failure)
    }
}

impl From<Result<(), Failure>> for FeaturePromoResult {
    fn from(result: Result<(), Failure>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(failure) => Self::failed(failure),
        }
    }
}

impl PartialEq<Failure> for FeaturePromoResult {
    fn eq(&self, other: &Failure) -> bool {
        self.failure == Some(*other)
    }
}

impl fmt::Display for FeaturePromoResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure {
            None => write!(f, "success"),
            Some(failure) => write!(f, "failure: {}", failure),
        }
    }
}

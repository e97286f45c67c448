use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use orderdesk_core::AppError;
use serde::{Deserialize, Serialize};

/// Days before expiry during which paid plans surface a renewal warning.
pub const EXPIRY_WARNING_WINDOW_DAYS: i64 = 3;

/// Billing status reported by the subscription backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Free trial period.
    Trial,
    /// Paid and current.
    Active,
    /// Cancelled by the tenant.
    Cancelled,
    /// Lapsed without renewal.
    Expired,
    /// Last charge was declined.
    PaymentFailed,
    /// Temporarily paused.
    Paused,
}

impl SubscriptionStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::PaymentFailed => "payment_failed",
            Self::Paused => "paused",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "trial" => Ok(Self::Trial),
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            "payment_failed" => Ok(Self::PaymentFailed),
            "paused" => Ok(Self::Paused),
            _ => Err(AppError::Validation(format!(
                "unknown subscription status '{value}'"
            ))),
        }
    }
}

/// Raw subscription snapshot fetched at workspace initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Billing status.
    pub status: SubscriptionStatus,
    /// Plan identifier.
    pub plan_id: String,
    /// Start of the current billing period.
    pub started_at: DateTime<Utc>,
    /// End of the current billing period.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Access stays open until this instant despite expiry or failed payment.
    #[serde(default)]
    pub grace_period_until: Option<DateTime<Utc>>,
    /// When the tenant cancelled.
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    /// When the last charge failed.
    #[serde(default)]
    pub payment_failed_at: Option<DateTime<Utc>>,
    /// Whether the plan started as a trial.
    #[serde(default)]
    pub is_trial: bool,
}

/// Lifecycle flags derived from a subscription snapshot at one instant.
///
/// This is the only place subscription booleans are computed; views read
/// the resolved flags instead of re-deriving them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionLifecycle {
    /// Reported status; `None` when the tenant has no subscription.
    pub status: Option<SubscriptionStatus>,
    /// Status is `trial`.
    pub is_trial: bool,
    /// Status is `active`.
    pub is_active: bool,
    /// Expiry timestamp exists and lies in the past.
    pub is_expired: bool,
    /// Status is `payment_failed`.
    pub is_payment_failed: bool,
    /// Status is `cancelled`.
    pub is_cancelled: bool,
    /// Grace-period timestamp exists and lies in the future.
    pub in_grace_period: bool,
    /// Workspace access must be denied.
    pub is_blocked: bool,
    /// Expiry falls within the warning window and has not passed yet.
    pub is_expiring_soon: bool,
    /// A renewal or payment warning should be shown.
    pub show_warning: bool,
    /// Whole days until expiry, negative once expired.
    pub days_remaining: Option<i64>,
}

impl SubscriptionLifecycle {
    /// Resolves lifecycle flags for `subscription` at `now`.
    ///
    /// A missing subscription resolves to the blocked state.
    #[must_use]
    pub fn resolve(subscription: Option<&Subscription>, now: DateTime<Utc>) -> Self {
        let Some(subscription) = subscription else {
            return Self::missing();
        };

        let is_trial = subscription.status == SubscriptionStatus::Trial;
        let is_active = subscription.status == SubscriptionStatus::Active;
        let is_payment_failed = subscription.status == SubscriptionStatus::PaymentFailed;
        let is_cancelled = subscription.status == SubscriptionStatus::Cancelled;

        let is_expired = subscription
            .expires_at
            .is_some_and(|expires_at| expires_at < now);
        let in_grace_period = subscription
            .grace_period_until
            .is_some_and(|grace_until| grace_until > now);

        let is_blocked = (is_payment_failed && !in_grace_period)
            || is_cancelled
            || (is_expired && !in_grace_period);

        let is_expiring_soon = subscription.expires_at.is_some_and(|expires_at| {
            expires_at > now && expires_at - now <= Duration::days(EXPIRY_WARNING_WINDOW_DAYS)
        });
        let show_warning = is_payment_failed || (is_expiring_soon && !is_trial);

        Self {
            status: Some(subscription.status),
            is_trial,
            is_active,
            is_expired,
            is_payment_failed,
            is_cancelled,
            in_grace_period,
            is_blocked,
            is_expiring_soon,
            show_warning,
            days_remaining: subscription
                .expires_at
                .map(|expires_at| (expires_at - now).num_days()),
        }
    }

    /// Returns whether the status alone permits workspace access.
    ///
    /// Strict mode admits only paid subscriptions.
    #[must_use]
    pub fn allowed_by_status(&self, strict: bool) -> bool {
        if strict {
            self.is_active
        } else {
            self.is_active || self.is_trial
        }
    }

    fn missing() -> Self {
        Self {
            status: None,
            is_trial: false,
            is_active: false,
            is_expired: false,
            is_payment_failed: false,
            is_cancelled: false,
            in_grace_period: false,
            is_blocked: true,
            is_expiring_soon: false,
            show_warning: false,
            days_remaining: None,
        }
    }
}

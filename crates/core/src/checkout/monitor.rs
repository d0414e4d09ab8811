//! Reconciliation Monitor
//!
//! Watches checkout snapshots and tells the shopper whether the discount they were promised is
//! the discount they are getting. The monitor only observes: it never changes the cart and never
//! fails, anomalies are rendered rather than raised.
//!
//! Automatic discounts are applied by the store some time after the cart changes, so an empty
//! allocation list on the first non-empty cart is not conclusive. The monitor waits for that
//! exactly once per session, tracked by [`AutoApplyWindow`].

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use super::{CheckoutSnapshot, Verdict, VerificationResult, verify};

/// Notice shown while waiting for the store to apply automatic discounts.
pub const WAITING_NOTICE: &str = "Checking for automatic discounts...";

/// Banner shown when the reported amounts are too large to check.
pub const UNVERIFIABLE_WARNING: &str =
    "Discount amounts could not be verified. Please refresh the page or contact support.";

/// Monitor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// How long to wait for automatic discounts before re-checking.
    pub recheck_after: Duration,

    /// Shortfalls up to this amount are warnings, larger ones errors.
    pub error_threshold: Decimal,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            recheck_after: Duration::from_secs(2),
            error_threshold: Decimal::ONE,
        }
    }
}

/// Where the monitor is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Nothing to look at yet.
    #[default]
    Checking,

    /// Cart has items but no discount yet; waiting once for the store.
    WaitingAuto,

    /// Cart has items and no discount applies.
    NoDiscount,

    /// Discounts apply and the totals add up.
    Applied,

    /// Totals are short by a small amount.
    CalculationWarning,

    /// Totals are short by more than the error threshold.
    CalculationError,
}

/// The once-per-session wait for automatic discounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoApplyWindow {
    /// Not waited yet.
    #[default]
    Unopened,

    /// Waiting; the recheck timer is armed.
    Open,

    /// Waited, or a discount showed up. Never reopens.
    Spent,
}

/// Banner severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Small discrepancy.
    Warning,

    /// Large discrepancy.
    Error,
}

/// One applied discount in the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownLine {
    /// Discount title.
    pub title: String,

    /// Amount taken off, formatted and signed (`-£10.00`).
    pub amount: String,
}

/// What to show the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "render", rename_all = "snake_case")]
pub enum Render {
    /// Show nothing.
    Nothing,

    /// Informational text.
    Notice {
        /// Text to show.
        text: String,
    },

    /// The applied discounts and total savings.
    Breakdown {
        /// Per-discount lines.
        lines: Vec<BreakdownLine>,

        /// Sum of all lines, formatted and signed.
        total_savings: String,

        /// Whether the discounts were applied automatically.
        automatic: bool,
    },

    /// Totals do not add up.
    Warning {
        /// How bad it is.
        severity: Severity,

        /// Text to show.
        message: String,
    },
}

/// Result of one monitor step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorOutput {
    /// State after the step.
    pub state: MonitorState,

    /// What to show.
    pub render: Render,

    /// Arm a one-shot timer and call [`ReconciliationMonitor::recheck_elapsed`] when it fires.
    ///
    /// Only ever returned once per monitor.
    #[serde(skip)]
    pub schedule: Option<Duration>,

    /// Totals comparison, when discounts were present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
}

/// Checkout-side reconciliation state machine.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationMonitor {
    config: MonitorConfig,
    state: MonitorState,
    window: AutoApplyWindow,
}

impl ReconciliationMonitor {
    /// A monitor in `Checking`.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: MonitorState::Checking,
            window: AutoApplyWindow::Unopened,
        }
    }

    /// Current state.
    pub const fn state(&self) -> MonitorState {
        self.state
    }

    /// Current auto-apply window.
    pub const fn window(&self) -> AutoApplyWindow {
        self.window
    }

    /// React to a new snapshot.
    pub fn observe(&mut self, snapshot: &CheckoutSnapshot) -> MonitorOutput {
        if !snapshot.discount_allocations.is_empty() {
            self.window = AutoApplyWindow::Spent;

            return self.reconcile(snapshot);
        }

        if snapshot.subtotal_amount <= Decimal::ZERO {
            return self.settle(MonitorState::Checking, Render::Nothing);
        }

        match self.window {
            AutoApplyWindow::Unopened => {
                self.window = AutoApplyWindow::Open;

                let mut output = self.waiting();
                output.schedule = Some(self.config.recheck_after);

                output
            }
            AutoApplyWindow::Open => self.waiting(),
            AutoApplyWindow::Spent => self.settle(MonitorState::NoDiscount, Render::Nothing),
        }
    }

    /// The recheck timer fired; `snapshot` is the latest one seen.
    pub fn recheck_elapsed(&mut self, snapshot: &CheckoutSnapshot) -> MonitorOutput {
        if self.window == AutoApplyWindow::Open {
            self.window = AutoApplyWindow::Spent;
        }

        self.observe(snapshot)
    }

    fn waiting(&mut self) -> MonitorOutput {
        self.settle(
            MonitorState::WaitingAuto,
            Render::Notice {
                text: WAITING_NOTICE.to_string(),
            },
        )
    }

    fn settle(&mut self, state: MonitorState, render: Render) -> MonitorOutput {
        self.state = state;

        MonitorOutput {
            state,
            render,
            schedule: None,
            verification: None,
        }
    }

    fn reconcile(&mut self, snapshot: &CheckoutSnapshot) -> MonitorOutput {
        let Some(verification) = verify(snapshot) else {
            return self.settle(
                MonitorState::CalculationError,
                Render::Warning {
                    severity: Severity::Error,
                    message: UNVERIFIABLE_WARNING.to_string(),
                },
            );
        };

        let (state, render) = match verification.verdict {
            Verdict::Match | Verdict::ShippingTaxAdjusted => {
                (MonitorState::Applied, breakdown(snapshot, &verification))
            }
            Verdict::Mismatch if verification.shortfall() <= self.config.error_threshold => (
                MonitorState::CalculationWarning,
                warning(snapshot, &verification, Severity::Warning),
            ),
            Verdict::Mismatch => (
                MonitorState::CalculationError,
                warning(snapshot, &verification, Severity::Error),
            ),
        };

        let mut output = self.settle(state, render);
        output.verification = Some(verification);

        output
    }
}

fn breakdown(snapshot: &CheckoutSnapshot, verification: &VerificationResult) -> Render {
    let lines = snapshot
        .discount_allocations
        .iter()
        .map(|allocation| BreakdownLine {
            title: allocation.display_title().to_string(),
            amount: format!("-{}", snapshot.format_amount(allocation.discounted_amount)),
        })
        .collect();

    Render::Breakdown {
        lines,
        total_savings: format!("-{}", snapshot.format_amount(verification.discount_total)),
        automatic: snapshot.is_automatic(),
    }
}

fn warning(
    snapshot: &CheckoutSnapshot,
    verification: &VerificationResult,
    severity: Severity,
) -> Render {
    Render::Warning {
        severity,
        message: format!(
            "Discount calculation issue detected: expected {} but the total is {}. Please refresh the page or contact support.",
            snapshot.format_amount(verification.expected_total),
            snapshot.format_amount(snapshot.total_amount),
        ),
    }
}

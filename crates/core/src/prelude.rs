//! Trellis prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    checkout::{
        CheckoutSnapshot, DiscountAllocation, Verdict, VerificationResult,
        monitor::{
            AutoApplyWindow, MonitorConfig, MonitorOutput, MonitorState, ReconciliationMonitor,
            Render, Severity,
        },
        verify,
    },
    conflicts::{ConflictPredicate, ConflictRulesError, MarkerConflictPredicate, ScanContext},
    consistency::{ConsistencyReport, Issue, Recommendation, evaluate},
    discounts::{
        DiscountCode, DiscountKind, DiscountSpec, EncodedValue, NormalizedDiscount, OrderType,
        Representation,
        normalize::{NormalizeContext, NormalizeError, ValidationError, normalize},
    },
    ids::TypedId,
    records::{
        AutomaticDiscountId, CodeDiscountId, DiscountId, DiscountRecord, DiscountStatus,
        DiscountValue, RecordKind,
    },
};

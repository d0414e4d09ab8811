//! Discount Store
//!
//! The external system that holds discounts and applies them at checkout. It is the only shared
//! mutable state this application touches, and it is eventually consistent: a delete can remain
//! visible to listings for a while after it succeeds.

use std::fmt;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trellis::{
    discounts::{DiscountCode, EncodedValue, NormalizedDiscount},
    records::{AutomaticDiscountId, CodeDiscountId, DiscountRecord},
};

pub mod shopify;

pub use shopify::{ShopifyAdminClient, ShopifyConfig};

/// Basic shop details, fetched as a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopInfo {
    /// Shop name.
    pub name: String,

    /// Currency checkout totals are in.
    pub currency_code: String,

    /// Store plan, when reported.
    pub plan_name: Option<String>,
}

/// Request to create an automatic discount.
///
/// Holds the encoded value only; there is no code field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAutomaticDiscount {
    /// Title including any order-type suffix.
    pub title: String,

    /// Value to transmit.
    pub value: EncodedValue,

    /// Start of the window.
    pub starts_at: Timestamp,

    /// End of the window.
    pub ends_at: Timestamp,

    /// Minimum subtotal, only when one is required.
    pub minimum_subtotal: Option<Decimal>,
}

impl NewAutomaticDiscount {
    /// Build the request for a normalised discount.
    pub fn new(discount: &NormalizedDiscount) -> Self {
        Self {
            title: discount.title().to_string(),
            value: discount.encoded_value(),
            starts_at: discount.starts_at(),
            ends_at: discount.ends_at(),
            minimum_subtotal: minimum_subtotal(discount),
        }
    }
}

/// Request to create a code discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCodeDiscount {
    /// Title including any order-type suffix.
    pub title: String,

    /// Code the shopper enters.
    pub code: DiscountCode,

    /// Value to transmit.
    pub value: EncodedValue,

    /// Start of the window.
    pub starts_at: Timestamp,

    /// End of the window.
    pub ends_at: Timestamp,

    /// Minimum subtotal, only when one is required.
    pub minimum_subtotal: Option<Decimal>,
}

impl NewCodeDiscount {
    /// Build the request for a normalised discount and its code.
    pub fn new(discount: &NormalizedDiscount, code: DiscountCode) -> Self {
        Self {
            title: discount.title().to_string(),
            code,
            value: discount.encoded_value(),
            starts_at: discount.starts_at(),
            ends_at: discount.ends_at(),
            minimum_subtotal: minimum_subtotal(discount),
        }
    }
}

fn minimum_subtotal(discount: &NormalizedDiscount) -> Option<Decimal> {
    Some(discount.min_order_value()).filter(|minimum| *minimum > Decimal::ZERO)
}

/// A field-level rejection reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    /// Path to the rejected input field.
    #[serde(default)]
    pub field: Option<Vec<String>>,

    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<String>,

    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self
            .field
            .as_ref()
            .map_or_else(|| "N/A".to_string(), |path| path.join("."));

        write!(
            f,
            "{} (field: {field}, code: {})",
            self.message,
            self.code.as_deref().unwrap_or("N/A")
        )
    }
}

fn join_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Errors reported by a discount store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never completed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Credentials are valid but lack a required scope.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The store answered with something other than the expected envelope.
    #[error("unexpected response from store: {0}")]
    Protocol(String),

    /// The store rejected one or more input fields.
    #[error("store rejected the request: {}", join_user_errors(.0))]
    UserErrors(Vec<UserError>),

    /// The store reported success but returned no entity.
    #[error("store returned no {0}")]
    MissingEntity(&'static str),

    /// The store asked us to slow down.
    #[error("store throttled the request")]
    Throttled,
}

impl StoreError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Throttled)
    }
}

/// Operations the application needs from a discount store.
#[automock]
#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// Every automatic discount, in the store's order.
    async fn list_automatic_discounts(&self) -> Result<Vec<DiscountRecord>, StoreError>;

    /// Every code discount, in the store's order.
    async fn list_code_discounts(&self) -> Result<Vec<DiscountRecord>, StoreError>;

    /// Create an automatic discount.
    async fn create_automatic_discount(
        &self,
        discount: &NewAutomaticDiscount,
    ) -> Result<DiscountRecord, StoreError>;

    /// Create a code discount.
    async fn create_code_discount(
        &self,
        discount: &NewCodeDiscount,
    ) -> Result<DiscountRecord, StoreError>;

    /// Delete an automatic discount.
    async fn delete_automatic_discount(&self, id: &AutomaticDiscountId) -> Result<(), StoreError>;

    /// Delete a code discount.
    async fn delete_code_discount(&self, id: &CodeDiscountId) -> Result<(), StoreError>;

    /// Shop details; doubles as a connectivity and credentials check.
    async fn read_shop_info(&self) -> Result<ShopInfo, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_errors_keep_field_code_and_message() {
        let error = StoreError::UserErrors(vec![
            UserError {
                field: Some(vec!["automaticBasicDiscount".to_string(), "endsAt".to_string()]),
                code: Some("INVALID".to_string()),
                message: "Ends at needs to be after starts_at".to_string(),
            },
            UserError {
                field: None,
                code: None,
                message: "Something else".to_string(),
            },
        ]);

        assert_eq!(
            error.to_string(),
            "store rejected the request: Ends at needs to be after starts_at \
             (field: automaticBasicDiscount.endsAt, code: INVALID) | Something else (field: N/A, code: N/A)"
        );
    }

    #[test]
    fn only_transport_and_throttling_are_retryable() {
        assert!(StoreError::Throttled.is_retryable());
        assert!(!StoreError::Permission("write_discounts".to_string()).is_retryable());
        assert!(!StoreError::Authentication("401".to_string()).is_retryable());
        assert!(!StoreError::MissingEntity("automaticDiscountNode").is_retryable());
    }
}

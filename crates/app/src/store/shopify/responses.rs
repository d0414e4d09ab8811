//! Response envelopes and their classification.
//!
//! Failures are classified in a fixed order: top-level GraphQL errors first, then field-level
//! `userErrors`, then a missing entity. A response is only a success when it clears all three.

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, de::DeserializeOwned};
use trellis::records::{
    AutomaticDiscountId, CodeDiscountId, DiscountId, DiscountRecord, DiscountStatus,
    DiscountValue,
};

use crate::store::{ShopInfo, StoreError, UserError};

/// Scope whose absence shows up as a GraphQL error rather than an HTTP status.
const WRITE_SCOPE: &str = "write_discounts";

#[derive(Debug, Deserialize)]
pub(super) struct GraphQlResponse<T> {
    data: Option<T>,

    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,

    #[serde(default)]
    path: Option<Vec<serde_json::Value>>,

    #[serde(default)]
    extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorExtensions {
    code: Option<String>,
}

impl GraphQlError {
    fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|ext| ext.code.as_deref())
    }

    fn is_permission(&self) -> bool {
        let message = self.message.to_lowercase();

        self.code() == Some("ACCESS_DENIED")
            || message.contains(WRITE_SCOPE)
            || message.contains("access denied")
    }

    fn describe(&self) -> String {
        let path = self.path.as_ref().map_or_else(
            || "N/A".to_string(),
            |path| {
                path.iter()
                    .map(|segment| match segment {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".")
            },
        );

        format!("{} (path: {path})", self.message)
    }
}

impl<T: DeserializeOwned> GraphQlResponse<T> {
    /// Decode a response body. A body that is not a GraphQL envelope, such as an HTML error
    /// page served with a success status, is a protocol failure rather than a transport one.
    pub(super) fn from_body(body: &str) -> Result<Self, StoreError> {
        serde_json::from_str(body).map_err(|error| {
            let snippet: String = body.chars().take(200).collect();

            StoreError::Protocol(format!("undecodable response body ({error}): {snippet}"))
        })
    }
}

impl<T> GraphQlResponse<T> {
    /// Tier one: transport-level and protocol-level failures.
    pub(super) fn into_data(self) -> Result<T, StoreError> {
        if !self.errors.is_empty() {
            if self
                .errors
                .iter()
                .any(|error| error.code() == Some("THROTTLED"))
            {
                return Err(StoreError::Throttled);
            }

            let details = self
                .errors
                .iter()
                .map(GraphQlError::describe)
                .collect::<Vec<_>>()
                .join(" | ");

            if self.errors.iter().any(GraphQlError::is_permission) {
                return Err(StoreError::Permission(details));
            }

            return Err(StoreError::Protocol(details));
        }

        self.data.ok_or_else(|| {
            StoreError::Protocol("response carried neither data nor errors".to_string())
        })
    }
}

/// Tier two and three for mutation payloads.
fn require<T>(
    node: Option<T>,
    user_errors: Vec<UserError>,
    entity: &'static str,
) -> Result<T, StoreError> {
    if !user_errors.is_empty() {
        return Err(StoreError::UserErrors(user_errors));
    }

    node.ok_or(StoreError::MissingEntity(entity))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Connection<N> {
    #[serde(default = "Vec::new")]
    pub(super) edges: Vec<Edge<N>>,

    pub(super) page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Edge<N> {
    pub(super) node: N,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PageInfo {
    pub(super) has_next_page: bool,
    pub(super) end_cursor: Option<String>,
}

impl PageInfo {
    pub(super) fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

/// The discount body shared by every automatic and code discount type we query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscountBody {
    title: Option<String>,
    status: Option<String>,
    created_at: Option<Timestamp>,
    codes: Option<Connection<CodeNode>>,
    customer_gets: Option<CustomerGets>,
}

#[derive(Debug, Deserialize)]
struct CodeNode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct CustomerGets {
    value: Option<ValueBody>,
}

#[derive(Debug, Deserialize)]
struct ValueBody {
    percentage: Option<Decimal>,
    amount: Option<MoneyBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyBody {
    amount: Decimal,
    currency_code: Option<String>,
}

impl DiscountBody {
    fn into_record(self, id: DiscountId) -> DiscountRecord {
        let value = self
            .customer_gets
            .and_then(|gets| gets.value)
            .and_then(|value| match (value.percentage, value.amount) {
                (Some(fraction), _) => Some(DiscountValue::Percentage { fraction }),
                (None, Some(money)) => Some(DiscountValue::FixedAmount {
                    amount: money.amount,
                    currency_code: money.currency_code,
                }),
                (None, None) => None,
            });

        let code = self
            .codes
            .and_then(|codes| codes.edges.into_iter().next())
            .map(|edge| edge.node.code);

        DiscountRecord {
            id,
            title: self.title.unwrap_or_default(),
            status: self
                .status
                .as_deref()
                .map_or(DiscountStatus::Unknown, DiscountStatus::from_store),
            value,
            code,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AutomaticNode {
    id: String,
    automatic_discount: Option<DiscountBody>,
}

impl From<AutomaticNode> for DiscountRecord {
    fn from(node: AutomaticNode) -> Self {
        node.automatic_discount
            .unwrap_or_default()
            .into_record(DiscountId::Automatic(AutomaticDiscountId::new(node.id)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CodeDiscountNode {
    id: String,
    code_discount: Option<DiscountBody>,
}

impl From<CodeDiscountNode> for DiscountRecord {
    fn from(node: CodeDiscountNode) -> Self {
        node.code_discount
            .unwrap_or_default()
            .into_record(DiscountId::Code(CodeDiscountId::new(node.id)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AutomaticDiscountsData {
    pub(super) automatic_discount_nodes: Connection<AutomaticNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CodeDiscountsData {
    pub(super) code_discount_nodes: Connection<CodeDiscountNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateAutomaticData {
    discount_automatic_basic_create: Option<CreateAutomaticPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAutomaticPayload {
    automatic_discount_node: Option<AutomaticNode>,

    #[serde(default)]
    user_errors: Vec<UserError>,
}

impl CreateAutomaticData {
    pub(super) fn into_record(self) -> Result<DiscountRecord, StoreError> {
        let payload = self
            .discount_automatic_basic_create
            .ok_or(StoreError::MissingEntity("discountAutomaticBasicCreate"))?;

        require(
            payload.automatic_discount_node,
            payload.user_errors,
            "automaticDiscountNode",
        )
        .map(DiscountRecord::from)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateCodeData {
    discount_code_basic_create: Option<CreateCodePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCodePayload {
    code_discount_node: Option<CodeDiscountNode>,

    #[serde(default)]
    user_errors: Vec<UserError>,
}

impl CreateCodeData {
    pub(super) fn into_record(self) -> Result<DiscountRecord, StoreError> {
        let payload = self
            .discount_code_basic_create
            .ok_or(StoreError::MissingEntity("discountCodeBasicCreate"))?;

        require(
            payload.code_discount_node,
            payload.user_errors,
            "codeDiscountNode",
        )
        .map(DiscountRecord::from)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeleteAutomaticData {
    discount_automatic_delete: Option<DeleteAutomaticPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAutomaticPayload {
    deleted_automatic_discount_id: Option<String>,

    #[serde(default)]
    user_errors: Vec<UserError>,
}

impl DeleteAutomaticData {
    pub(super) fn into_result(self) -> Result<(), StoreError> {
        let payload = self
            .discount_automatic_delete
            .ok_or(StoreError::MissingEntity("discountAutomaticDelete"))?;

        require(
            payload.deleted_automatic_discount_id,
            payload.user_errors,
            "deletedAutomaticDiscountId",
        )
        .map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DeleteCodeData {
    discount_code_delete: Option<DeleteCodePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteCodePayload {
    deleted_code_discount_id: Option<String>,

    #[serde(default)]
    user_errors: Vec<UserError>,
}

impl DeleteCodeData {
    pub(super) fn into_result(self) -> Result<(), StoreError> {
        let payload = self
            .discount_code_delete
            .ok_or(StoreError::MissingEntity("discountCodeDelete"))?;

        require(
            payload.deleted_code_discount_id,
            payload.user_errors,
            "deletedCodeDiscountId",
        )
        .map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ShopData {
    shop: Option<ShopBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShopBody {
    name: String,
    currency_code: String,
    plan: Option<PlanBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanBody {
    display_name: Option<String>,
}

impl ShopData {
    pub(super) fn into_shop_info(self) -> Result<ShopInfo, StoreError> {
        let shop = self.shop.ok_or(StoreError::MissingEntity("shop"))?;

        Ok(ShopInfo {
            name: shop.name,
            currency_code: shop.currency_code,
            plan_name: shop.plan.and_then(|plan| plan.display_name),
        })
    }
}

//! Shopify Admin GraphQL adapter.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{Span, debug, info};
use trellis::records::{AutomaticDiscountId, CodeDiscountId, DiscountRecord};

use crate::store::{DiscountStore, NewAutomaticDiscount, NewCodeDiscount, ShopInfo, StoreError};

mod config;
mod documents;
mod inputs;
mod responses;

pub use config::{AccessToken, DEFAULT_API_VERSION, ShopifyConfig};

use inputs::{AutomaticBasicInput, CodeBasicInput};
use responses::{
    AutomaticDiscountsData, CodeDiscountsData, Connection, CreateAutomaticData, CreateCodeData,
    DeleteAutomaticData, DeleteCodeData, GraphQlResponse, ShopData,
};

/// Listing page size.
const PAGE_SIZE: u32 = 50;

/// Header carrying the Admin API access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// HTTP client for the Shopify Admin GraphQL API.
#[derive(Debug, Clone)]
pub struct ShopifyAdminClient {
    config: ShopifyConfig,
    endpoint: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

impl ShopifyAdminClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: ShopifyConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            config,
            http: Client::new(),
        }
    }

    /// Shop domain this client talks to.
    #[must_use]
    pub fn shop_domain(&self) -> &str {
        &self.config.shop_domain
    }

    /// POST one GraphQL document and unwrap its envelope.
    async fn execute<V, T>(&self, query: &str, variables: V) -> Result<T, StoreError>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCESS_TOKEN_HEADER, self.config.access_token.expose())
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = format!("request failed with status {status}: {text}");

            return Err(match status {
                StatusCode::UNAUTHORIZED => StoreError::Authentication(detail),
                StatusCode::FORBIDDEN => StoreError::Permission(detail),
                StatusCode::TOO_MANY_REQUESTS => StoreError::Throttled,
                _ => StoreError::Protocol(detail),
            });
        }

        let body = response.text().await?;

        GraphQlResponse::<T>::from_body(&body)?.into_data()
    }

    /// Walk a connection to its last page.
    async fn paginate<T, N>(
        &self,
        query: &str,
        connection: impl Fn(T) -> Connection<N> + Send + Sync,
    ) -> Result<Vec<DiscountRecord>, StoreError>
    where
        T: DeserializeOwned + Send,
        N: Into<DiscountRecord> + Send,
    {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data: T = self
                .execute(query, json!({ "first": PAGE_SIZE, "after": after }))
                .await?;

            let page = connection(data);

            records.extend(page.edges.into_iter().map(|edge| edge.node.into()));

            let next = page
                .page_info
                .as_ref()
                .and_then(|info| info.next_cursor())
                .map(str::to_string);

            match next {
                Some(cursor) => {
                    debug!(fetched = records.len(), "fetching next page");
                    after = Some(cursor);
                }
                None => break,
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl DiscountStore for ShopifyAdminClient {
    #[tracing::instrument(
        name = "store.shopify.list_automatic_discounts",
        skip(self),
        fields(count = tracing::field::Empty),
        err
    )]
    async fn list_automatic_discounts(&self) -> Result<Vec<DiscountRecord>, StoreError> {
        let records = self
            .paginate(documents::AUTOMATIC_DISCOUNTS, |data: AutomaticDiscountsData| {
                data.automatic_discount_nodes
            })
            .await?;

        Span::current().record("count", tracing::field::display(records.len()));

        Ok(records)
    }

    #[tracing::instrument(
        name = "store.shopify.list_code_discounts",
        skip(self),
        fields(count = tracing::field::Empty),
        err
    )]
    async fn list_code_discounts(&self) -> Result<Vec<DiscountRecord>, StoreError> {
        let records = self
            .paginate(documents::CODE_DISCOUNTS, |data: CodeDiscountsData| {
                data.code_discount_nodes
            })
            .await?;

        Span::current().record("count", tracing::field::display(records.len()));

        Ok(records)
    }

    #[tracing::instrument(
        name = "store.shopify.create_automatic_discount",
        skip(self, discount),
        fields(
            title = %discount.title,
            value = %discount.value.value(),
            discount_id = tracing::field::Empty
        ),
        err
    )]
    async fn create_automatic_discount(
        &self,
        discount: &NewAutomaticDiscount,
    ) -> Result<DiscountRecord, StoreError> {
        let data: CreateAutomaticData = self
            .execute(
                documents::CREATE_AUTOMATIC,
                json!({ "discount": AutomaticBasicInput::from(discount) }),
            )
            .await?;

        let record = data.into_record()?;

        Span::current().record("discount_id", tracing::field::display(&record.id));

        info!(discount_id = %record.id, "created automatic discount");

        Ok(record)
    }

    #[tracing::instrument(
        name = "store.shopify.create_code_discount",
        skip(self, discount),
        fields(
            title = %discount.title,
            code = %discount.code,
            value = %discount.value.value(),
            discount_id = tracing::field::Empty
        ),
        err
    )]
    async fn create_code_discount(
        &self,
        discount: &NewCodeDiscount,
    ) -> Result<DiscountRecord, StoreError> {
        let data: CreateCodeData = self
            .execute(
                documents::CREATE_CODE,
                json!({ "discount": CodeBasicInput::from(discount) }),
            )
            .await?;

        let record = data.into_record()?;

        Span::current().record("discount_id", tracing::field::display(&record.id));

        info!(discount_id = %record.id, "created code discount");

        Ok(record)
    }

    #[tracing::instrument(
        name = "store.shopify.delete_automatic_discount",
        skip(self),
        fields(discount_id = %id),
        err
    )]
    async fn delete_automatic_discount(&self, id: &AutomaticDiscountId) -> Result<(), StoreError> {
        let data: DeleteAutomaticData = self
            .execute(documents::DELETE_AUTOMATIC, json!({ "id": id }))
            .await?;

        data.into_result()
    }

    #[tracing::instrument(
        name = "store.shopify.delete_code_discount",
        skip(self),
        fields(discount_id = %id),
        err
    )]
    async fn delete_code_discount(&self, id: &CodeDiscountId) -> Result<(), StoreError> {
        let data: DeleteCodeData = self
            .execute(documents::DELETE_CODE, json!({ "id": id }))
            .await?;

        data.into_result()
    }

    #[tracing::instrument(
        name = "store.shopify.read_shop_info",
        skip(self),
        fields(shop_domain = %self.config.shop_domain),
        err
    )]
    async fn read_shop_info(&self) -> Result<ShopInfo, StoreError> {
        let data: ShopData = self.execute(documents::SHOP, json!({})).await?;

        data.into_shop_info()
    }
}

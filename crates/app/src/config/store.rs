//! Store Config

use clap::Args;

use crate::store::shopify::{AccessToken, DEFAULT_API_VERSION, ShopifyConfig};

/// Shopify Admin API settings.
#[derive(Debug, Args)]
pub struct StoreConfig {
    /// Shop domain, e.g. example.myshopify.com
    #[arg(long, env = "SHOPIFY_SHOP_DOMAIN")]
    pub shop_domain: String,

    /// Admin API access token
    #[arg(long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Admin API version
    #[arg(long, env = "SHOPIFY_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,
}

impl StoreConfig {
    /// Client settings; the token is moved into a value that is wiped on drop.
    #[must_use]
    pub fn into_shopify_config(self) -> ShopifyConfig {
        ShopifyConfig {
            shop_domain: self.shop_domain,
            access_token: AccessToken::new(self.access_token),
            api_version: self.api_version,
        }
    }
}

//! Shopify connection settings.

use std::fmt;

use zeroize::Zeroize;

/// Admin API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2025-01";

/// Admin API access token. Wiped from memory on drop and never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl Drop for AccessToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Where and how to reach a shop's Admin API.
#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// Shop domain, e.g. `"example.myshopify.com"`.
    pub shop_domain: String,

    /// Admin API access token.
    pub access_token: AccessToken,

    /// Admin API version, e.g. `"2025-01"`.
    pub api_version: String,
}

impl ShopifyConfig {
    /// GraphQL endpoint for this shop and API version.
    #[must_use]
    pub fn endpoint(&self) -> String {
        let domain = self
            .shop_domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');

        format!("https://{domain}/admin/api/{}/graphql.json", self.api_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_token() {
        let config = ShopifyConfig {
            shop_domain: "example.myshopify.com".to_string(),
            access_token: AccessToken::new("shpat_secret"),
            api_version: DEFAULT_API_VERSION.to_string(),
        };

        let debug = format!("{config:?}");

        assert!(!debug.contains("shpat_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn endpoint_tolerates_schemes_and_trailing_slashes() {
        let config = ShopifyConfig {
            shop_domain: "https://example.myshopify.com/".to_string(),
            access_token: AccessToken::new("token"),
            api_version: "2025-01".to_string(),
        };

        assert_eq!(
            config.endpoint(),
            "https://example.myshopify.com/admin/api/2025-01/graphql.json"
        );
    }
}

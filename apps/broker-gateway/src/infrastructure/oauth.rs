//! OAuth authorization-code flow for vendors that support it.
//!
//! The authorize URL is built from static per-vendor configuration; the
//! callback code is exchanged server-to-server and the resulting token
//! bundle becomes the connection's credential blob, which then flows through
//! the same validate-then-persist path as directly supplied credentials.
//!
//! Vendors whose token exchange is not integrated return an explicit
//! `NotImplemented` error rather than a fabricated empty success.

use serde_json::Value;

use crate::config::{BrokersConfig, OAuthSettings};
use crate::domain::broker::{Credentials, Vendor};
use crate::error::GatewayError;

use super::broker::VendorHttpClient;

/// Vendor OAuth flows over the configured client settings.
pub struct OAuthFlow {
    config: BrokersConfig,
    http: VendorHttpClient,
}

impl OAuthFlow {
    /// Create the flow over the configured vendor endpoints.
    #[must_use]
    pub const fn new(config: BrokersConfig, http: VendorHttpClient) -> Self {
        Self { config, http }
    }

    fn settings(&self, vendor: Vendor) -> Result<&OAuthSettings, GatewayError> {
        self.config
            .endpoints(vendor)
            .oauth
            .as_ref()
            .ok_or(GatewayError::NotImplemented(vendor))
    }

    /// Build the vendor authorization URL the caller is redirected to.
    ///
    /// `state` is echoed back by the vendor on the callback and carries the
    /// caller's opaque owner reference.
    pub fn authorize_url(&self, vendor: Vendor, state: &str) -> Result<String, GatewayError> {
        let settings = self.settings(vendor)?;
        let mut url = url::Url::parse(&settings.auth_url)
            .map_err(|e| GatewayError::Internal(format!("bad auth_url for {vendor}: {e}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &settings.client_id)
            .append_pair("redirect_uri", &settings.redirect_uri)
            .append_pair("state", state);
        if !settings.scope.is_empty() {
            url.query_pairs_mut().append_pair("scope", &settings.scope);
        }

        Ok(url.to_string())
    }

    /// Exchange an authorization code for the vendor's token bundle, mapped
    /// into the credential fields the vendor's adapter expects.
    pub async fn exchange_code(
        &self,
        vendor: Vendor,
        code: &str,
    ) -> Result<Credentials, GatewayError> {
        // Vendors without an integrated token exchange fail loudly here.
        if !matches!(
            vendor,
            Vendor::Alpaca | Vendor::Binance | Vendor::Kraken | Vendor::Coinbase
        ) {
            return Err(GatewayError::NotImplemented(vendor));
        }

        let settings = self.settings(vendor)?;
        let body = serde_json::json!({
            "grant_type": "authorization_code",
            "code": code,
            "client_id": settings.client_id,
            "client_secret": settings.client_secret,
            "redirect_uri": settings.redirect_uri,
        });

        let response = self
            .http
            .execute(self.http.inner().post(&settings.token_url).json(&body))
            .await
            .map_err(GatewayError::from)?;

        tracing::info!(vendor = %vendor, "authorization code exchanged");
        Ok(Self::credentials_from(vendor, &response))
    }

    /// Map a token response into the credential fields the adapter reads.
    fn credentials_from(vendor: Vendor, response: &Value) -> Credentials {
        let field = |key: &str| {
            response
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match vendor {
            Vendor::Alpaca => Credentials::new()
                .with("access_token", field("access_token"))
                .with("refresh_token", field("refresh_token")),
            Vendor::Binance => Credentials::new()
                .with("api_key", field("api_key"))
                .with("api_secret", field("api_secret"))
                .with("access_token", field("access_token")),
            Vendor::Kraken => Credentials::new()
                .with("api_key", field("access_token"))
                .with("api_secret", field("refresh_token")),
            // The exchange passphrase cannot come from OAuth; the user
            // supplies it separately when completing the connection.
            Vendor::Coinbase => Credentials::new()
                .with("api_key", field("access_token"))
                .with("api_secret", field("refresh_token"))
                .with("passphrase", String::new()),
            _ => Credentials::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VendorEndpoints;
    use std::time::Duration;

    fn flow_with_alpaca_oauth() -> OAuthFlow {
        let mut config = BrokersConfig::default();
        config.alpaca = VendorEndpoints {
            base_url: "https://paper-api.alpaca.markets".into(),
            oauth: Some(OAuthSettings {
                auth_url: "https://app.alpaca.markets/oauth/authorize".into(),
                token_url: "https://api.alpaca.markets/oauth/token".into(),
                client_id: "client-1".into(),
                client_secret: "shh".into(),
                redirect_uri: "https://example.com/brokers/oauth/callback".into(),
                scope: "account:write trading".into(),
            }),
        };
        OAuthFlow::new(config, VendorHttpClient::new(Duration::from_secs(5)).unwrap())
    }

    #[test]
    fn authorize_url_carries_client_settings() {
        let flow = flow_with_alpaca_oauth();
        let url = flow.authorize_url(Vendor::Alpaca, "user-1").unwrap();
        assert!(url.starts_with("https://app.alpaca.markets/oauth/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("state=user-1"));
        assert!(url.contains("scope=account%3Awrite+trading"));
    }

    #[test]
    fn vendor_without_oauth_config_is_not_implemented() {
        let flow = flow_with_alpaca_oauth();
        let err = flow.authorize_url(Vendor::Cme, "user-1").unwrap_err();
        assert!(matches!(err, GatewayError::NotImplemented(Vendor::Cme)));
    }

    #[tokio::test]
    async fn stub_exchange_vendors_fail_loudly() {
        let flow = flow_with_alpaca_oauth();
        let err = flow
            .exchange_code(Vendor::Tradier, "code")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotImplemented(Vendor::Tradier)));
    }

    #[test]
    fn kraken_tokens_map_to_key_fields() {
        let response = serde_json::json!({
            "access_token": "tok",
            "refresh_token": "ref"
        });
        let creds = OAuthFlow::credentials_from(Vendor::Kraken, &response);
        assert_eq!(creds.get("api_key"), Some("tok"));
        assert_eq!(creds.get("api_secret"), Some("ref"));
    }

    #[test]
    fn alpaca_tokens_stay_bearer_shaped() {
        let response = serde_json::json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "expires_in": 3600
        });
        let creds = OAuthFlow::credentials_from(Vendor::Alpaca, &response);
        assert_eq!(creds.get("access_token"), Some("tok"));
        assert_eq!(creds.get("refresh_token"), Some("ref"));
    }
}

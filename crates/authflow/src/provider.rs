use std::time::Duration;

use {
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    reqwest::header::AUTHORIZATION,
    serde::Deserialize,
};

use {
    lobbykit_common::DeviceAuth,
    lobbykit_config::{ClientRegistration, ProviderConfig},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures from the identity provider.
///
/// The three-way pending/expired/denied classification is load-bearing for
/// the poll state machine; everything else is either transport trouble or a
/// plain rejection.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("authorization pending")]
    AuthorizationPending,

    #[error("device code expired")]
    CodeExpired,

    #[error("authorization denied by the user")]
    AccessDenied,

    #[error("provider rejected the request ({status}): {code}")]
    Rejected { status: u16, code: String },

    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Error body shape of the provider's OAuth endpoints. Spelling of the code
/// field varies across provider versions, hence the aliases.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default, rename = "errorCode", alias = "error")]
    error_code: Option<String>,
}

/// Match error codes by substring: the exact spelling
/// (`errors.com.….oauth.expired_token` vs plain `expired`) drifts between
/// provider versions, the meaning does not.
fn classify(status: u16, body: &ProviderErrorBody) -> ProviderError {
    let code = body.error_code.clone().unwrap_or_default();
    if code.contains("authorization_pending") {
        ProviderError::AuthorizationPending
    } else if code.contains("expired") {
        ProviderError::CodeExpired
    } else if code.contains("access_denied") {
        ProviderError::AccessDenied
    } else {
        ProviderError::Rejected { status, code }
    }
}

/// Response of the device-authorization endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub user_code: String,
    pub device_code: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_expires_in() -> u64 {
    600
}

fn default_interval() -> u64 {
    5
}

/// Response of the token endpoint. The provider mixes naming conventions:
/// `account_id` is snake case while `displayName` is camel case.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExchangeCode {
    code: String,
}

#[derive(Debug, Deserialize)]
struct MintedDeviceAuth {
    #[serde(rename = "deviceId")]
    device_id: String,
    #[serde(rename = "accountId")]
    account_id: String,
    secret: String,
}

/// Thin typed client over the identity provider's OAuth endpoints.
pub struct IdentityProvider {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl IdentityProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn device_registrations(&self) -> &[ClientRegistration] {
        &self.config.device_registrations
    }

    pub fn game_registration(&self) -> &ClientRegistration {
        &self.config.game_registration
    }

    /// Browser URL for the user, with the code and client id substituted.
    pub fn activation_url(&self, user_code: &str, client_id: &str) -> String {
        self.config
            .activation_url
            .replace("{user_code}", &urlencoding::encode(user_code))
            .replace("{client_id}", client_id)
    }

    fn basic(registration: &ClientRegistration) -> String {
        let pair = format!("{}:{}", registration.client_id, registration.client_secret);
        format!("Basic {}", BASE64.encode(pair))
    }

    async fn json_or_error<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let body: ProviderErrorBody = response.json().await.unwrap_or_default();
            Err(classify(status.as_u16(), &body))
        }
    }

    /// Start a device authorization under `registration`. Some registrations
    /// require the scope body present, others reject it, so the caller picks
    /// per attempt.
    pub async fn request_device_authorization(
        &self,
        registration: &ClientRegistration,
        with_scope: bool,
    ) -> Result<DeviceAuthorization, ProviderError> {
        let mut form: Vec<(&str, String)> = Vec::new();
        if with_scope {
            form.push(("scope", self.config.device_scope.clone()));
        }
        let response = self
            .http
            .post(&self.config.device_authorization_url)
            .header(AUTHORIZATION, Self::basic(registration))
            .form(&form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Self::json_or_error(response).await
    }

    /// One poll against the token endpoint with a device code.
    pub async fn poll_device_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<TokenGrant, ProviderError> {
        self.token_request(registration, &[
            ("grant_type", "device_code"),
            ("device_code", device_code),
        ])
        .await
    }

    /// Trade an access token for a one-time exchange code.
    pub async fn exchange_code(&self, access_token: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .get(&self.config.exchange_url)
            .bearer_auth(access_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let exchange: ExchangeCode = Self::json_or_error(response).await?;
        Ok(exchange.code)
    }

    /// Redeem an exchange code under the game-session registration. The
    /// scopes of the resulting token differ from the device-flow one; this
    /// is the token the rest of the system can actually log in with.
    pub async fn token_from_exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        self.token_request(&self.config.game_registration, &[
            ("grant_type", "exchange_code"),
            ("exchange_code", code),
        ])
        .await
    }

    /// Redeem a user-supplied one-time authorization code (manual fallback).
    pub async fn token_from_authorization_code(
        &self,
        code: &str,
    ) -> Result<TokenGrant, ProviderError> {
        self.token_request(&self.config.game_registration, &[
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .await
    }

    async fn token_request(
        &self,
        registration: &ClientRegistration,
        form: &[(&str, &str)],
    ) -> Result<TokenGrant, ProviderError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .header(AUTHORIZATION, Self::basic(registration))
            .form(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        Self::json_or_error(response).await
    }

    /// Mint a durable device credential for `account_id`.
    pub async fn mint_device_auth(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<DeviceAuth, ProviderError> {
        let url = format!("{}/{}/deviceAuth", self.config.account_base_url, account_id);
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        let minted: MintedDeviceAuth = Self::json_or_error(response).await?;
        Ok(DeviceAuth {
            device_id: minted.device_id,
            account_id: minted.account_id,
            secret: minted.secret,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn body(code: &str) -> ProviderErrorBody {
        ProviderErrorBody {
            error_code: Some(code.to_string()),
        }
    }

    #[test]
    fn classification_matches_by_substring() {
        assert!(matches!(
            classify(
                400,
                &body("errors.com.provider.account.oauth.authorization_pending")
            ),
            ProviderError::AuthorizationPending
        ));
        assert!(matches!(
            classify(400, &body("errors.com.provider.account.oauth.expired_token")),
            ProviderError::CodeExpired
        ));
        assert!(matches!(
            classify(400, &body("expired")),
            ProviderError::CodeExpired
        ));
        assert!(matches!(
            classify(400, &body("errors.com.provider.oauth.access_denied")),
            ProviderError::AccessDenied
        ));
    }

    #[test]
    fn unknown_codes_fall_through_to_rejected() {
        let err = classify(403, &body("errors.com.provider.oauth.grant_not_allowed"));
        assert!(matches!(err, ProviderError::Rejected { status: 403, .. }));
    }

    #[test]
    fn missing_error_body_is_rejected_with_empty_code() {
        let err = classify(500, &ProviderErrorBody::default());
        match err {
            ProviderError::Rejected { status, code } => {
                assert_eq!(status, 500);
                assert!(code.is_empty());
            },
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn error_body_accepts_either_spelling() {
        let camel: ProviderErrorBody =
            serde_json::from_str(r#"{"errorCode": "expired"}"#).unwrap();
        assert_eq!(camel.error_code.as_deref(), Some("expired"));

        let plain: ProviderErrorBody = serde_json::from_str(r#"{"error": "expired"}"#).unwrap();
        assert_eq!(plain.error_code.as_deref(), Some("expired"));
    }

    #[test]
    fn device_authorization_defaults_apply() {
        let parsed: DeviceAuthorization =
            serde_json::from_str(r#"{"user_code": "ABCD1234", "device_code": "dc"}"#).unwrap();
        assert_eq!(parsed.expires_in, 600);
        assert_eq!(parsed.interval, 5);
    }

    #[test]
    fn activation_url_substitutes_and_escapes() {
        let mut config = ProviderConfig::default();
        config.activation_url =
            "https://id.example/activate?user_code={user_code}&client_id={client_id}".into();
        let provider = IdentityProvider::new(config);
        let url = provider.activation_url("AB CD", "client-1");
        assert_eq!(
            url,
            "https://id.example/activate?user_code=AB%20CD&client_id=client-1"
        );
    }

    #[test]
    fn basic_header_is_base64_of_id_and_secret() {
        let header = IdentityProvider::basic(&ClientRegistration {
            client_id: "id".into(),
            client_secret: "secret".into(),
        });
        assert_eq!(header, format!("Basic {}", BASE64.encode("id:secret")));
    }
}

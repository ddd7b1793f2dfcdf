use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder, header::CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    error::{ApiError, Result},
    http::{DEFAULT_TIMEOUT, build_client, checked_body, decode},
    model::{MowerCommand, MowerRef},
};

use super::MowerApi;

const AUTH_SERVICE: &str = "Husqvarna authentication";
const API_SERVICE: &str = "Automower Connect";
const DEFAULT_AUTH_URL: &str = "https://api.authentication.husqvarnagroup.dev/v1/oauth2/token";
const DEFAULT_API_URL: &str = "https://api.amc.husqvarna.dev/v1";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;
/// Lifetime assumed when the token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const MAX_TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Client for the Automower Connect API using OAuth client credentials.
#[derive(Debug)]
pub struct HusqvarnaClient {
    application_key: String,
    application_secret: String,
    auth_url: String,
    api_url: String,
    http: Client,
    token: Mutex<Option<AccessToken>>,
}

impl HusqvarnaClient {
    pub fn new(application_key: String, application_secret: String) -> Result<Self> {
        Self::with_urls(
            application_key,
            application_secret,
            DEFAULT_AUTH_URL.to_string(),
            DEFAULT_API_URL.to_string(),
            DEFAULT_TIMEOUT,
        )
    }

    pub fn with_urls(
        application_key: String,
        application_secret: String,
        auth_url: String,
        api_url: String,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        Ok(Self {
            application_key,
            application_secret,
            auth_url,
            api_url,
            http: build_client(timeout)?,
            token: Mutex::new(None),
        })
    }

    /// Fetches a fresh token with the client-credentials grant.
    pub async fn authenticate(&self) -> Result<AccessToken> {
        tracing::info!("authenticating with Husqvarna API");

        let res = self
            .token_request()
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                service: AUTH_SERVICE,
                source,
            })?;

        let body = checked_body(AUTH_SERVICE, res).await?;
        let token = parse_token(&body, Utc::now())?;
        tracing::info!(expires_at = %token.expires_at, "authentication successful");
        Ok(token)
    }

    /// Returns the cached token, re-authenticating once it is about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid_at(Utc::now())) {
            return Ok(token.value.clone());
        }

        let token = self.authenticate().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn token_request(&self) -> RequestBuilder {
        self.http.post(&self.auth_url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.application_key.as_str()),
            ("client_secret", self.application_secret.as_str()),
            ("scope", "amc:api"),
        ])
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header("Authorization-Provider", "husqvarna")
            .header("X-Api-Key", &self.application_key)
    }

    fn mowers_request(&self, token: &str) -> RequestBuilder {
        let url = format!("{}/mowers", self.api_url);
        self.authorized(self.http.get(url), token)
            .header(CONTENT_TYPE, "application/json")
    }

    fn action_request(
        &self,
        token: &str,
        mower_id: &str,
        command: MowerCommand,
    ) -> RequestBuilder {
        let url = format!("{}/mowers/{}/actions", self.api_url, mower_id);
        let payload = json!({ "data": { "type": command.as_str() } });
        self.authorized(self.http.post(url), token)
            .header(CONTENT_TYPE, "application/vnd.api+json")
            .body(payload.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AmcSystem {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AmcAttributes {
    system: Option<AmcSystem>,
}

#[derive(Debug, Deserialize)]
struct AmcMower {
    id: String,
    attributes: Option<AmcAttributes>,
}

#[derive(Debug, Deserialize)]
struct AmcMowerList {
    data: Vec<AmcMower>,
}

/// `expires_in` is clamped to `0..=MAX_TOKEN_LIFETIME_SECS`.
fn parse_token(body: &str, now: DateTime<Utc>) -> Result<AccessToken> {
    let parsed: TokenResponse = decode(AUTH_SERVICE, body)?;
    let lifetime = parsed
        .expires_in
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        .clamp(0, MAX_TOKEN_LIFETIME_SECS);
    let expires_at = now
        .checked_add_signed(Duration::seconds(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    Ok(AccessToken {
        value: parsed.access_token,
        expires_at,
    })
}

/// Mowers without a system name are listed under their id.
fn parse_mowers(body: &str) -> Result<Vec<MowerRef>> {
    let parsed: AmcMowerList = decode(API_SERVICE, body)?;
    Ok(parsed
        .data
        .into_iter()
        .map(|mower| {
            let name = mower
                .attributes
                .and_then(|a| a.system)
                .and_then(|s| s.name)
                .unwrap_or_else(|| mower.id.clone());
            MowerRef { id: mower.id, name }
        })
        .collect())
}

#[async_trait]
impl MowerApi for HusqvarnaClient {
    async fn list_mowers(&self) -> Result<Vec<MowerRef>> {
        let token = self.access_token().await?;
        let res = self
            .mowers_request(&token)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                service: API_SERVICE,
                source,
            })?;

        let body = checked_body(API_SERVICE, res).await?;
        let mowers = parse_mowers(&body)?;
        tracing::debug!(count = mowers.len(), "fetched mowers");
        Ok(mowers)
    }

    async fn send_command(&self, mower_id: &str, command: MowerCommand) -> Result<()> {
        tracing::info!(mower_id, %command, "sending mower command");

        let token = self.access_token().await?;
        let res = self
            .action_request(&token, mower_id, command)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                service: API_SERVICE,
                source,
            })?;

        checked_body(API_SERVICE, res).await?;
        tracing::info!(mower_id, %command, "mower command accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client(timeout: std::time::Duration) -> HusqvarnaClient {
        HusqvarnaClient::with_urls(
            "KEY".into(),
            "SECRET".into(),
            "http://auth.test/oauth2/token".into(),
            "http://amc.test/v1".into(),
            timeout,
        )
        .unwrap()
    }

    fn header<'a>(req: &'a reqwest::Request, name: &str) -> &'a str {
        req.headers()[name].to_str().unwrap()
    }

    fn body_of(req: &reqwest::Request) -> &[u8] {
        req.body().and_then(|b| b.as_bytes()).unwrap()
    }

    #[test]
    fn token_request_is_a_client_credentials_form() {
        let req = client(DEFAULT_TIMEOUT).token_request().build().unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.url().as_str(), "http://auth.test/oauth2/token");
        assert_eq!(
            header(&req, "content-type"),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            body_of(&req),
            b"grant_type=client_credentials&client_id=KEY&client_secret=SECRET&scope=amc%3Aapi"
        );
    }

    #[test]
    fn mowers_request_carries_vendor_headers() {
        let req = client(DEFAULT_TIMEOUT).mowers_request("tok").build().unwrap();

        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(req.url().as_str(), "http://amc.test/v1/mowers");
        assert_eq!(header(&req, "authorization"), "Bearer tok");
        assert_eq!(header(&req, "authorization-provider"), "husqvarna");
        assert_eq!(header(&req, "x-api-key"), "KEY");
        assert_eq!(header(&req, "content-type"), "application/json");
    }

    #[test]
    fn action_request_posts_json_api_document() {
        let req = client(DEFAULT_TIMEOUT)
            .action_request("tok", "d2f1-01", MowerCommand::ParkUntilFurtherNotice)
            .build()
            .unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.url().path(), "/v1/mowers/d2f1-01/actions");
        assert_eq!(header(&req, "authorization"), "Bearer tok");
        assert_eq!(header(&req, "authorization-provider"), "husqvarna");
        assert_eq!(header(&req, "x-api-key"), "KEY");
        assert_eq!(header(&req, "content-type"), "application/vnd.api+json");

        let body: serde_json::Value = serde_json::from_slice(body_of(&req)).unwrap();
        assert_eq!(body, json!({"data": {"type": "ParkUntilFurtherNotice"}}));
    }

    #[test]
    fn huge_expiry_is_capped() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let body = format!(r#"{{"access_token":"abc","expires_in":{}}}"#, i64::MAX);

        let token = parse_token(&body, now).unwrap();

        assert_eq!(
            token.expires_at,
            now + Duration::seconds(MAX_TOKEN_LIFETIME_SECS)
        );
    }

    #[test]
    fn negative_expiry_is_already_expired() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let token = parse_token(r#"{"access_token":"abc","expires_in":-500}"#, now).unwrap();

        assert_eq!(token.expires_at, now);
        assert!(!token.is_valid_at(now));
    }

    #[tokio::test]
    async fn unresponsive_auth_server_times_out() {
        let url = crate::http::silent_server().await;
        let client = HusqvarnaClient::with_urls(
            "KEY".into(),
            "SECRET".into(),
            format!("{url}/oauth2/token"),
            url,
            std::time::Duration::from_millis(200),
        )
        .unwrap();

        let res = tokio::time::timeout(std::time::Duration::from_secs(5), client.list_mowers())
            .await
            .expect("request should give up on its own");

        match res {
            Err(ApiError::Transport { service, source }) => {
                assert_eq!(service, AUTH_SERVICE);
                assert!(source.is_timeout());
            }
            other => panic!("expected a transport timeout, got {other:?}"),
        }
    }

    #[test]
    fn parses_token_with_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let body = r#"{"access_token":"abc","scope":"iam:read amc:api","expires_in":86399,"provider":"husqvarna","token_type":"Bearer"}"#;

        let token = parse_token(body, now).unwrap();

        assert_eq!(token.value, "abc");
        assert_eq!(token.expires_at, now + Duration::seconds(86399));
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + Duration::seconds(86399 - 30)));
    }

    #[test]
    fn token_without_expiry_gets_default_lifetime() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let token = parse_token(r#"{"access_token":"abc"}"#, now).unwrap();
        assert_eq!(
            token.expires_at,
            now + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS)
        );
    }

    #[test]
    fn parses_mower_list() {
        let body = r#"{
            "data": [
                {
                    "type": "mower",
                    "id": "d2f1-01",
                    "attributes": {
                        "system": {"name": "Front lawn", "model": "450X", "serialNumber": 123},
                        "battery": {"batteryPercent": 77}
                    }
                },
                {"type": "mower", "id": "d2f1-02", "attributes": {}}
            ]
        }"#;

        let mowers = parse_mowers(body).unwrap();

        assert_eq!(
            mowers,
            vec![
                MowerRef {
                    id: "d2f1-01".into(),
                    name: "Front lawn".into()
                },
                MowerRef {
                    id: "d2f1-02".into(),
                    name: "d2f1-02".into()
                },
            ]
        );
    }

    #[test]
    fn empty_mower_list_is_ok() {
        assert!(parse_mowers(r#"{"data": []}"#).unwrap().is_empty());
    }

    #[test]
    fn malformed_mower_list_is_a_decode_error() {
        let err = parse_mowers(r#"{"errors": []}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}

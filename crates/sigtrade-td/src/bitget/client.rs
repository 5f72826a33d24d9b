//! Bitget mix-contract REST client.
//!
//! Low-level signed requests against the v1 mix API. Every response body is
//! decoded as the standard envelope `{code, msg, data}`; code `"00000"` is
//! success. The envelope is decoded even on non-2xx statuses because Bitget
//! reports order rejections as HTTP 400 with the reason in `msg`.
//!
//! # REST endpoints
//!
//! | Operation          | Method | Path                                     |
//! |--------------------|--------|------------------------------------------|
//! | Ticker             | GET    | `/api/mix/v1/market/ticker`              |
//! | All positions      | GET    | `/api/mix/v1/position/allPosition`       |
//! | Place order        | POST   | `/api/mix/v1/order/placeOrder`           |
//! | Set position mode  | POST   | `/api/mix/v1/account/setPositionMode`    |

use reqwest::Method;
use serde::Deserialize;
use sigtrade_core::error::ApiError;
use sigtrade_core::time_util::now_ms;
use tracing::debug;

use super::auth;

pub const TICKER_PATH: &str = "/api/mix/v1/market/ticker";
pub const ALL_POSITION_PATH: &str = "/api/mix/v1/position/allPosition";
pub const PLACE_ORDER_PATH: &str = "/api/mix/v1/order/placeOrder";
pub const SET_POSITION_MODE_PATH: &str = "/api/mix/v1/account/setPositionMode";

/// Success code of the response envelope.
const SUCCESS_CODE: &str = "00000";

/// Response envelope shared by all mix endpoints.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: serde_json::Value,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

impl Envelope {
    fn code(&self) -> String {
        match &self.code {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Signed REST client for one Bitget API key.
pub struct MixClient {
    /// Shared HTTP client (carries the request timeout).
    http: reqwest::Client,
    api_key: String,
    secret_key: String,
    passphrase: String,
    /// REST base URL without trailing slash.
    base_url: String,
    test_mode: bool,
}

impl MixClient {
    /// Create a new client (no connections opened yet).
    pub fn new(
        api_key: String,
        secret_key: String,
        passphrase: String,
        base_url: String,
        test_mode: bool,
        timeout: std::time::Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            secret_key,
            passphrase,
            base_url,
            test_mode,
        })
    }

    /// Signed GET with alphabetically sorted query parameters.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<serde_json::Value, ApiError> {
        let query = auth::sorted_query(params);
        let request_path = auth::request_path(path, &query);
        self.send(Method::GET, &request_path, String::new()).await
    }

    /// Signed POST with a JSON body.
    pub async fn post<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<serde_json::Value, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Decode(format!("failed to encode body: {e}")))?;
        self.send(Method::POST, path, body).await
    }

    /// Sign, send, and unwrap the response envelope.
    async fn send(&self, method: Method, request_path: &str, body: String) -> Result<serde_json::Value, ApiError> {
        let timestamp = now_ms().to_string();
        let signature = auth::sign(&self.secret_key, &timestamp, method.as_str(), request_path, &body);
        let url = format!("{}{request_path}", self.base_url);

        debug!("[bitget-td] {method} {request_path}");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("ACCESS-KEY", &self.api_key)
            .header("ACCESS-SIGN", signature)
            .header("ACCESS-TIMESTAMP", &timestamp)
            .header("ACCESS-PASSPHRASE", &self.passphrase)
            .header("Content-Type", "application/json")
            .header("X-SIMULATED-TRADING", if self.test_mode { "1" } else { "0" });
        if method != Method::GET {
            req = req.body(body);
        }

        let resp = req.send().await.map_err(|e| ApiError::Transport(format!("{request_path}: {e}")))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| ApiError::Transport(format!("{request_path}: {e}")))?;

        decode_envelope(status, &text)
    }
}

/// Decode an envelope body into its `data` payload or a classified error.
pub(crate) fn decode_envelope(status: reqwest::StatusCode, text: &str) -> Result<serde_json::Value, ApiError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(|e| {
        let snippet: String = text.chars().take(200).collect();
        ApiError::Decode(format!("HTTP {status}: {e}: {snippet}"))
    })?;

    let code = envelope.code();
    if code == SUCCESS_CODE {
        Ok(envelope.data)
    } else {
        let msg = envelope.msg.unwrap_or_else(|| format!("HTTP {status} without message"));
        Err(ApiError::rejected(code, msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn success_returns_data() {
        let data = decode_envelope(StatusCode::OK, r#"{"code":"00000","msg":"success","data":{"last":"1.5"}}"#).unwrap();
        assert_eq!(data["last"], "1.5");
    }

    #[test]
    fn http_400_rejection_is_classified() {
        let err = decode_envelope(
            StatusCode::BAD_REQUEST,
            r#"{"code":"40808","msg":"checkBDScale error value=0.123456 checkScale=4 must be a multiple","data":null}"#,
        )
        .unwrap_err();
        assert!(err.is_precision());
    }

    #[test]
    fn other_rejection_is_classified() {
        let err = decode_envelope(StatusCode::BAD_REQUEST, r#"{"code":"40762","msg":"The order size is greater than the max open size"}"#)
            .unwrap_err();
        assert!(matches!(err, ApiError::OtherRejected { code, .. } if code == "40762"));
    }

    #[test]
    fn numeric_code_is_accepted() {
        let err = decode_envelope(StatusCode::BAD_REQUEST, r#"{"code":40009,"msg":"sign signature error"}"#).unwrap_err();
        assert!(matches!(err, ApiError::OtherRejected { code, .. } if code == "40009"));
    }

    #[test]
    fn non_json_body_is_decode_error() {
        let err = decode_envelope(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(m) if m.contains("502")));
    }
}

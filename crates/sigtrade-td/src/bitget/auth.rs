//! Bitget authentication and request signing utilities.
//!
//! Every private REST request carries an `ACCESS-SIGN` header: the Base64
//! encoding of an HMAC-SHA256 digest over
//!
//! ```text
//! timestamp + METHOD + requestPath [+ "?" + queryString] + body
//! ```
//!
//! GET parameters are sorted alphabetically before both signing and sending,
//! so the signed path and the transmitted path are byte-identical.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the request signature and return it Base64-encoded.
///
/// # Arguments
///
/// * `secret` — the API secret key.
/// * `timestamp` — milliseconds since epoch, as sent in `ACCESS-TIMESTAMP`.
/// * `method` — HTTP method; uppercased before signing.
/// * `request_path` — path including the sorted query string, if any.
/// * `body` — the exact JSON body sent (empty for GET).
pub fn sign(secret: &str, timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.as_bytes());
    mac.update(method.to_ascii_uppercase().as_bytes());
    mac.update(request_path.as_bytes());
    mac.update(body.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Build a URL-encoded query string with keys sorted alphabetically.
///
/// # Example
///
/// ```ignore
/// let q = sorted_query(&[("productType", "umcbl"), ("marginCoin", "USDT")]);
/// assert_eq!(q, "marginCoin=USDT&productType=umcbl");
/// ```
pub fn sorted_query(params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Join a path and its (already sorted) query string.
pub fn request_path(path: &str, query: &str) -> String {
    if query.is_empty() { path.to_string() } else { format!("{path}?{query}") }
}

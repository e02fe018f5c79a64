//! # Diagram upload (S3)
//!
//! [`S3Store`] implements [`ObjectStore`] with a single SigV4-signed `PUT`
//! per diagram. Objects land at `{object_name}.png` in the configured bucket
//! and are addressed afterwards through the bucket's public virtual-hosted
//! URL, which is what ends up embedded in the published page.
//!
//! Signing uses HMAC-SHA256 from the `hmac` + `sha2` crates; no AWS SDK is
//! involved. A custom endpoint (MinIO, LocalStack, a test server) switches
//! requests to path-style addressing: `{endpoint}/{bucket}/{key}`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use newsletter_core::contract::ObjectStore;
use newsletter_core::error::UploadError;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bucket coordinates and credentials.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Overrides `https://{bucket}.s3.{region}.amazonaws.com` for requests.
    pub endpoint: Option<String>,
}

impl S3Settings {
    /// URL the stored object is reachable at once uploaded.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }

    /// URL the `PUT` is sent to.
    fn request_url(&self, key: &str) -> String {
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        match &self.endpoint {
            Some(endpoint) => format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket,
                encoded_key
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, encoded_key
            ),
        }
    }
}

pub struct S3Store {
    client: Client,
    settings: S3Settings,
}

impl S3Store {
    pub fn new(settings: S3Settings) -> Result<Self, UploadError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        tracing::info!(
            bucket = %settings.bucket,
            region = %settings.region,
            custom_endpoint = settings.endpoint.is_some(),
            "Initialized S3Store"
        );
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn store_png(&self, object_name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let key = format!("{object_name}.png");
        let url = self.settings.request_url(&key);
        let parsed = Url::parse(&url).map_err(|e| UploadError::Transport(e.to_string()))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => return Err(UploadError::Transport(format!("no host in {url}"))),
        };

        let payload_hash = hex_sha256(&bytes);
        let signed = sign_request(&SigningInput {
            method: "PUT",
            host: &host,
            canonical_uri: parsed.path(),
            payload_hash: &payload_hash,
            region: &self.settings.region,
            access_key_id: &self.settings.access_key_id,
            secret_access_key: &self.settings.secret_access_key,
            now: Utc::now(),
        })?;

        tracing::info!(key = %key, bytes = bytes.len(), "[DIAGRAM] Uploading to S3");
        let response = self
            .client
            .put(parsed)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .header("Content-Type", "image/png")
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "[DIAGRAM] S3 request failed");
                UploadError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(key = %key, status = status.as_u16(), "[DIAGRAM] S3 PutObject rejected");
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let public_url = self.settings.public_url(&key);
        tracing::info!(url = %public_url, "[DIAGRAM] Diagram uploaded");
        Ok(public_url)
    }
}

// ============ AWS SigV4 Helpers ============

pub struct SigningInput<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub canonical_uri: &'a str,
    pub payload_hash: &'a str,
    pub region: &'a str,
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub authorization: String,
    pub amz_date: String,
}

/// Sign a request without query string over `host`, `x-amz-content-sha256`
/// and `x-amz-date`.
pub fn sign_request(input: &SigningInput<'_>) -> Result<SignedRequest, UploadError> {
    let date_stamp = input.now.format("%Y%m%d").to_string();
    let amz_date = input.now.format("%Y%m%dT%H%M%SZ").to_string();

    // Already sorted by name.
    let headers = [
        ("host", input.host),
        ("x-amz-content-sha256", input.payload_hash),
        ("x-amz-date", amz_date.as_str()),
    ];
    let signed_headers = headers.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(";");
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        input.method, input.canonical_uri, canonical_headers, signed_headers, input.payload_hash
    );

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, input.region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(input.secret_access_key, &date_stamp, input.region, "s3")?;
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

    Ok(SignedRequest {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            input.access_key_id, credential_scope, signed_headers, signature
        ),
        amz_date,
    })
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, UploadError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| UploadError::Transport(format!("signing key rejected: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, UploadError> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// RFC 3986 encoding; only `A-Z a-z 0-9 - _ . ~` pass through.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => result.push_str(&format!("%{byte:02X}")),
        }
    }
    result
}

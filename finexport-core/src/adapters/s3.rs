//! S3 object store
//!
//! Uploads objects with a single SigV4-signed `PUT`. Works against AWS
//! (virtual-hosted addressing) and S3-compatible endpoints such as MinIO
//! (path-style addressing, selected by `AWS_ENDPOINT_URL`).

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::{AwsCredentials, StoreConfig};
use crate::domain::result::{Error, Result};
use crate::ports::{ObjectStore, PutReceipt};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
const MAX_ERROR_CODE_LEN: usize = 64;

/// S3 object store
#[derive(Debug)]
pub struct S3ObjectStore {
    client: Client,
    region: String,
    endpoint: Option<Url>,
    credentials: AwsCredentials,
}

/// Headers to attach to a signed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub url: String,
    pub host: String,
    pub amz_date: String,
    pub payload_hash: String,
    pub authorization: String,
}

impl S3ObjectStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let credentials = config.credentials.clone().ok_or_else(|| {
            Error::config(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are required for the S3 store",
            )
        })?;

        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| {
                Url::parse(e).map_err(|err| {
                    Error::config(format!("Invalid AWS_ENDPOINT_URL '{}': {}", e, err))
                })
            })
            .transpose()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            region: config.region.clone(),
            endpoint,
            credentials,
        })
    }

    /// Sign a `PUT` of `body` to `bucket/key` at time `now`
    pub fn sign_put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignedRequest> {
        let (origin, host, canonical_uri) = self.locate(bucket, key)?;
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(body));

        let mut headers = vec![
            ("host", host.clone()),
            ("x-amz-content-sha256", payload_hash.clone()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.expose_secret().to_string()));
        }

        let canonical = canonical_request("PUT", &canonical_uri, &headers, &payload_hash);
        let scope = format!("{}/{}/{}/aws4_request", date_stamp, self.region, SERVICE);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            SIGNING_ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );
        let signing_key = derive_signing_key(
            self.credentials.secret_access_key.expose_secret(),
            &date_stamp,
            &self.region,
            SERVICE,
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));
        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        Ok(SignedRequest {
            url: format!("{}{}", origin, canonical_uri),
            host,
            amz_date,
            payload_hash,
            authorization: format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                SIGNING_ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
            ),
        })
    }

    /// (origin, host header, canonical URI) for an object
    fn locate(&self, bucket: &str, key: &str) -> Result<(String, String, String)> {
        if bucket.is_empty() {
            return Err(Error::store_write("bucket name must not be empty"));
        }
        let encoded_key = uri_encode(key.trim_start_matches('/'), false);

        match &self.endpoint {
            Some(endpoint) => {
                let host_name = endpoint.host_str().ok_or_else(|| {
                    Error::config(format!("AWS_ENDPOINT_URL '{}' has no host", endpoint))
                })?;
                let host = match endpoint.port() {
                    Some(port) => format!("{}:{}", host_name, port),
                    None => host_name.to_string(),
                };
                let origin = format!("{}://{}", endpoint.scheme(), host);
                let uri = format!("/{}/{}", uri_encode(bucket, true), encoded_key);
                Ok((origin, host, uri))
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.region);
                Ok((format!("https://{}", host), host, format!("/{}", encoded_key)))
            }
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        "s3"
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<PutReceipt> {
        let signed = self.sign_put(bucket, key, body, Utc::now())?;

        let mut request = self
            .client
            .put(&signed.url)
            .header("authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .header("content-type", "text/csv; charset=utf-8")
            .body(body.to_vec());
        if let Some(token) = &self.credentials.session_token {
            request = request.header("x-amz-security-token", token.expose_secret());
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                Error::store_write(format!(
                    "Upload to s3://{}/{} timed out after {} seconds",
                    bucket, key, REQUEST_TIMEOUT_SECS
                ))
            } else {
                Error::store_write(format!("Upload to s3://{}/{} failed: {}", bucket, key, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            let code = error_code(&text);
            return Err(Error::store_write(format!(
                "S3 rejected s3://{}/{}: HTTP {} ({})",
                bucket,
                key,
                status.as_u16(),
                code
            )));
        }

        Ok(PutReceipt {
            bucket: bucket.to_string(),
            key: key.to_string(),
            bytes_written: body.len(),
        })
    }
}

fn canonical_request(
    method: &str,
    canonical_uri: &str,
    headers: &[(&str, String)],
    payload_hash: &str,
) -> String {
    // Header names are already lowercase and sorted
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");
    format!(
        "{}\n{}\n\n{}\n{}\n{}",
        method, canonical_uri, canonical_headers, signed_headers, payload_hash
    )
}

/// SigV4 signing key for a date, region and service
pub fn derive_signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encode everything but RFC 3986 unreserved characters
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// `<Code>` of an S3 error document, restricted to a short identifier
fn error_code(text: &str) -> String {
    let code: String = xml_tag(text, "Code")
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(MAX_ERROR_CODE_LEN)
        .collect();
    if code.is_empty() {
        "unknown".to_string()
    } else {
        code
    }
}

fn xml_tag<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(&text[start..end])
}

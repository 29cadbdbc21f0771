//! HTTP client for S3-compatible endpoints (MinIO, AWS S3).
//!
//! Requests use path-style addressing and SigV4 signing. The client is
//! cheap to clone and thread-safe; the server shares one behind an
//! `Arc` and swaps it when connection settings change.

use crate::error::StoreError;
use crate::sigv4::{self, SigningKey, EMPTY_PAYLOAD_SHA256};
use crate::store::ObjectStore;
use crate::types::{BucketInfo, BucketState, DirListing, FetchedObject, ListPage};
use crate::xml;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bucketwatch_core::S3Settings;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, Method, Response, Url};
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT_SECS: u64 = 5;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DELETE_BATCH_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct S3Client {
    http: Client,
    endpoint: Url,
    host: String,
    key: SigningKey,
}

impl S3Client {
    pub fn new(settings: &S3Settings) -> Result<Self, StoreError> {
        if !settings.is_complete() {
            return Err(StoreError::Unconfigured);
        }

        let endpoint = Url::parse(settings.endpoint_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Network(format!("Invalid endpoint URL: {}", e)))?;

        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(StoreError::Network(
                    "Endpoint URL has no host".to_string(),
                ))
            }
        };

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Network(format!("Could not build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            host,
            key: SigningKey {
                access_key: settings.access_key.clone(),
                secret_key: settings.secret_key.clone(),
                region: settings.region.clone(),
            },
        })
    }

    /// Builds a client and verifies the endpoint answers.
    pub async fn connect(settings: &S3Settings) -> Result<Self, StoreError> {
        let client = Self::new(settings)?;
        client.check().await?;
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn raw_path(bucket: Option<&str>, key: Option<&str>) -> String {
        match (bucket, key) {
            (Some(b), Some(k)) => format!("/{}/{}", b, k),
            (Some(b), None) => format!("/{}", b),
            _ => "/".to_string(),
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(REQUEST_TIMEOUT_SECS)
        } else if e.is_connect() {
            StoreError::Connection(self.endpoint.to_string())
        } else {
            StoreError::Network(e.to_string())
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn send(
        &self,
        method: Method,
        bucket: Option<&str>,
        key: Option<&str>,
        query: &[(String, String)],
        body: Option<Bytes>,
        content_type: Option<&str>,
        content_md5: Option<String>,
        context: &str,
    ) -> Result<Response, StoreError> {
        let path = Self::raw_path(bucket, key);
        let payload_hash = match &body {
            Some(b) => sigv4::sha256_hex(b),
            None => EMPTY_PAYLOAD_SHA256.to_string(),
        };

        let signature = sigv4::sign(
            &self.key,
            method.as_str(),
            &self.host,
            &path,
            query,
            &payload_hash,
            Utc::now(),
            &[],
        );

        let mut url = format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            self.host,
            sigv4::uri_encode(&path, true)
        );
        let canonical = sigv4::canonical_query(query);
        if !canonical.is_empty() {
            url.push('?');
            url.push_str(&canonical);
        }

        debug!(method = %method, %url, "sending S3 request");

        let mut request = self
            .http
            .request(method, &url)
            .header("authorization", signature.authorization)
            .header("x-amz-date", signature.amz_date)
            .header("x-amz-content-sha256", payload_hash);

        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }
        if let Some(md5) = content_md5 {
            request = request.header("content-md5", md5);
        }
        if let Some(b) = body {
            request = request.body(b);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body_text = response.text().await.unwrap_or_default();
        match xml::parse_error_body(&body_text) {
            Some((code, message)) => {
                warn!(%status, %code, %message, "S3 request failed");
                Err(StoreError::from_api(
                    code,
                    message,
                    status.as_u16(),
                    context,
                ))
            }
            None => Err(StoreError::Api {
                code: status
                    .canonical_reason()
                    .unwrap_or("UnknownError")
                    .to_string(),
                message: body_text,
                status: status.as_u16(),
            }),
        }
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut query = vec![("list-type".to_string(), "2".to_string())];
        if !prefix.is_empty() {
            query.push(("prefix".to_string(), prefix.to_string()));
        }
        if let Some(d) = delimiter {
            query.push(("delimiter".to_string(), d.to_string()));
        }
        if let Some(token) = continuation {
            query.push(("continuation-token".to_string(), token.to_string()));
        }

        let response = self
            .send(
                Method::GET,
                Some(bucket),
                None,
                &query,
                None,
                None,
                None,
                bucket,
            )
            .await?;

        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        xml::parse_object_list(&text)
    }

    async fn list_all_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .list_page(bucket, prefix, None, continuation.as_deref())
                .await?;
            keys.extend(page.objects.into_iter().map(|o| o.key));

            if page.is_truncated {
                match page.next_continuation_token {
                    Some(token) => continuation = Some(token),
                    None => {
                        return Err(StoreError::Parse(
                            "Truncated listing without a continuation token".to_string(),
                        ))
                    }
                }
            } else {
                return Ok(keys);
            }
        }
    }

    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        for chunk in keys.chunks(DELETE_BATCH_LIMIT) {
            let body = xml::build_delete_body(chunk);
            let digest = md5::compute(body.as_bytes());
            let content_md5 = BASE64.encode(digest.0);

            let response = self
                .send(
                    Method::POST,
                    Some(bucket),
                    None,
                    &[("delete".to_string(), String::new())],
                    Some(Bytes::from(body)),
                    Some("application/xml"),
                    Some(content_md5),
                    bucket,
                )
                .await?;

            let text = response
                .text()
                .await
                .map_err(|e| self.map_transport_error(e))?;
            let failures = xml::parse_delete_failures(&text)?;
            if let Some(first) = failures.first() {
                return Err(StoreError::Api {
                    code: first.code.clone(),
                    message: format!(
                        "{} object(s) could not be deleted; first failure: '{}': {}",
                        failures.len(),
                        first.key,
                        first.message
                    ),
                    status: 200,
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StoreError> {
        let response = self
            .send(Method::GET, None, None, &[], None, None, None, "")
            .await?;
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        xml::parse_bucket_list(&text)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        // Regions other than the classic one must be named in the body.
        let body = if self.key.region != "us-east-1" {
            Some(Bytes::from(format!(
                "<CreateBucketConfiguration><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                xml::xml_escape(&self.key.region)
            )))
        } else {
            None
        };

        self.send(
            Method::PUT,
            Some(bucket),
            None,
            &[],
            body,
            None,
            None,
            bucket,
        )
        .await?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.send(
            Method::DELETE,
            Some(bucket),
            None,
            &[],
            None,
            None,
            None,
            bucket,
        )
        .await?;
        Ok(())
    }

    async fn list_dir(&self, bucket: &str, prefix: &str) -> Result<DirListing, StoreError> {
        let mut listing = DirListing::default();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .list_page(bucket, prefix, Some("/"), continuation.as_deref())
                .await?;

            listing.folders.extend(page.common_prefixes);
            listing.objects.extend(
                page.objects
                    .into_iter()
                    // The prefix itself shows up as a zero-byte
                    // placeholder when a "folder" was created explicitly.
                    .filter(|o| o.key != prefix),
            );

            if page.is_truncated {
                match page.next_continuation_token {
                    Some(token) => continuation = Some(token),
                    None => {
                        return Err(StoreError::Parse(
                            "Truncated listing without a continuation token".to_string(),
                        ))
                    }
                }
            } else {
                return Ok(listing);
            }
        }
    }

    async fn bucket_state(&self, bucket: &str) -> Result<BucketState, StoreError> {
        let mut state = BucketState::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .list_page(bucket, "", None, continuation.as_deref())
                .await?;
            for object in page.objects {
                state.insert(object.key, object.etag);
            }

            if page.is_truncated {
                match page.next_continuation_token {
                    Some(token) => continuation = Some(token),
                    None => {
                        return Err(StoreError::Parse(
                            "Truncated listing without a continuation token".to_string(),
                        ))
                    }
                }
            } else {
                return Ok(state);
            }
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<FetchedObject, StoreError> {
        let response = self
            .send(
                Method::GET,
                Some(bucket),
                Some(key),
                &[],
                None,
                None,
                None,
                key,
            )
            .await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        Ok(FetchedObject { body, content_type })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.send(
            Method::PUT,
            Some(bucket),
            Some(key),
            &[],
            Some(body),
            Some(content_type),
            None,
            key,
        )
        .await?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.send(
            Method::DELETE,
            Some(bucket),
            Some(key),
            &[],
            None,
            None,
            None,
            key,
        )
        .await?;
        Ok(())
    }

    async fn delete_prefix(&self, bucket: &str, prefix: &str) -> Result<usize, StoreError> {
        let keys = self.list_all_keys(bucket, prefix).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        self.delete_batch(bucket, &keys).await?;
        Ok(keys.len())
    }

    async fn check(&self) -> Result<(), StoreError> {
        self.list_buckets().await.map(|_| ())
    }
}

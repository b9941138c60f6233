//! ReductStore HTTP client

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::batch::{parse_batch, ERROR_HEADER};
use crate::store::{Bucket, RecordStore, RecordStream};
use crate::types::{
    BucketInfo, BucketList, EntryInfo, FullBucketInfo, QueryOptions, QueryRequest, QueryResponse,
    Record, ServerInfo,
};
use crate::{ClientError, Result};

const API_PREFIX: &str = "api/v1";

/// Client options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_token: Option<String>,
    pub verify_ssl: bool,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_token: None,
            verify_ssl: true,
            timeout: Duration::from_secs(30),
        }
    }
}

struct Inner {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl Inner {
    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.api_token {
            Some(token) if !token.is_empty() => builder.bearer_auth(token),
            _ => builder,
        }
    }

    /// Send a request and turn non-success statuses into store errors
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        check_status(response)
    }
}

/// Map a non-success response to `ClientError::Api` using `x-reduct-error`
fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .headers()
        .get(ERROR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(ClientError::api(status.as_u16(), message))
}

/// ReductStore HTTP client
#[derive(Clone)]
pub struct ReductClient {
    inner: Arc<Inner>,
}

impl ReductClient {
    /// Create a new client for `url` (e.g. `http://127.0.0.1:8383`)
    pub fn new(url: &str, options: ClientOptions) -> Result<Self> {
        let base_url = url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("server URL is empty".to_string()));
        }

        let http = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_ssl)
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                api_token: options.api_token,
            }),
        })
    }

    pub fn url(&self) -> &str {
        &self.inner.base_url
    }
}

#[async_trait]
impl RecordStore for ReductClient {
    #[instrument(skip(self), fields(url = %self.inner.base_url))]
    async fn is_live(&self) -> Result<()> {
        self.inner.send(self.inner.request(Method::HEAD, "alive")).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn server_info(&self) -> Result<ServerInfo> {
        let response = self.inner.send(self.inner.request(Method::GET, "info")).await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let response = self.inner.send(self.inner.request(Method::GET, "list")).await?;
        let list: BucketList = response.json().await?;
        Ok(list.buckets)
    }

    #[instrument(skip(self))]
    async fn bucket(&self, name: &str) -> Result<Box<dyn Bucket>> {
        let path = format!("b/{}", name);
        let response = self.inner.send(self.inner.request(Method::GET, &path)).await?;
        let full: FullBucketInfo = response.json().await?;
        debug!(bucket = name, entries = full.entries.len(), "Bucket resolved");

        Ok(Box::new(ReductBucket {
            inner: self.inner.clone(),
            name: name.to_string(),
        }))
    }
}

/// Bucket handle of the HTTP client
pub struct ReductBucket {
    inner: Arc<Inner>,
    name: String,
}

#[async_trait]
impl Bucket for ReductBucket {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(bucket = %self.name))]
    async fn entries(&self) -> Result<Vec<EntryInfo>> {
        let path = format!("b/{}", self.name);
        let response = self.inner.send(self.inner.request(Method::GET, &path)).await?;
        let full: FullBucketInfo = response.json().await?;
        Ok(full.entries)
    }

    #[instrument(skip(self, options), fields(bucket = %self.name))]
    async fn query(&self, entry: &str, options: &QueryOptions) -> Result<RecordStream> {
        let path = format!("b/{}/{}/q", self.name, entry);
        let response = self
            .inner
            .send(
                self.inner
                    .request(Method::POST, &path)
                    .json(&QueryRequest::from(options)),
            )
            .await?;
        let QueryResponse { id } = response.json().await?;
        debug!(entry, query_id = id, "Query registered");

        let reader = BatchReader {
            inner: self.inner.clone(),
            path: format!("b/{}/{}/batch?q={}", self.name, entry, id),
            head: options.only_metadata,
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures_util::stream::try_unfold(reader, |mut reader| async move {
            loop {
                if let Some(record) = reader.pending.pop_front() {
                    return Ok::<_, ClientError>(Some((record, reader)));
                }
                if reader.done {
                    return Ok(None);
                }
                reader.fetch_next().await?;
            }
        });

        Ok(Box::pin(stream))
    }
}

/// Pulls batches of one query on demand
struct BatchReader {
    inner: Arc<Inner>,
    path: String,
    head: bool,
    pending: VecDeque<Record>,
    done: bool,
}

impl BatchReader {
    async fn fetch_next(&mut self) -> Result<()> {
        let method = if self.head { Method::HEAD } else { Method::GET };
        let response = self.inner.send(self.inner.request(method, &self.path)).await?;

        if response.status() == StatusCode::NO_CONTENT {
            self.done = true;
            return Ok(());
        }

        let headers = response.headers().clone();
        let body = if self.head {
            Bytes::new()
        } else {
            response.bytes().await?
        };

        let (records, last) = parse_batch(
            headers
                .iter()
                .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
            body,
            self.head,
        )?;

        debug!(records = records.len(), last, "Batch received");
        // an empty batch also ends the query
        self.done = last || records.is_empty();
        self.pending.extend(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_empty_url() {
        let result = ReductClient::new("", ClientOptions::default());
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }

    #[test]
    fn test_client_url_is_normalized() {
        let client = ReductClient::new("http://127.0.0.1:8383/", ClientOptions::default()).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:8383");
        assert_eq!(client.inner.url("alive"), "http://127.0.0.1:8383/api/v1/alive");
    }
}

//! HTTP client abstraction and the authenticated transport built on it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::auth::Credential;
use crate::error::FetchError;
use crate::progress::{Progress, ProgressCallback};
use crate::retry::{RetryPolicy, retry};

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Header carrying the caller-supplied client identifier, sent on every
/// request alongside `Authorization`.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outgoing request, fully described.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// JSON body, for POST requests that carry one.
    pub body: Option<serde_json::Value>,
}

/// Response head plus the body as a byte stream.
pub struct HttpResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, FetchError>>,
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations perform exactly one request and hand back the status and
/// body stream. They do not interpret statuses, retry, time out, or attach
/// credentials; all of that is [`Transport`]'s job, which keeps mock
/// implementations trivial.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Scripted mocks in unit tests
pub trait HttpClient: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, FetchError>> + Send;
}

/// Production HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(map_reqwest_error));

        Ok(HttpResponse {
            status,
            content_length,
            body: Box::pin(body),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_builder() {
        FetchError::InvalidUrl(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

/// Authenticated transport over an [`HttpClient`].
///
/// Every call attaches the credential and client-id headers, runs under the
/// retry policy with the default retryability predicate, and is raced
/// against the cancellation token and a per-call timeout. Cancellation and
/// timeout abort the in-flight request by dropping it.
pub struct Transport<C = ReqwestClient> {
    client: C,
    client_id: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl<C: HttpClient> Transport<C> {
    pub fn new(client: C, client_id: impl Into<String>) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        self.request_json(Method::Get, url, credential, None, cancel).await
    }

    /// POST, expecting a JSON document back.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &Credential,
        body: Option<&serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        self.request_json(Method::Post, url, credential, body, cancel).await
    }

    /// GET a binary payload, reporting byte progress as chunks arrive.
    pub async fn get_bytes(
        &self,
        url: &str,
        credential: &Credential,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Bytes, FetchError> {
        retry(&self.retry_policy, FetchError::is_retryable, |attempt| {
            self.guarded(cancel, self.download_once(url, credential, on_progress, attempt))
        })
        .await
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        credential: &Credential,
        body: Option<&serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        let bytes = retry(&self.retry_policy, FetchError::is_retryable, |_| {
            self.guarded(cancel, self.fetch_once(method, url, credential, body))
        })
        .await?;

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Race one operation against cancellation and the per-call timeout.
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        operation: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, operation) => match outcome {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            },
        }
    }

    async fn fetch_once(
        &self,
        method: Method,
        url: &str,
        credential: &Credential,
        body: Option<&serde_json::Value>,
    ) -> Result<Bytes, FetchError> {
        let response = self.send_request(method, url, credential, body).await?;
        let status = response.status;
        let bytes = collect_body(response.body).await?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                status,
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes)
    }

    async fn download_once(
        &self,
        url: &str,
        credential: &Credential,
        on_progress: Option<&ProgressCallback>,
        attempt: u32,
    ) -> Result<Bytes, FetchError> {
        let response = self.send_request(Method::Get, url, credential, None).await?;
        let status = response.status;
        if !(200..300).contains(&status) {
            let bytes = collect_body(response.body).await?;
            return Err(FetchError::Status {
                status,
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let total_bytes = response.content_length;
        report(on_progress, Progress::new(0, total_bytes, attempt));

        let mut body = response.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            buf.extend_from_slice(&chunk);
            report(on_progress, Progress::new(buf.len() as u64, total_bytes, attempt));
        }
        Ok(buf.freeze())
    }

    async fn send_request(
        &self,
        method: Method,
        url: &str,
        credential: &Credential,
        body: Option<&serde_json::Value>,
    ) -> Result<HttpResponse, FetchError> {
        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![
                ("authorization".to_string(), credential.header_value()),
                (CLIENT_ID_HEADER.to_string(), self.client_id.clone()),
            ],
            body: body.cloned(),
        };
        self.client.send(request).await
    }
}

fn report(on_progress: Option<&ProgressCallback>, progress: Progress) {
    if let Some(callback) = on_progress {
        (**callback)(progress);
    }
}

async fn collect_body(
    mut body: BoxStream<'static, Result<Bytes, FetchError>>,
) -> Result<Bytes, FetchError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use futures_util::stream;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone)]
    struct Scripted {
        status: u16,
        content_length: Option<u64>,
        chunks: Vec<Bytes>,
    }

    impl Scripted {
        fn ok(body: &str) -> Self {
            Self {
                status: 200,
                content_length: Some(body.len() as u64),
                chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
            }
        }

        fn status(status: u16) -> Self {
            Self {
                status,
                content_length: None,
                chunks: vec![],
            }
        }
    }

    struct MockClient {
        responses: Mutex<VecDeque<Result<Scripted, FetchError>>>,
        requests: Mutex<Vec<HttpRequest>>,
        calls: AtomicU32,
    }

    impl MockClient {
        fn new(responses: Vec<Result<Scripted, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicU32::new(0),
            }
        }

        fn single(response: Scripted) -> Self {
            Self::new(vec![Ok(response)])
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl HttpClient for MockClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            let scripted = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")?;
            let chunks: Vec<Result<Bytes, FetchError>> =
                scripted.chunks.into_iter().map(Ok).collect();
            Ok(HttpResponse {
                status: scripted.status,
                content_length: scripted.content_length,
                body: Box::pin(stream::iter(chunks)),
            })
        }
    }

    struct PendingClient;

    impl HttpClient for PendingClient {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, FetchError> {
            futures_util::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestDoc {
        value: u32,
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn bearer() -> Credential {
        Credential::Bearer("tok".into())
    }

    #[tokio::test]
    async fn test_get_json_decodes_and_sets_headers() {
        let transport = Transport::new(MockClient::single(Scripted::ok(r#"{"value":7}"#)), "cid-1");
        let cancel = CancellationToken::new();

        let doc: TestDoc = transport
            .get_json("http://host/doc", &bearer(), &cancel)
            .await
            .unwrap();
        assert_eq!(doc, TestDoc { value: 7 });

        let request = transport.client.last_request();
        assert!(matches!(request.method, Method::Get));
        assert!(
            request
                .headers
                .contains(&("authorization".to_string(), "Bearer tok".to_string()))
        );
        assert!(
            request
                .headers
                .contains(&(CLIENT_ID_HEADER.to_string(), "cid-1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_post_json_carries_body() {
        let transport = Transport::new(MockClient::single(Scripted::ok(r#"{"value":1}"#)), "cid");
        let cancel = CancellationToken::new();
        let body = serde_json::json!({"hello": "world"});

        let _: TestDoc = transport
            .post_json("http://host/doc", &bearer(), Some(&body), &cancel)
            .await
            .unwrap();

        let request = transport.client.last_request();
        assert!(matches!(request.method, Method::Post));
        assert_eq!(request.body, Some(body));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_retried_until_success() {
        let client = MockClient::new(vec![
            Ok(Scripted::status(500)),
            Ok(Scripted::status(502)),
            Ok(Scripted::ok(r#"{"value":3}"#)),
        ]);
        let transport = Transport::new(client, "cid").with_retry_policy(fast_policy());
        let cancel = CancellationToken::new();

        let doc: TestDoc = transport
            .get_json("http://host/doc", &bearer(), &cancel)
            .await
            .unwrap();
        assert_eq!(doc.value, 3);
        assert_eq!(transport.client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_rejection_is_not_retried() {
        let client = MockClient::new(vec![Ok(Scripted::status(401))]);
        let transport = Transport::new(client, "cid").with_retry_policy(fast_policy());
        let cancel = CancellationToken::new();

        let result: Result<TestDoc, _> =
            transport.get_json("http://host/doc", &bearer(), &cancel).await;
        assert!(matches!(
            result,
            Err(FetchError::Status { status: 401, .. })
        ));
        assert_eq!(transport.client.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_maps_to_status() {
        let transport = Transport::new(MockClient::single(Scripted::status(404)), "cid");
        let cancel = CancellationToken::new();

        let result = transport
            .get_bytes("http://host/blob", &bearer(), &cancel, None)
            .await;
        assert!(matches!(
            result,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert_eq!(transport.client.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_decode_error() {
        let transport = Transport::new(MockClient::single(Scripted::ok("not json")), "cid");
        let cancel = CancellationToken::new();

        let result: Result<TestDoc, _> =
            transport.get_json("http://host/doc", &bearer(), &cancel).await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
        assert_eq!(transport.client.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_bytes_reports_chunk_progress() {
        let client = MockClient::single(Scripted {
            status: 200,
            content_length: Some(12),
            chunks: vec![
                Bytes::from_static(b"abc"),
                Bytes::from_static(b"defg"),
                Bytes::from_static(b"hijkl"),
            ],
        });
        let transport = Transport::new(client, "cid");
        let cancel = CancellationToken::new();

        let seen: Arc<Mutex<Vec<Progress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |progress| {
            sink.lock().unwrap().push(progress);
        });

        let bytes = transport
            .get_bytes("http://host/blob", &bearer(), &cancel, Some(&callback))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"abcdefghijkl");

        let seen = seen.lock().unwrap();
        let loaded: Vec<u64> = seen.iter().map(|p| p.bytes_loaded).collect();
        assert_eq!(loaded, vec![0, 3, 7, 12]);
        assert!(seen.iter().all(|p| p.total_bytes == Some(12)));
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let transport = Transport::new(MockClient::new(vec![]), "cid");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = transport
            .get_bytes("http://host/blob", &bearer(), &cancel, None)
            .await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
        assert_eq!(transport.client.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_request_times_out_and_retries() {
        let transport = Transport::new(PendingClient, "cid")
            .with_timeout(Duration::from_millis(50))
            .with_retry_policy(RetryPolicy {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
            });
        let cancel = CancellationToken::new();

        let result = transport
            .get_bytes("http://host/blob", &bearer(), &cancel, None)
            .await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }
}

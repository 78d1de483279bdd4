//! Concurrency-bounded cached fetching.
//!
//! Every network request passes through one semaphore sized by
//! configuration, so the source site never sees more than that many
//! in-flight requests no matter how wide a task fans out. Cache hits
//! bypass the semaphore entirely.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, trace};

use parldata_shared::{FetchConfig, ParldataError, Result};
use parldata_storage::{Store, form_key};

use crate::sniff::{self, MediaType};

/// Shared fetch handle: an HTTP client, the request semaphore, and the
/// store backing the write-once caches. Clones share all three, so a
/// task can hand copies to its fan-out subtasks.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    store: Arc<Store>,
}

impl Fetcher {
    pub fn new(store: Arc<Store>, config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParldataError::Network(e.to_string()))?;
        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.concurrency)),
            store,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// GET a page as text, through the cache.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        self.request_text(url, None).await
    }

    /// POST a form and return the response text, through the cache. The
    /// form participates in the cache key, so each page of a paginated
    /// search caches separately.
    pub async fn fetch_form(
        &self,
        url: &str,
        form: &BTreeMap<String, String>,
    ) -> Result<String> {
        self.request_text(url, Some(form)).await
    }

    async fn request_text(
        &self,
        url: &str,
        form: Option<&BTreeMap<String, String>>,
    ) -> Result<String> {
        let method = if form.is_some() { "POST" } else { "GET" };
        let key = form_key(form);
        if let Some(body) = self.store.cached_text(url, method, &key).await? {
            trace!(url, method, "text cache hit");
            return Ok(body);
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ParldataError::Network("fetch semaphore closed".into()))?;
        debug!(url, method, "fetching");

        let request = match form {
            Some(form) => self.client.post(url).form(form),
            None => self.client.get(url),
        };
        let response = request
            .send()
            .await
            .map_err(|e| ParldataError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ParldataError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ParldataError::Network(e.to_string()))?;
        let body = String::from_utf8(bytes.to_vec()).map_err(|e| ParldataError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        self.store.store_text(url, method, &key, &body).await?;
        Ok(body)
    }

    /// GET a binary payload, through the blob cache.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(payload) = self.store.cached_blob(url).await? {
            trace!(url, "blob cache hit");
            return Ok(payload);
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ParldataError::Network("fetch semaphore closed".into()))?;
        debug!(url, "fetching document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ParldataError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ParldataError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let payload = response
            .bytes()
            .await
            .map_err(|e| ParldataError::Network(e.to_string()))?
            .to_vec();

        self.store.store_blob(url, &payload).await?;
        Ok(payload)
    }

    /// Fetch a binary document and identify it by its magic bytes. An
    /// unrecognized payload is a decode error.
    pub async fn fetch_document(&self, url: &str) -> Result<(MediaType, Vec<u8>)> {
        let payload = self.fetch_bytes(url).await?;
        let media_type = sniff::sniff(&payload).ok_or_else(|| ParldataError::Decode {
            url: url.to_string(),
            message: "unrecognized document format".into(),
        })?;
        Ok((media_type, payload))
    }
}

/// Run a CPU-heavy extraction off the async runtime.
pub async fn exec_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ParldataError::parse(format!("extraction worker failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn test_fetcher() -> (Fetcher, Arc<Store>) {
        let tmp = std::env::temp_dir().join(format!("pd_test_{}.db", Uuid::now_v7()));
        let store = Arc::new(Store::open(&tmp).await.expect("open test db"));
        let fetcher =
            Fetcher::new(Arc::clone(&store), &FetchConfig::default()).expect("build fetcher");
        (fetcher, store)
    }

    #[tokio::test]
    async fn repeat_fetches_hit_the_network_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agenda"))
            .respond_with(ResponseTemplate::new(200).set_body_string("αβγ"))
            .expect(2)
            .mount(&server)
            .await;

        let (fetcher, store) = test_fetcher().await;
        let url = format!("{}/agenda", server.uri());

        let first = fetcher.fetch_text(&url).await.unwrap();
        let second = fetcher.fetch_text(&url).await.unwrap();
        assert_eq!(first, "αβγ");
        assert_eq!(first, second);

        // After a cache clear, exactly one more request goes out
        store.clear_text_cache().await.unwrap();
        let third = fetcher.fetch_text(&url).await.unwrap();
        assert_eq!(third, "αβγ");
    }

    #[tokio::test]
    async fn forms_cache_independently_per_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_string_contains("page=1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page one"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_string_contains("page=2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("page two"))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, _store) = test_fetcher().await;
        let url = format!("{}/search", server.uri());

        let mut form = BTreeMap::new();
        form.insert("page".to_string(), "1".to_string());
        assert_eq!(fetcher.fetch_form(&url, &form).await.unwrap(), "page one");

        form.insert("page".to_string(), "2".to_string());
        assert_eq!(fetcher.fetch_form(&url, &form).await.unwrap(), "page two");

        // Both keys now served from cache
        form.insert("page".to_string(), "1".to_string());
        assert_eq!(fetcher.fetch_form(&url, &form).await.unwrap(), "page one");
    }

    #[tokio::test]
    async fn http_failure_carries_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (fetcher, _store) = test_fetcher().await;
        let url = format!("{}/missing", server.uri());
        match fetcher.fetch_text(&url).await {
            Err(ParldataError::Fetch { status, .. }) => assert_eq!(status, 404),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/binary"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0x00, 0x80]),
            )
            .mount(&server)
            .await;

        let (fetcher, _store) = test_fetcher().await;
        let url = format!("{}/binary", server.uri());
        assert!(matches!(
            fetcher.fetch_text(&url).await,
            Err(ParldataError::Decode { .. })
        ));
        // Nothing was cached for the failed decode
        assert_eq!(
            fetcher.store().cached_text(&url, "GET", "").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn blocking_offload_returns_the_closure_result() {
        let checksum = exec_blocking(|| (0u64..100).sum::<u64>()).await.unwrap();
        assert_eq!(checksum, 4950);
    }

    #[tokio::test]
    async fn documents_are_sniffed_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/praktiko.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 stub".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, _store) = test_fetcher().await;
        let url = format!("{}/praktiko.pdf", server.uri());

        let (media_type, payload) = fetcher.fetch_document(&url).await.unwrap();
        assert_eq!(media_type, MediaType::Pdf);
        assert_eq!(payload, b"%PDF-1.4 stub");

        // Second fetch is served from the blob cache
        let (media_type, _) = fetcher.fetch_document(&url).await.unwrap();
        assert_eq!(media_type, MediaType::Pdf);
    }
}

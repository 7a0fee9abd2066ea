use crate::model::{Page, PageEnvelope};
use futures::future::{self, Either, FutureExt, LocalBoxFuture};
use gloo_net::http::{Request, Response};
use gloo_timers::future::TimeoutFuture;
use thiserror::Error;

/// Every variant is a network failure from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("request timed out after {0} ms")]
    Timeout(u32),
    #[error("HTTP {status} while requesting {url}")]
    Status { status: u16, url: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub(crate) fn network<E: std::fmt::Display>(err: E) -> Self {
        Self::Network(err.to_string())
    }

    pub(crate) fn decode<E: std::fmt::Display>(err: E) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Backend collaborator for the people endpoints.
///
/// Calling a method is the dispatch point; callers order local effects
/// before the call, not before the first poll.
pub trait PeopleApi {
    fn fetch_people(&self, page: u32, per_page: u32) -> LocalBoxFuture<'static, Result<Page, ApiError>>;
    fn fetch_liked(&self, page: u32, per_page: u32) -> LocalBoxFuture<'static, Result<Page, ApiError>>;
    fn like(&self, id: &str) -> LocalBoxFuture<'static, Result<(), ApiError>>;
    fn dislike(&self, id: &str) -> LocalBoxFuture<'static, Result<(), ApiError>>;
}

#[derive(Debug, Clone)]
pub struct HttpPeopleApi {
    base_url: String,
    timeout_ms: u32,
}

impl HttpPeopleApi {
    pub fn new(base_url: impl Into<String>, timeout_ms: u32) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_ms,
        }
    }

    fn page_url(&self, path: &str, page: u32, per_page: u32) -> String {
        format!(
            "{}/{}?page={}&per_page={}",
            self.base_url, path, page, per_page
        )
    }

    fn action_url(&self, id: &str, action: &str) -> String {
        format!("{}/people/{}/{}", self.base_url, id, action)
    }

    fn get_page(&self, url: String) -> LocalBoxFuture<'static, Result<Page, ApiError>> {
        let timeout_ms = self.timeout_ms;
        async move {
            let response = with_timeout(Request::get(&url).send(), timeout_ms).await?;
            let response = ensure_ok(response, &url)?;
            let text = response.text().await.map_err(ApiError::network)?;
            let envelope: PageEnvelope = serde_json::from_str(&text).map_err(ApiError::decode)?;
            Page::try_from(envelope).map_err(ApiError::decode)
        }
        .boxed_local()
    }

    fn post(&self, url: String) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        let timeout_ms = self.timeout_ms;
        async move {
            let response = with_timeout(Request::post(&url).send(), timeout_ms).await?;
            ensure_ok(response, &url).map(|_| ())
        }
        .boxed_local()
    }
}

impl PeopleApi for HttpPeopleApi {
    fn fetch_people(&self, page: u32, per_page: u32) -> LocalBoxFuture<'static, Result<Page, ApiError>> {
        self.get_page(self.page_url("people", page, per_page))
    }

    fn fetch_liked(&self, page: u32, per_page: u32) -> LocalBoxFuture<'static, Result<Page, ApiError>> {
        self.get_page(self.page_url("people/liked", page, per_page))
    }

    fn like(&self, id: &str) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        self.post(self.action_url(id, "like"))
    }

    fn dislike(&self, id: &str) -> LocalBoxFuture<'static, Result<(), ApiError>> {
        self.post(self.action_url(id, "dislike"))
    }
}

async fn with_timeout<F>(request: F, timeout_ms: u32) -> Result<Response, ApiError>
where
    F: std::future::Future<Output = Result<Response, gloo_net::Error>>,
{
    let request = Box::pin(request);
    let timer = Box::pin(TimeoutFuture::new(timeout_ms));
    match future::select(request, timer).await {
        Either::Left((result, _)) => result.map_err(ApiError::network),
        Either::Right(((), _)) => Err(ApiError::Timeout(timeout_ms)),
    }
}

fn ensure_ok(response: Response, url: &str) -> Result<Response, ApiError> {
    if response.ok() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            status: response.status(),
            url: url.to_owned(),
        })
    }
}

use futures::future::{self, LocalBoxFuture};
use thiserror::Error;
use web_sys::HtmlImageElement;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not warm {url}: {reason}")]
pub struct MediaError {
    pub url: String,
    pub reason: String,
}

/// Best-effort image cache warming.
pub trait MediaPrefetcher {
    fn warm(&self, url: &str) -> LocalBoxFuture<'static, Result<(), MediaError>>;
}

/// Warms the browser image cache by loading the URL into a detached `<img>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePrefetcher;

impl MediaPrefetcher for ImagePrefetcher {
    fn warm(&self, url: &str) -> LocalBoxFuture<'static, Result<(), MediaError>> {
        let result = HtmlImageElement::new()
            .map(|image| image.set_src(url))
            .map_err(|err| MediaError {
                url: url.to_owned(),
                reason: format!("{:?}", err),
            });
        Box::pin(future::ready(result))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPrefetcher;

impl MediaPrefetcher for NoopPrefetcher {
    fn warm(&self, _url: &str) -> LocalBoxFuture<'static, Result<(), MediaError>> {
        Box::pin(future::ready(Ok(())))
    }
}

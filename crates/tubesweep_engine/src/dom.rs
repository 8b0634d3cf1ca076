//! Capability seam between the walker and a live page.
//!
//! The walker only ever talks to these traits. The DevTools backend in
//! [`crate::cdp`] implements them against a running browser; tests implement
//! them with an in-memory tree.

use std::time::Duration;

use async_trait::async_trait;
use tubesweep_core::BoundingBox;

/// Boxed element handle as returned by queries.
pub type ElementHandle = Box<dyn DomElement>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("element not visible: {0}")]
    NotVisible(String),
    #[error("element detached from the document: {0}")]
    Stale(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("browser session lost: {0}")]
    Session(String),
}

impl DomError {
    /// Errors after which no further DOM operation can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DomError::Session(_))
    }
}

#[async_trait]
pub trait DomElement: Send + Sync {
    /// Identity that stays the same for the same node across queries.
    fn id(&self) -> String;

    /// First descendant matching `selector`.
    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError>;

    /// All descendants matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError>;

    /// Rendered text of the element and its descendants.
    async fn text(&self) -> Result<String, DomError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, DomError>;

    /// Outer markup, used for diagnostics only.
    async fn html(&self) -> Result<String, DomError>;

    async fn is_visible(&self) -> Result<bool, DomError>;

    async fn bounding_box(&self) -> Result<Option<BoundingBox>, DomError>;

    async fn click(&self) -> Result<(), DomError>;

    /// Detaches the element from the document.
    async fn remove(&self) -> Result<(), DomError>;

    /// Polls [`DomElement::is_visible`] until it holds or `timeout` elapses.
    async fn wait_visible(&self, timeout: Duration) -> Result<(), DomError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_visible().await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DomError::Timeout(format!(
                    "element {} not visible after {:?}",
                    self.id(),
                    timeout
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[async_trait]
pub trait DomPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DomError>;

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError>;

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError>;

    /// Waits for the document to finish loading.
    async fn wait_load(&self) -> Result<(), DomError>;

    /// Waits until the document stops changing for a short while.
    async fn wait_stable(&self) -> Result<(), DomError>;

    async fn press_escape(&self) -> Result<(), DomError>;

    /// Mouse click at viewport coordinates.
    async fn click_at(&self, x: f64, y: f64) -> Result<(), DomError>;

    /// Mouse-wheel scroll by (`dx`, `dy`) per step, `steps` times.
    async fn scroll_by(&self, dx: f64, dy: f64, steps: u32) -> Result<(), DomError>;
}

/// Where a query runs: the whole page or the inside of one element.
#[derive(Clone, Copy)]
pub(crate) enum Scope<'a> {
    Page(&'a dyn DomPage),
    Element(&'a dyn DomElement),
}

impl Scope<'_> {
    pub(crate) async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        match self {
            Scope::Page(page) => page.query_all(selector).await,
            Scope::Element(element) => element.query_all(selector).await,
        }
    }
}

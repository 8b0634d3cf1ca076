//! DevTools backend: attaches to an already running browser and exposes its
//! current tab through [`DomPage`] / [`DomElement`].

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tubesweep_core::BoundingBox;

use crate::devtools::{DevtoolsClient, DevtoolsSettings, DiscoveryError};
use crate::dom::{DomElement, DomError, DomPage, ElementHandle};

const VISIBLE_JS: &str = "function() { \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";
const REMOVE_JS: &str = "function() { this.remove(); }";
const STABLE_PROBE_JS: &str =
    "document.getElementsByTagName('*').length + ':' + document.documentElement.scrollHeight";

#[derive(Debug, Clone)]
pub struct PageTimings {
    pub load_timeout: Duration,
    pub stable_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause between mouse-wheel steps.
    pub scroll_step_delay: Duration,
}

impl Default for PageTimings {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(20),
            stable_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
            scroll_step_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("devtools connection failed: {0}")]
    Connect(String),
}

/// Live connection to a browser started with remote debugging enabled.
pub struct Session {
    browser: Browser,
    handler_task: JoinHandle<()>,
    preferred_url: Option<String>,
    timings: PageTimings,
}

impl Session {
    pub async fn open(settings: &DevtoolsSettings, timings: PageTimings) -> Result<Self, SessionError> {
        let client = DevtoolsClient::new(settings.clone());
        let version = client.version().await?;
        engine_info!(
            "Attaching to {} (protocol {}) at {}",
            version.browser,
            version.protocol_version,
            settings.base_url()
        );
        let pages = client.pages().await?;
        let preferred_url = pages.first().map(|target| target.url.clone());
        if preferred_url.is_none() {
            return Err(DiscoveryError::NoPage.into());
        }

        let (mut browser, mut handler) = Browser::connect(version.ws_url)
            .await
            .map_err(|err| SessionError::Connect(err.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    engine_debug!("devtools handler: {}", err);
                }
            }
        });
        browser
            .fetch_targets()
            .await
            .map_err(|err| SessionError::Connect(err.to_string()))?;

        Ok(Self {
            browser,
            handler_task,
            preferred_url,
            timings,
        })
    }

    /// The tab the user was last looking at.
    pub async fn current_page(&self) -> Result<CdpPage, SessionError> {
        let mut pages = Vec::new();
        // Existing targets are attached asynchronously after `fetch_targets`.
        for _ in 0..20 {
            pages = self
                .browser
                .pages()
                .await
                .map_err(|err| SessionError::Connect(err.to_string()))?;
            if !pages.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut chosen = None;
        for page in &pages {
            let url = page.url().await.ok().flatten();
            if url.is_some() && url == self.preferred_url {
                chosen = Some(page.clone());
                break;
            }
        }
        let page = chosen
            .or_else(|| pages.into_iter().next())
            .ok_or(SessionError::Discovery(DiscoveryError::NoPage))?;
        if let Err(err) = page.bring_to_front().await {
            engine_warn!("Could not focus the tab: {}", err);
        }

        Ok(CdpPage {
            page,
            timings: self.timings.clone(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

pub struct CdpPage {
    page: Page,
    timings: PageTimings,
}

impl CdpPage {
    async fn evaluate_string(&self, expression: &str) -> Result<String, DomError> {
        let result = self.page.evaluate(expression).await.map_err(map_cdp_error)?;
        Ok(result
            .value()
            .map(|value| match value.as_str() {
                Some(text) => text.to_string(),
                None => value.to_string(),
            })
            .unwrap_or_default())
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> Result<(), DomError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(DomError::Session)?;
        self.page.execute(params).await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn key(&self, kind: DispatchKeyEventType) -> Result<(), DomError> {
        let params = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key("Escape")
            .code("Escape")
            .windows_virtual_key_code(27)
            .build()
            .map_err(DomError::Session)?;
        self.page.execute(params).await.map_err(map_cdp_error)?;
        Ok(())
    }
}

#[async_trait]
impl DomPage for CdpPage {
    async fn navigate(&self, url: &str) -> Result<(), DomError> {
        engine_debug!("Navigating to {}", url);
        self.page.goto(url).await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .or_else(empty_on_missing)?;
        Ok(wrap(elements))
    }

    async fn wait_load(&self) -> Result<(), DomError> {
        let deadline = tokio::time::Instant::now() + self.timings.load_timeout;
        loop {
            if self.evaluate_string("document.readyState").await? == "complete" {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                engine_warn!("Page still loading after {:?}", self.timings.load_timeout);
                return Ok(());
            }
            tokio::time::sleep(self.timings.poll_interval).await;
        }
    }

    async fn wait_stable(&self) -> Result<(), DomError> {
        let deadline = tokio::time::Instant::now() + self.timings.stable_timeout;
        let mut previous = self.evaluate_string(STABLE_PROBE_JS).await?;
        loop {
            tokio::time::sleep(self.timings.poll_interval).await;
            let current = self.evaluate_string(STABLE_PROBE_JS).await?;
            if current == previous {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                engine_debug!("Page still changing after {:?}", self.timings.stable_timeout);
                return Ok(());
            }
            previous = current;
        }
    }

    async fn press_escape(&self) -> Result<(), DomError> {
        self.key(DispatchKeyEventType::KeyDown).await?;
        self.key(DispatchKeyEventType::KeyUp).await
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), DomError> {
        self.mouse(DispatchMouseEventType::MouseMoved, x, y).await?;
        self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
        tokio::time::sleep(Duration::from_millis(40)).await;
        self.mouse(DispatchMouseEventType::MouseReleased, x, y).await
    }

    async fn scroll_by(&self, dx: f64, dy: f64, steps: u32) -> Result<(), DomError> {
        for _ in 0..steps {
            let params = DispatchMouseEventParams::builder()
                .r#type(DispatchMouseEventType::MouseWheel)
                .x(0.0)
                .y(0.0)
                .delta_x(dx)
                .delta_y(dy)
                .build()
                .map_err(DomError::Session)?;
            self.page.execute(params).await.map_err(map_cdp_error)?;
            tokio::time::sleep(self.timings.scroll_step_delay).await;
        }
        Ok(())
    }
}

pub struct CdpElement {
    inner: Element,
}

#[async_trait]
impl DomElement for CdpElement {
    fn id(&self) -> String {
        format!("{:?}", self.inner.backend_node_id)
    }

    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>, DomError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DomError> {
        let elements = self
            .inner
            .find_elements(selector)
            .await
            .or_else(empty_on_missing)?;
        Ok(wrap(elements))
    }

    async fn text(&self) -> Result<String, DomError> {
        let text = self.inner.inner_text().await.map_err(map_cdp_error)?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DomError> {
        self.inner.attribute(name).await.map_err(map_cdp_error)
    }

    async fn html(&self) -> Result<String, DomError> {
        let html = self.inner.outer_html().await.map_err(map_cdp_error)?;
        Ok(html.unwrap_or_default())
    }

    async fn is_visible(&self) -> Result<bool, DomError> {
        let returns = self
            .inner
            .call_js_fn(VISIBLE_JS, false)
            .await
            .map_err(map_cdp_error)?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    async fn bounding_box(&self) -> Result<Option<BoundingBox>, DomError> {
        match self.inner.bounding_box().await {
            Ok(rect) => Ok(Some(BoundingBox {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            })),
            Err(err) => {
                let err = map_cdp_error(err);
                if err.is_fatal() {
                    Err(err)
                } else {
                    Ok(None)
                }
            }
        }
    }

    async fn click(&self) -> Result<(), DomError> {
        self.inner.click().await.map_err(map_cdp_error)?;
        Ok(())
    }

    async fn remove(&self) -> Result<(), DomError> {
        self.inner
            .call_js_fn(REMOVE_JS, false)
            .await
            .map_err(map_cdp_error)?;
        Ok(())
    }
}

fn wrap(elements: Vec<Element>) -> Vec<ElementHandle> {
    elements
        .into_iter()
        .map(|inner| Box::new(CdpElement { inner }) as ElementHandle)
        .collect()
}

/// A query that hits nothing is an empty list, not an error.
fn empty_on_missing(err: CdpError) -> Result<Vec<Element>, DomError> {
    match err {
        CdpError::NotFound => Ok(Vec::new()),
        other => Err(map_cdp_error(other)),
    }
}

fn map_cdp_error(err: CdpError) -> DomError {
    match err {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            DomError::Session(err.to_string())
        }
        CdpError::Timeout => DomError::Timeout(err.to_string()),
        CdpError::NotFound => DomError::NotFound(err.to_string()),
        other => DomError::Stale(other.to_string()),
    }
}

//! [`PageDriver`] over a `chromiumoxide` page.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use serde::Deserialize;
use serde_json::Value;

use crate::driver::{CandidateElement, DriverError, Locator, PageDriver};
use crate::geometry::BoundingBox;
use crate::scripts;

/// Live element handle.
#[derive(Debug)]
pub struct ChromiumElement {
    inner: Element,
}

impl ChromiumElement {
    pub fn inner(&self) -> &Element {
        &self.inner
    }

    pub fn into_inner(self) -> Element {
        self.inner
    }

    pub async fn click(&self) -> Result<(), DriverError> {
        self.inner.click().await.map_err(map_element_error)?;
        Ok(())
    }

    pub async fn type_str(&self, text: &str) -> Result<(), DriverError> {
        self.inner.type_str(text).await.map_err(map_element_error)?;
        Ok(())
    }

    pub async fn inner_text(&self) -> Result<Option<String>, DriverError> {
        self.inner.inner_text().await.map_err(map_element_error)
    }

    async fn call_for_string(&self, function: &str) -> Result<String, DriverError> {
        let returns = self
            .inner
            .call_js_fn(function, false)
            .await
            .map_err(map_element_error)?;
        match returns.result.value {
            Some(Value::String(value)) => Ok(value),
            other => Err(DriverError::Script(format!(
                "expected a string result, got {other:?}"
            ))),
        }
    }
}

#[derive(Deserialize)]
struct ClientRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[async_trait]
impl CandidateElement for ChromiumElement {
    async fn rect(&self) -> Result<BoundingBox, DriverError> {
        let json = self.call_for_string(scripts::CLIENT_RECT_FN).await?;
        let rect: ClientRect =
            serde_json::from_str(&json).map_err(|err| DriverError::Script(err.to_string()))?;
        Ok(BoundingBox::new(rect.x, rect.y, rect.width, rect.height))
    }

    async fn tag_role(&self) -> Result<String, DriverError> {
        self.call_for_string(scripts::TAG_ROLE_FN).await
    }
}

/// Driver bound to a single page.
#[derive(Debug, Clone)]
pub struct ChromiumoxideDriver {
    page: Page,
}

impl ChromiumoxideDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.page.goto(url).await.map_err(map_page_error)?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromiumoxideDriver {
    type Element = ChromiumElement;

    async fn find_element(&self, locator: &Locator) -> Result<ChromiumElement, DriverError> {
        let found = if let Some(selector) = locator.as_css() {
            self.page.find_element(selector).await
        } else if let Some(xpath) = locator.as_xpath() {
            self.page.find_xpath(xpath).await
        } else {
            return Err(DriverError::Other(format!("unsupported locator {locator}")));
        };
        found
            .map(|inner| ChromiumElement { inner })
            .map_err(|err| map_lookup_error(err, locator))
    }

    async fn find_all_elements(&self) -> Result<Vec<ChromiumElement>, DriverError> {
        let elements = self.page.find_xpaths("//*").await.map_err(map_page_error)?;
        Ok(elements
            .into_iter()
            .map(|inner| ChromiumElement { inner })
            .collect())
    }

    async fn screenshot_base64(&self) -> Result<String, DriverError> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await
            .map_err(|err| DriverError::Screenshot(err.to_string()))?;
        Ok(STANDARD.encode(bytes))
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.page.content().await.map_err(map_page_error)
    }

    async fn viewport_width(&self) -> Result<f64, DriverError> {
        self.page
            .evaluate(scripts::INNER_WIDTH)
            .await
            .map_err(map_page_error)?
            .into_value::<f64>()
            .map_err(|err| DriverError::Script(err.to_string()))
    }

    async fn execute_script(&self, script: &str) -> Result<Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|err| DriverError::Script(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

fn map_page_error(err: CdpError) -> DriverError {
    DriverError::Other(err.to_string())
}

fn map_element_error(err: CdpError) -> DriverError {
    let message = err.to_string();
    if is_detached(&message) {
        DriverError::Stale(message)
    } else {
        DriverError::Other(message)
    }
}

fn map_lookup_error(err: CdpError, locator: &Locator) -> DriverError {
    let message = err.to_string();
    if is_detached(&message) {
        DriverError::Stale(format!("{locator}: {message}"))
    } else {
        DriverError::NotFound(format!("{locator}: {message}"))
    }
}

fn is_detached(message: &str) -> bool {
    let lowered = message.to_ascii_lowercase();
    lowered.contains("no node with given id")
        || lowered.contains("detached")
        || lowered.contains("stale")
}

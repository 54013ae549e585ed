//! Browser driver capabilities consumed by the resolver.
//!
//! The resolver never talks to a browser directly. It only needs a handful of
//! operations (native lookup, element enumeration, screenshots, page source
//! and script execution), which concrete drivers expose through [`PageDriver`].
//! Everything else a driver can do stays on the driver itself.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::geometry::BoundingBox;

/// Native lookup strategy together with the value it searches for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    ClassName(String),
    CssSelector(String),
    LinkText(String),
    PartialLinkText(String),
    Name(String),
    TagName(String),
    XPath(String),
}

impl Locator {
    /// Short strategy code used when deriving default element names.
    pub fn shortcode(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::ClassName(_) => "class_name",
            Locator::CssSelector(_) => "css_selector",
            Locator::LinkText(_) => "link_text",
            Locator::PartialLinkText(_) => "partial_link_text",
            Locator::Name(_) => "name",
            Locator::TagName(_) => "tag_name",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v)
            | Locator::ClassName(v)
            | Locator::CssSelector(v)
            | Locator::LinkText(v)
            | Locator::PartialLinkText(v)
            | Locator::Name(v)
            | Locator::TagName(v)
            | Locator::XPath(v) => v,
        }
    }

    /// Name reported to the classifier when the caller did not supply one.
    pub fn default_element_name(&self) -> String {
        format!(
            "element_name_by_{}_{}",
            self.shortcode(),
            self.value().replace('.', "_")
        )
        .replace(' ', "_")
    }

    /// Express the locator as a css selector where an exact equivalent exists.
    pub fn as_css(&self) -> Option<String> {
        match self {
            Locator::Id(id) => Some(format!("[id={}]", css_string(id))),
            Locator::ClassName(class) => Some(format!(".{class}")),
            Locator::CssSelector(selector) => Some(selector.clone()),
            Locator::Name(name) => Some(format!("[name={}]", css_string(name))),
            Locator::TagName(tag) => Some(tag.clone()),
            Locator::LinkText(_) | Locator::PartialLinkText(_) | Locator::XPath(_) => None,
        }
    }

    /// Express the locator as an xpath expression where css cannot.
    pub fn as_xpath(&self) -> Option<String> {
        match self {
            Locator::XPath(xpath) => Some(xpath.clone()),
            Locator::LinkText(text) => Some(format!(
                "//a[normalize-space(.)={}]",
                xpath_literal(text)
            )),
            Locator::PartialLinkText(text) => {
                Some(format!("//a[contains(., {})]", xpath_literal(text)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.shortcode(), self.value())
    }
}

fn css_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Failures reported by a driver.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no element found for {0}")]
    NotFound(String),
    #[error("stale element reference: {0}")]
    Stale(String),
    #[error("script execution failed: {0}")]
    Script(String),
    #[error("screenshot failed: {0}")]
    Screenshot(String),
    #[error("driver error: {0}")]
    Other(String),
}

impl DriverError {
    /// Absent or detached elements; the resolver treats both as a native miss.
    pub fn is_missing(&self) -> bool {
        matches!(self, DriverError::NotFound(_) | DriverError::Stale(_))
    }
}

/// A live element on the page. Handles are owned by the driver; the resolver
/// only reads their geometry and tag.
#[async_trait]
pub trait CandidateElement: Send + Sync {
    /// Current rectangle in logical coordinates.
    async fn rect(&self) -> Result<BoundingBox, DriverError>;

    /// Lowercase tag name, followed by the ARIA role when the element has
    /// one (`"input combobox"`).
    async fn tag_role(&self) -> Result<String, DriverError>;
}

/// Capabilities the resolver needs from a browser driver.
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: CandidateElement;

    async fn find_element(&self, locator: &Locator) -> Result<Self::Element, DriverError>;

    /// Every element currently rendered on the page (`//*`).
    async fn find_all_elements(&self) -> Result<Vec<Self::Element>, DriverError>;

    /// PNG screenshot of the viewport, base64 encoded.
    async fn screenshot_base64(&self) -> Result<String, DriverError>;

    async fn page_source(&self) -> Result<String, DriverError>;

    /// Viewport width in logical pixels.
    async fn viewport_width(&self) -> Result<f64, DriverError>;

    async fn execute_script(&self, script: &str) -> Result<Value, DriverError>;

    /// Whether live elements can be enumerated. Drivers that only see pixels
    /// (remote screen streams, native app surfaces) override this with `false`
    /// and get classifier results back as standalone elements, as does any
    /// driver whose enumeration fails at match time.
    fn has_element_tree(&self) -> bool {
        true
    }
}

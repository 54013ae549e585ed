use serde_json::Value;

use crate::driver::{DriverError, PageDriver};
use crate::geometry::{BoundingBox, DensityMultiplier};
use crate::scripts;

/// Element described only by the classifier, for pages without a live element
/// tree to match against. Interactions are dispatched as scripts aimed at the
/// centre of the reported box.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedElement {
    text: String,
    tag_role: String,
    rect: BoundingBox,
}

impl ClassifiedElement {
    /// Build from a classifier-space box, converting it to logical space.
    pub fn from_classifier(
        bbox: BoundingBox,
        text: impl Into<String>,
        tag_role: impl Into<String>,
        multiplier: DensityMultiplier,
    ) -> Self {
        Self {
            text: text.into(),
            tag_role: tag_role.into(),
            rect: bbox.normalize(multiplier),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tag_role(&self) -> &str {
        &self.tag_role
    }

    /// Logical rectangle.
    pub fn rect(&self) -> BoundingBox {
        self.rect
    }

    pub fn location(&self) -> (f64, f64) {
        (self.rect.x, self.rect.y)
    }

    pub fn size(&self) -> (f64, f64) {
        (self.rect.width, self.rect.height)
    }

    /// Whole-pixel click point.
    pub fn center(&self) -> (i64, i64) {
        let (cx, cy) = self.rect.center();
        (cx.floor() as i64, cy.floor() as i64)
    }

    pub async fn click<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<Value, DriverError> {
        let (cx, cy) = self.center();
        driver.execute_script(&scripts::click_at(cx, cy)).await
    }

    /// Assign `value` to the element under the centre point.
    pub async fn send_keys<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        value: &str,
    ) -> Result<Value, DriverError> {
        let (cx, cy) = self.center();
        driver.execute_script(&scripts::set_value_at(cx, cy, value)).await
    }

    pub async fn clear<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<Value, DriverError> {
        self.send_keys(driver, "").await
    }

    pub async fn submit<D: PageDriver + ?Sized>(&self, driver: &D) -> Result<Value, DriverError> {
        self.send_keys(driver, "\n").await
    }
}

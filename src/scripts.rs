//! Page-context scripts evaluated through the driver.

/// Logical viewport width.
pub const INNER_WIDTH: &str = "window.innerWidth";

/// Function body for `callFunctionOn`: the lowercase tag name, followed by the
/// ARIA role tokens when the element carries any.
pub const TAG_ROLE_FN: &str = "function() { \
     return [this.tagName || '', this.getAttribute('role') || ''].join(' ').trim().toLowerCase(); }";

/// Function body for `callFunctionOn`: the element's client rectangle as a
/// JSON string.
pub const CLIENT_RECT_FN: &str = "function() { \
     const r = this.getBoundingClientRect(); \
     return JSON.stringify({ x: r.x, y: r.y, width: r.width, height: r.height }); }";

/// Click whatever element sits at `(x, y)`.
pub fn click_at(x: i64, y: i64) -> String {
    format!("document.elementFromPoint({x}, {y}).click();")
}

/// Assign `value` to the element at `(x, y)`. The value is embedded as a JSON
/// string literal.
pub fn set_value_at(x: i64, y: i64, value: &str) -> String {
    let literal = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
    format!("document.elementFromPoint({x}, {y}).value = {literal};")
}

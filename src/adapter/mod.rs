//! Concrete browser drivers.

pub mod chromiumoxide;

pub use self::chromiumoxide::{ChromiumElement, ChromiumoxideDriver};

//! Shared test utilities for the featureinfo proxy workspace.
//!
//! This crate provides common testing infrastructure including:
//! - The XSL stylesheets used by the aggregation scenarios
//! - Canned backend responses
//! - Client query builders
//! - Whitespace-insensitive markup assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_markup_eq, fixtures};
//! ```

pub mod fixtures;
pub mod stylesheets;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use stylesheets::*;

/// Remove every whitespace character.
///
/// Feature info bodies are compared this way so that indentation produced
/// by stylesheets does not matter.
pub fn strip_whitespace(data: &str) -> String {
    data.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Macro for whitespace-insensitive equality of markup strings.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_markup_eq;
///
/// assert_markup_eq!("<a>\n  <b/>\n</a>", "<a><b/></a>"); // passes
/// ```
#[macro_export]
macro_rules! assert_markup_eq {
    ($left:expr, $right:expr) => {{
        let left = $crate::strip_whitespace(&$left);
        let right = $crate::strip_whitespace(&$right);
        if left != right {
            panic!(
                "assertion failed: `(left ≈ right)` ignoring whitespace\n  left: `{}`,\n right: `{}`",
                left, right
            );
        }
    }};
}

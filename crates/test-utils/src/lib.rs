//! Shared test utilities for the aq2rdb workspace.
//!
//! This crate provides common testing infrastructure including:
//! - In-memory doubles for the upstream collaborators
//! - Fixture builders for sites, series, points and qualifiers
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, MockSeriesService};
//! ```

pub mod doubles;
pub mod fixtures;

// Re-export commonly used items at the crate root
pub use doubles::*;

/// Assert that a rendered RDB body contains `needle` on some line.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_rdb_line;
///
/// assert_rdb_line!(header, "# //STATISTIC CODE=\"00003\"");
/// ```
#[macro_export]
macro_rules! assert_rdb_line {
    ($text:expr, $needle:expr) => {{
        let text: &str = &$text;
        let needle: &str = &$needle;
        if !text.lines().any(|line| line.contains(needle)) {
            panic!(
                "assertion failed: no line contains `{}`\n--- text ---\n{}",
                needle, text
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_rdb_line_passes() {
        assert_rdb_line!("# //A\n# //B=\"1\"\n", "B=\"1\"");
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_rdb_line_fails() {
        assert_rdb_line!("# //A\n", "missing");
    }
}

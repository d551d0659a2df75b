//! Autostart list resolution.
//!
//! The configured autostart list is an ordered sequence of module names. A
//! name equal to `none` (case-insensitive) anywhere in the list collapses the
//! whole run to nothing, which is how an operator disables autostart without
//! deleting the configured default list.

/// Sentinel name that disables autostart entirely.
pub const NONE_SENTINEL: &str = "none";

/// Normalises an autostart list into the names actually to be launched.
///
/// Entries are trimmed, empty entries dropped, and order preserved. Unknown
/// names are kept here: resolution against the catalog happens per entry at
/// launch time, where a miss is logged and skipped without halting the
/// sequence.
#[must_use]
pub fn plan(names: &[String]) -> Vec<String> {
    let cleaned: Vec<String> = names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect();
    if cleaned
        .iter()
        .any(|name| name.eq_ignore_ascii_case(NONE_SENTINEL))
    {
        return Vec::new();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn list(names: &[&str]) -> Vec<String> {
        names.iter().map(|&name| name.to_owned()).collect()
    }

    #[test]
    fn preserves_order_and_trims() {
        let planned = plan(&list(&[" vigil-server ", "vigil-watcher-window", ""]));
        assert_eq!(planned, list(&["vigil-server", "vigil-watcher-window"]));
    }

    #[rstest]
    #[case::alone(&["none"])]
    #[case::uppercase(&["NONE"])]
    #[case::mixed_position(&["vigil-server", "None", "vigil-watcher-window"])]
    fn none_anywhere_collapses_the_list(#[case] names: &[&str]) {
        assert!(plan(&list(names)).is_empty());
    }

    #[test]
    fn unknown_names_pass_through() {
        let planned = plan(&list(&["vigil-server", "bogus-module"]));
        assert_eq!(planned, list(&["vigil-server", "bogus-module"]));
    }
}

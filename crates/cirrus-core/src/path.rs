//! Dotted locations used in diagnostics
//!
//! Paths look like `Resources.Cluster.Properties.Tags[0].Key`. The root of a
//! document is the empty path.

/// Path of a mapping entry below `parent`.
pub fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Path of a sequence element below `parent`.
pub fn item(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Render the root path in a readable way.
pub fn display(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

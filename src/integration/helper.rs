//! External-helper lookup boundary.

/// Cached verdict from an external helper lookup.
///
/// Owned by the helper machinery's cache, which may evict the entry while an
/// evaluation still holds a handle to it.
#[derive(Debug)]
pub struct HelperEntry {
    /// Whether the helper matched the request.
    pub matched: bool,
    /// Opaque tag returned by the helper, if any.
    pub tag: Option<String>,
}

impl HelperEntry {
    /// Create an entry recording the helper's verdict.
    pub fn new(matched: bool) -> Self {
        Self { matched, tag: None }
    }

    /// Attach the helper's opaque tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

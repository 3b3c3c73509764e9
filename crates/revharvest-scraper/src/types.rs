use revharvest_core::ProductMeta;
use serde_json::{Map, Value};

/// One item returned by a transport adapter, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// A review keyed by the source's own field names.
    Review(Map<String, Value>),
    /// Product metadata discovered by the e-commerce adapter.
    Product(ProductMeta),
}

/// Continuation marker handed back to the adapter on the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Opaque token from a cursor-paginated API.
    Token(String),
    /// 1-based page number, or the index of the next product to visit.
    Page(u32),
}

/// Result of one `fetch_batch` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub items: Vec<RawRecord>,
    pub next: Option<Cursor>,
    pub exhausted: bool,
}

impl Batch {
    /// An empty batch with no continuation.
    #[must_use]
    pub fn exhausted() -> Self {
        Self {
            items: Vec::new(),
            next: None,
            exhausted: true,
        }
    }
}

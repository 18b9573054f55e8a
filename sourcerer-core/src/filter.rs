//! Retrieval filter composition.
//!
//! Filters are boolean expressions over document metadata, rendered in
//! the index's OData-style syntax. They are composed, never mutated;
//! the stage-2 filter is always built fresh from stage-1's result set.

use serde::{Deserialize, Serialize};

/// A composed filter expression passed to the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalFilter(String);

impl RetrievalFilter {
    /// Wrap a raw expression. The caller is responsible for its syntax.
    pub fn raw(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// An OR-expression restricting results to the given sourcefiles,
    /// e.g. `(sourcefile eq 'a.txt' or sourcefile eq 'b.pdf')`.
    ///
    /// Returns `None` when `sourcefiles` is empty so callers fall back
    /// to whatever authorization filter applies.
    pub fn sourcefile_any<I, S>(sourcefiles: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let clauses: Vec<String> = sourcefiles
            .into_iter()
            .map(|name| format!("sourcefile eq '{}'", escape_value(name.as_ref())))
            .collect();
        if clauses.is_empty() {
            return None;
        }
        Some(Self(format!("({})", clauses.join(" or "))))
    }

    /// An exclusion on the document category, e.g. `category ne 'secret'`.
    pub fn category_not(category: &str) -> Self {
        Self(format!("category ne '{}'", escape_value(category)))
    }

    /// AND this filter with another: `(lhs) and (rhs)`.
    pub fn and(self, other: RetrievalFilter) -> RetrievalFilter {
        RetrievalFilter(format!("({}) and ({})", self.0, other.0))
    }

    pub fn expression(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RetrievalFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// OData string literals escape embedded single quotes by doubling them.
fn escape_value(value: &str) -> String {
    value.replace('\'', "''")
}

//! List query parameters and their query-string rendering

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query parameters for pagination, filtering and sorting of a list call
///
/// Rendered in the placeholder backend's dialect: `_page`, `_limit`,
/// `_sort`, `_order`, plus one `field=value` pair per filter.
///
/// # Example
/// ```rust,ignore
/// let query = ListQuery::new().page(2).limit(10).filter("userId", "1");
/// // GET /posts?_page=2&_limit=10&userId=1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Page number (starts at 1)
    pub page: Option<usize>,

    /// Number of items per page
    pub limit: Option<usize>,

    /// Exact-match field filters, kept sorted so the rendering is stable
    pub filters: BTreeMap<String, String>,

    /// Sort field and direction
    ///
    /// # Format
    /// - `field:asc` or `field` (ascending)
    /// - `field:desc` (descending)
    pub sort: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = Some(page.max(1));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.clamp(1, 100)); // Maximum 100 per page, minimum 1
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_none() && self.limit.is_none() && self.filters.is_empty() && self.sort.is_none()
    }

    /// Render as a query string without the leading `?`
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();

        if let Some(page) = self.page {
            pairs.push(("_page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("_limit".to_string(), limit.to_string()));
        }
        for (field, value) in &self.filters {
            pairs.push((field.clone(), value.clone()));
        }
        if let Some(sort) = &self.sort {
            let (field, order) = match sort.split_once(':') {
                Some((field, order)) => (field, order),
                None => (sort.as_str(), "asc"),
            };
            pairs.push(("_sort".to_string(), field.to_string()));
            pairs.push(("_order".to_string(), order.to_string()));
        }

        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish()
    }

    /// Append this query to a path
    pub fn apply_to(&self, path: &str) -> String {
        if self.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, self.to_query_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_leaves_path_alone() {
        assert_eq!(ListQuery::new().apply_to("/posts"), "/posts");
    }

    #[test]
    fn test_query_string_rendering() {
        let query = ListQuery::new()
            .page(2)
            .limit(10)
            .filter("userId", "1")
            .sort("title:desc");
        assert_eq!(
            query.apply_to("/posts"),
            "/posts?_page=2&_limit=10&userId=1&_sort=title&_order=desc"
        );
    }

    #[test]
    fn test_limit_is_clamped_and_values_encoded() {
        let query = ListQuery::new().limit(500).filter("title", "a b&c");
        assert_eq!(query.limit, Some(100));
        assert_eq!(query.to_query_string(), "_limit=100&title=a+b%26c");
    }
}

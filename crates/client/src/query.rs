//! List query parameters.

/// Paging and sorting passed through to the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// `field[,asc|desc]`
    pub sort: Option<String>,
}

impl QueryParams {
    pub fn new(page: u32, size: u32, sort: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            sort: Some(sort.into()),
        }
    }

    /// Query pairs for a list request.
    ///
    /// Paging is only sent together with a sort order; the cache buster is
    /// always last.
    pub fn to_pairs(&self, cache_buster: i128) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(sort) = &self.sort {
            if let Some(page) = self.page {
                pairs.push(("page", page.to_string()));
            }
            if let Some(size) = self.size {
                pairs.push(("size", size.to_string()));
            }
            pairs.push(("sort", sort.clone()));
        }
        pairs.push(("cacheBuster", cache_buster.to_string()));
        pairs
    }
}

/// Milliseconds since the epoch, unique enough to defeat HTTP caches.
pub fn cache_buster() -> i128 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

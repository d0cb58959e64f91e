//! Pagination for ordered storage scans
//!
//! Page size only affects how many rows each fetch returns; every scan in
//! this crate produces the same result for any positive page size.

/// LIMIT/OFFSET window for one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Rows to skip
    pub offset: i64,
    /// Maximum rows to return
    pub limit: i64,
}

impl PageRequest {
    /// First page of `limit` rows (clamped to at least 1)
    ///
    /// # Examples
    /// ```
    /// use bioseed_effort::pagination::PageRequest;
    ///
    /// let page = PageRequest::first(50);
    /// assert_eq!(page.offset, 0);
    /// assert_eq!(page.next().offset, 50);
    ///
    /// // Non-positive sizes fall back to one row per page
    /// assert_eq!(PageRequest::first(0).limit, 1);
    /// ```
    pub fn first(limit: i64) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
        }
    }

    /// The window directly after this one
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }

    /// Whether a fetch that returned `fetched` rows was the last page
    pub fn is_last(&self, fetched: usize) -> bool {
        (fetched as i64) < self.limit
    }
}

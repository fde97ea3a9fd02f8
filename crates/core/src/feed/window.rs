/// Page size of the cached top-of-feed page.
pub const DEFAULT_TOP_FEED_LIMIT: usize = 30;

/// A pagination window over a user's reverse-chronological feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedWindow {
    pub offset: usize,
    pub limit: usize,
}

impl FeedWindow {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// The first page of a feed with the given page size.
    ///
    /// The cache contract is defined in terms of this window: the feed read
    /// path and the refresh worker must be handed the same value.
    pub fn top(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

impl Default for FeedWindow {
    fn default() -> Self {
        Self::top(DEFAULT_TOP_FEED_LIMIT)
    }
}

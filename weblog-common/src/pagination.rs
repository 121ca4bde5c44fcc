pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// A validated page request. Page numbers are 1-based; zero values
/// from the query string are clamped up.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Pagination {
    page: u32,
    size: u32,
}

impl Pagination {
    #[must_use]
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
        }
    }

    #[must_use]
    pub fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn size(self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.size)
    }

    #[must_use]
    pub fn total_pages(self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.size))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page_of_six() {
        let pagination = Pagination::default();

        assert_eq!(pagination.page(), 1);
        assert_eq!(pagination.size(), 6);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn zero_page_and_size_are_clamped() {
        let pagination = Pagination::new(Some(0), Some(0));

        assert_eq!(pagination.page(), 1);
        assert_eq!(pagination.size(), 1);
    }

    #[test]
    fn offset_skips_previous_pages() {
        assert_eq!(Pagination::new(Some(3), Some(6)).offset(), 12);
    }

    #[test]
    fn thirteen_posts_at_size_six_make_three_pages() {
        let pagination = Pagination::new(None, None);

        assert_eq!(pagination.total_pages(13), 3);
        assert_eq!(pagination.total_pages(12), 2);
        assert_eq!(pagination.total_pages(1), 1);
        assert_eq!(pagination.total_pages(0), 0);
    }
}

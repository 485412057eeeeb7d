/// Current page of the listing. Pages are 1-based; `per_page` is fixed for the
/// lifetime of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    current: u32,
    per_page: u32,
}

impl PageState {
    pub fn new(per_page: u32) -> Self {
        Self {
            current: 1,
            per_page: per_page.max(1),
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Returns true when the page actually changed.
    pub fn reset(&mut self) -> bool {
        self.set(1)
    }

    pub fn select(&mut self, page: u32, total_pages: u32) -> bool {
        if page == 0 || page > total_pages.max(1) {
            return false;
        }
        self.set(page)
    }

    /// Pulls the page back inside `1..=total_pages` after a listing reports
    /// fewer pages than the current one.
    pub fn clamp(&mut self, total_pages: u32) -> bool {
        let limit = total_pages.max(1);
        if self.current > limit {
            self.set(limit)
        } else {
            false
        }
    }

    fn set(&mut self, page: u32) -> bool {
        if self.current == page {
            return false;
        }
        self.current = page;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_stays_within_bounds() {
        let mut pages = PageState::new(12);
        assert!(!pages.select(1, 3));
        assert!(pages.select(2, 3));
        assert!(pages.select(3, 3));
        assert!(!pages.select(3, 3));
        assert_eq!(pages.current(), 3);
        assert!(!pages.select(4, 3));
        assert!(!pages.select(0, 3));
        assert!(pages.select(1, 3));
    }

    #[test]
    fn clamp_pulls_back_to_last_page() {
        let mut pages = PageState::new(12);
        pages.select(3, 3);
        assert!(pages.clamp(2));
        assert_eq!(pages.current(), 2);
        assert!(pages.clamp(0));
        assert_eq!(pages.current(), 1);
        assert!(!pages.clamp(0));
    }

    #[test]
    fn reset_reports_change_only_once() {
        let mut pages = PageState::new(0);
        assert_eq!(pages.per_page(), 1);
        pages.select(2, 5);
        assert!(pages.reset());
        assert!(!pages.reset());
    }
}

use serde::Serialize;

/// Allowed page sizes: 10, 20, 30, 40, 50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSize(usize);

impl PageSize {
    pub const MENU: [usize; 5] = [10, 20, 30, 40, 50];

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

impl TryFrom<usize> for PageSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if Self::MENU.contains(&value) {
            Ok(PageSize(value))
        } else {
            Err(format!(
                "page_size must be one of {:?}, got {value}",
                Self::MENU
            ))
        }
    }
}

pub fn page_count(rows: usize, size: PageSize) -> usize {
    rows.div_ceil(size.get())
}

/// The slice for `page` (zero-based). The index is not clamped: a page past
/// the end is empty, which is what a client sees when it narrows a filter
/// without resetting its page.
pub fn page_bounds(rows: usize, page: usize, size: PageSize) -> (usize, usize) {
    let start = page.saturating_mul(size.get()).min(rows);
    let end = start.saturating_add(size.get()).min(rows);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_validation() {
        assert!(PageSize::try_from(20).is_ok());
        assert!(PageSize::try_from(25).is_err());
        assert_eq!(PageSize::default().get(), 10);
    }

    #[test]
    fn test_bounds_and_count() {
        let size = PageSize::try_from(10).unwrap();
        assert_eq!(page_count(25, size), 3);
        assert_eq!(page_bounds(25, 0, size), (0, 10));
        assert_eq!(page_bounds(25, 2, size), (20, 25));
        assert_eq!(page_bounds(25, 7, size), (25, 25));
        assert_eq!(page_count(0, size), 0);
    }
}

//! Page index newtype for safe conversion between 0-based indices and lopdf's
//! 1-based page numbers.

use std::fmt;

use crate::error::Error;

/// A validated 0-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(usize);

impl PageIndex {
    /// Create a new PageIndex without validation.
    ///
    /// Only use this when the index is known to be in range.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Get the 1-indexed page number used by lopdf's page map.
    pub fn as_lopdf_page_number(self) -> Result<u32, Error> {
        u32::try_from(self.0 + 1).map_err(|_| Error::PdfInvalidPage {
            page: self.0,
            total: 0,
        })
    }

    /// Validate a page index against the document's page count.
    pub const fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        if page_num >= total_pages {
            return Err(Error::PdfInvalidPage {
                page: page_num,
                total: total_pages,
            });
        }
        Ok(Self(page_num))
    }
}

impl From<PageIndex> for usize {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_page_num_valid() {
        let idx = PageIndex::try_from_page_num(5, 10).unwrap();
        assert_eq!(idx.as_usize(), 5);
    }

    #[test]
    fn test_try_from_page_num_out_of_range() {
        assert!(PageIndex::try_from_page_num(10, 5).is_err());
        assert!(PageIndex::try_from_page_num(0, 0).is_err());
    }

    #[test]
    fn test_as_lopdf_page_number() {
        assert_eq!(PageIndex::new(0).as_lopdf_page_number().unwrap(), 1);
        assert_eq!(PageIndex::new(5).as_lopdf_page_number().unwrap(), 6);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PageIndex::new(7)), "7");
    }
}

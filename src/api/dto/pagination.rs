//! Pagination query parameters.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 25;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Validates pagination parameters and converts them to `(offset, limit)`.
    ///
    /// Defaults to page 1 with 25 items. Page size must be between 1 and 100.
    pub fn validate_and_get_offset_limit(&self) -> Result<(i64, i64), String> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err("Page must be greater than 0".to_string());
        }

        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(format!("Page size must be between 1 and {MAX_PAGE_SIZE}"));
        }

        let offset = i64::from(page - 1) * i64::from(page_size);

        Ok((offset, i64::from(page_size)))
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Page metadata returned alongside list results.
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

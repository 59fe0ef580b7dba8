//! List-endpoint pagination (spec §6): `page ≥ 1`, `page_size ∈ [1,100]`
//! (default 50), sort fields drawn from a per-entity whitelist.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub sort: Option<String>,
}

impl PageParams {
    /// Clamp into `[1, MAX_PAGE_SIZE]`, defaulting to `DEFAULT_PAGE_SIZE`.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Resolve `sort` against `allowed`, falling back to `allowed`'s first
    /// entry (the entity's natural default order) on no match.
    pub fn sort_field<'a>(&self, allowed: &'a [&'a str]) -> &'a str {
        self.sort
            .as_deref()
            .and_then(|requested| allowed.iter().find(|&&field| field == requested))
            .copied()
            .unwrap_or(allowed[0])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub pages: u32,
}

/// Slice an already-sorted in-memory `Vec` into one page (`state::*`
/// helpers return full filtered result sets; coordinators/routes do not
/// push pagination down into MongoDB queries for this crate's scope).
pub fn paginate<T>(mut items: Vec<T>, params: &PageParams) -> Page<T> {
    let total = items.len() as u64;
    let page = params.page();
    let page_size = params.page_size();
    let pages = total.div_ceil(page_size as u64).max(1) as u32;

    let start = ((page - 1) as u64 * page_size as u64) as usize;
    let end = (start + page_size as usize).min(items.len());
    let slice = if start >= items.len() {
        Vec::new()
    } else {
        items.drain(start..end).collect()
    };

    Page {
        items: slice,
        total,
        page,
        page_size,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamps_page_size() {
        let params = PageParams { page: None, page_size: Some(500), sort: None };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn page_zero_clamps_to_one() {
        let params = PageParams { page: Some(0), page_size: None, sort: None };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_default() {
        let params = PageParams { page: None, page_size: None, sort: Some("bogus".into()) };
        assert_eq!(params.sort_field(&["date", "amount"]), "date");
    }

    #[test]
    fn known_sort_field_is_honored() {
        let params = PageParams { page: None, page_size: None, sort: Some("amount".into()) };
        assert_eq!(params.sort_field(&["date", "amount"]), "amount");
    }

    #[test]
    fn paginate_computes_pages_and_slices() {
        let items: Vec<u32> = (0..125).collect();
        let params = PageParams { page: Some(2), page_size: Some(50), sort: None };
        let page = paginate(items, &params);
        assert_eq!(page.total, 125);
        assert_eq!(page.pages, 3);
        assert_eq!(page.items.len(), 50);
        assert_eq!(page.items[0], 50);
    }

    #[test]
    fn paginate_past_the_end_returns_empty() {
        let items: Vec<u32> = (0..10).collect();
        let params = PageParams { page: Some(5), page_size: Some(10), sort: None };
        let page = paginate(items, &params);
        assert!(page.items.is_empty());
        assert_eq!(page.pages, 1);
    }
}

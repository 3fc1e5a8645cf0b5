use serde::{Deserialize, Serialize};

use shared_config::SchedulingConfig;

/// Normalised limit/offset pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    /// Missing or non-positive limits fall back to the default page size;
    /// oversized ones are clamped. Negative offsets become zero.
    pub fn normalize(limit: Option<i64>, offset: Option<i64>, config: &SchedulingConfig) -> Self {
        let limit = match limit {
            Some(limit) if limit > 0 => limit.min(config.max_page_size),
            _ => config.default_page_size,
        };

        Self {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }

    /// Rows to ask the store for; the extra row tells whether a next page exists.
    pub fn fetch_limit(&self) -> i64 {
        self.limit.saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from a result fetched with [`PageRequest::fetch_limit`].
    pub fn from_overfetch(mut items: Vec<T>, request: PageRequest) -> Self {
        let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);
        let has_more = items.len() > limit;
        items.truncate(limit);

        Self {
            items,
            limit: request.limit,
            offset: request.offset,
            has_more,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_defaults_and_clamps() {
        let config = SchedulingConfig::default();

        assert_eq!(PageRequest::normalize(None, None, &config), PageRequest { limit: 20, offset: 0 });
        assert_eq!(PageRequest::normalize(Some(0), Some(-3), &config), PageRequest { limit: 20, offset: 0 });
        assert_eq!(PageRequest::normalize(Some(500), Some(40), &config), PageRequest { limit: 100, offset: 40 });
    }

    #[test]
    fn test_overfetch_sets_has_more() {
        let request = PageRequest { limit: 2, offset: 0 };

        let page = Page::from_overfetch(vec![1, 2, 3], request);
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_more);

        let page = Page::from_overfetch(vec![1, 2], request);
        assert!(!page.has_more);
    }

    #[test]
    fn test_fetch_limit_saturates() {
        let config = SchedulingConfig { max_page_size: i64::MAX, ..SchedulingConfig::default() };
        let request = PageRequest::normalize(Some(i64::MAX), None, &config);

        assert_eq!(request.limit, i64::MAX);
        assert_eq!(request.fetch_limit(), i64::MAX);
        assert_eq!(PageRequest { limit: 20, offset: 0 }.fetch_limit(), 21);
    }
}

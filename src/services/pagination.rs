use serde::{Deserialize, Serialize};

use crate::store::Document;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// `?page=&page_size=&search=` accepted by every list endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    /// Slice one page out of an already filtered result set
    pub fn slice(all: Vec<T>, query: &ListQuery) -> Self {
        let page = query.page();
        let page_size = query.page_size();
        let total = all.len();
        let items = all
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();
        Self {
            items,
            total,
            page,
            page_size,
        }
    }

    pub async fn map_async<U, F, Fut>(self, mut f: F) -> Page<U>
    where
        F: FnMut(T) -> Fut,
        Fut: std::future::Future<Output = U>,
    {
        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            items.push(f(item).await);
        }
        Page {
            items,
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Newest first, then paginate
pub fn newest_first<T: Document>(mut docs: Vec<T>, query: &ListQuery) -> Page<T> {
    docs.sort_by(|a, b| b.meta().created_at.cmp(&a.meta().created_at));
    Page::slice(docs, query)
}

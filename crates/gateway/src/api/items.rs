use tracing::instrument;
use tradepost_core::{Item, ItemId, ItemUpdate, NewItem, Page};

use super::to_body;
use crate::config::Service;
use crate::dispatch::{Dispatcher, RequestOptions};
use crate::error::Result;

/// Page size used when a search does not name one.
pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Catalog search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text filter; omitted from the request when `None`.
    pub q: Option<String>,
    /// Zero-based page number.
    pub page: u32,
    pub size: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            q: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchQuery {
    /// Search for `q` on the first page.
    #[must_use]
    pub fn text(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }
}

/// Item (catalog) service.
#[derive(Debug, Clone, Copy)]
pub struct ItemsApi<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> ItemsApi<'a> {
    pub(super) const fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &SearchQuery) -> Result<Page<Item>> {
        let options = RequestOptions::get()
            .query("q", query.q.as_deref())
            .query("page", Some(query.page))
            .query("size", Some(query.size));
        self.dispatcher
            .call(Service::Items, "", options)
            .await?
            .into_json()
    }

    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &ItemId) -> Result<Item> {
        self.dispatcher
            .call(Service::Items, &segment(id), RequestOptions::get())
            .await?
            .into_json()
    }

    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self, item), fields(sku = %item.sku))]
    pub async fn create(&self, item: &NewItem) -> Result<Item> {
        self.dispatcher
            .call(Service::Items, "", RequestOptions::post(to_body(item)?))
            .await?
            .into_json()
    }

    /// # Errors
    ///
    /// Returns the dispatcher's failure.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: &ItemId, update: &ItemUpdate) -> Result<Item> {
        self.dispatcher
            .call(Service::Items, &segment(id), RequestOptions::put(to_body(update)?))
            .await?
            .into_json()
    }
}

/// Item ids may be free-form strings; keep them to one path segment.
fn segment(id: &ItemId) -> String {
    urlencoding::encode(id.as_str()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_is_one_path_segment() {
        assert_eq!(segment(&ItemId::new("SKU-9")), "SKU-9");
        assert_eq!(segment(&ItemId::from(12)), "12");
        assert_eq!(segment(&ItemId::new("a/b?c#d")), "a%2Fb%3Fc%23d");
    }

    #[test]
    fn test_default_search_is_first_page_of_twelve() {
        let query = SearchQuery::default();
        assert_eq!(query.q, None);
        assert_eq!(query.page, 0);
        assert_eq!(query.size, 12);
        assert_eq!(SearchQuery::text("tea").q.as_deref(), Some("tea"));
    }
}

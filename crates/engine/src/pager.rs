//! Paginated List Controller.
//!
//! A [`Pager`] shows one page of a collection and walks it with the cursors
//! the server returned. Requests are split in two phases so that several can
//! be in flight: `begin_*` stamps a [`PageRequest`] with a fresh sequence
//! number, [`Pager::complete`] applies a result only if it carries the
//! latest one.
use api_types::Id;
use serde::de::DeserializeOwned;

use crate::{
    ResultEngine,
    error::EngineError,
    remote::{Api, Collection, Cursor, ListQuery, Page, QueryFilter},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nav {
    First,
    Next,
    Previous,
    Refresh,
}

/// A list request issued by a [`Pager`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    seq: u64,
    collection: Collection,
    nav: Nav,
    query: ListQuery,
    /// Cursor that identifies the requested page; `None` for the first one.
    target: Option<Cursor>,
}

impl PageRequest {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn nav(&self) -> Nav {
        self.nav
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub async fn fetch<T: DeserializeOwned>(&self, api: &Api) -> ResultEngine<Page<T>> {
        api.list(self.collection, &self.query).await
    }
}

#[derive(Debug)]
pub struct Pager<T, F> {
    api: Api,
    collection: Collection,
    filter: F,
    page_size: u32,
    page: Page<T>,
    current: Option<Cursor>,
    back: Vec<Option<Cursor>>,
    loading: bool,
    last_error: Option<EngineError>,
    seq: u64,
}

impl<T, F> Pager<T, F>
where
    T: DeserializeOwned,
    F: QueryFilter + Clone,
{
    pub fn new(api: Api, collection: Collection, filter: F, page_size: u32) -> Self {
        Self {
            api,
            collection,
            filter,
            page_size,
            page: Page::default(),
            current: None,
            back: Vec::new(),
            loading: false,
            last_error: None,
            seq: 0,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page(&self) -> &Page<T> {
        &self.page
    }

    pub fn items(&self) -> &[T] {
        &self.page.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&EngineError> {
        self.last_error.as_ref()
    }

    /// 1-based position of the displayed page, counted from the last
    /// first-page load.
    pub fn page_number(&self) -> usize {
        self.back.len() + 1
    }

    pub fn has_next(&self) -> bool {
        self.page.next_cursor.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.page.previous_cursor.is_some()
    }

    /// Starts a first-page request. Every cursor minted for the previous
    /// filter becomes useless.
    pub fn begin_load(&mut self, filter: F, page_size: u32) -> PageRequest {
        let query = ListQuery::first(&filter, page_size);
        self.filter = filter;
        self.page_size = page_size;
        self.issue(Nav::First, query, None)
    }

    pub fn begin_next(&mut self) -> Option<PageRequest> {
        let cursor = self.page.next_cursor.clone()?;
        Some(self.issue(Nav::Next, ListQuery::cursor(cursor.clone()), Some(cursor)))
    }

    pub fn begin_previous(&mut self) -> Option<PageRequest> {
        let cursor = self.page.previous_cursor.clone()?;
        Some(self.issue(
            Nav::Previous,
            ListQuery::cursor(cursor.clone()),
            Some(cursor),
        ))
    }

    /// Requests the displayed page again, keeping the position.
    pub fn begin_refresh(&mut self) -> PageRequest {
        match self.current.clone() {
            Some(cursor) => self.issue(Nav::Refresh, ListQuery::cursor(cursor.clone()), Some(cursor)),
            None => {
                let query = ListQuery::first(&self.filter, self.page_size);
                self.issue(Nav::Refresh, query, None)
            }
        }
    }

    /// Applies the outcome of `req`.
    ///
    /// Returns `Ok(false)` when a newer request was issued meanwhile; the
    /// result is then dropped untouched. A failure keeps the displayed page
    /// and is remembered as [`last_error`](Self::last_error).
    pub fn complete(
        &mut self,
        req: PageRequest,
        result: ResultEngine<Page<T>>,
    ) -> ResultEngine<bool> {
        if req.seq != self.seq {
            tracing::warn!(
                "discarding stale {} page (request {}, latest {})",
                self.collection,
                req.seq,
                self.seq
            );
            return Ok(false);
        }
        self.loading = false;

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!("{} page request failed: {err}", self.collection);
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };

        match req.nav {
            Nav::First => self.back.clear(),
            Nav::Next => self.back.push(self.current.take()),
            Nav::Previous => {
                self.back.pop();
            }
            Nav::Refresh => {}
        }
        self.current = req.target;
        self.page = page;
        self.last_error = None;
        Ok(true)
    }

    pub async fn load(&mut self, filter: F, page_size: u32) -> ResultEngine<()> {
        let req = self.begin_load(filter, page_size);
        self.run(req).await
    }

    /// Follows `next`; nothing happens on the last page.
    pub async fn next(&mut self) -> ResultEngine<()> {
        match self.begin_next() {
            Some(req) => self.run(req).await,
            None => Ok(()),
        }
    }

    /// Follows `previous`; nothing happens on the first page.
    pub async fn previous(&mut self) -> ResultEngine<()> {
        match self.begin_previous() {
            Some(req) => self.run(req).await,
            None => Ok(()),
        }
    }

    /// Re-fetches the displayed page. When it no longer exists (its last row
    /// was deleted) the pager steps back one page.
    pub async fn refresh_in_place(&mut self) -> ResultEngine<()> {
        let req = self.begin_refresh();
        match self.run(req).await {
            Err(EngineError::NotFound(_)) if self.current.is_some() && self.has_previous() => {
                tracing::info!("{} page vanished, stepping back", self.collection);
                self.previous().await
            }
            other => other,
        }
    }

    /// Points the pager at another collection of the same row type and
    /// forgets everything about the old one, in-flight requests included.
    pub fn retarget(&mut self, collection: Collection, filter: F, page_size: u32) {
        self.collection = collection;
        self.filter = filter;
        self.page_size = page_size;
        self.page = Page::default();
        self.current = None;
        self.back.clear();
        self.last_error = None;
        self.loading = false;
        self.seq += 1;
    }

    fn issue(&mut self, nav: Nav, query: ListQuery, target: Option<Cursor>) -> PageRequest {
        self.seq += 1;
        self.loading = true;
        PageRequest {
            seq: self.seq,
            collection: self.collection,
            nav,
            query,
            target,
        }
    }

    async fn run(&mut self, req: PageRequest) -> ResultEngine<()> {
        let result = req.fetch(&self.api).await;
        self.complete(req, result).map(|_| ())
    }
}

impl<T, F> Pager<T, F>
where
    T: HasId,
{
    pub fn find(&self, id: Id) -> Option<&T> {
        self.page.items.iter().find(|item| item.id() == id)
    }
}

/// Rows that carry their server id.
pub trait HasId {
    fn id(&self) -> Id;
}

impl HasId for api_types::cash_flow::CashFlow {
    fn id(&self) -> Id {
        self.id
    }
}

impl HasId for api_types::dictionary::DictionaryEntry {
    fn id(&self) -> Id {
        self.id
    }
}

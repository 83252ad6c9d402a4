//! Remote Access Layer.
//!
//! [`Remote`] is the collection-oriented contract every backend implements
//! (the HTTP adapter in [`crate::http`] and the in-memory one in
//! [`crate::memory`]). It speaks JSON values; [`Api`] sits on top of it and
//! turns typed intents into requests and responses back into typed values.
//! Neither holds any state besides the connection.
use std::{collections::HashSet, fmt, sync::Arc};

use api_types::Id;
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{ResultEngine, error::EngineError};

/// Largest page the server accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// The five collections exposed by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Statuses,
    Types,
    Categories,
    Subcategories,
    CashFlows,
}

impl Collection {
    /// Path of the collection relative to the API root, with the trailing
    /// slash the server expects.
    pub fn path(self) -> &'static str {
        match self {
            Self::Statuses => "statuses/",
            Self::Types => "cash_flow_types/",
            Self::Categories => "categories/",
            Self::Subcategories => "subcategories/",
            Self::CashFlows => "cash_flows/",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Statuses => "statuses",
            Self::Types => "types",
            Self::Categories => "categories",
            Self::Subcategories => "subcategories",
            Self::CashFlows => "cash_flows",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque pagination token minted by the remote collection.
///
/// The client never parses a cursor: it only hands back what a previous
/// page returned as `next` or `previous`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps a token received from the server. Only remote implementations
    /// should call this.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Anything that can be turned into list filter parameters.
pub trait QueryFilter {
    /// `(field, value)` pairs; empty values are dropped before sending.
    fn query_params(&self) -> Vec<(&'static str, String)>;
}

/// Filter of the dictionary collections: they only take a page size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoFilter;

impl QueryFilter for NoFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// A list request.
///
/// Following a cursor carries nothing else: the cursor already encodes the
/// filters and the page size of the query that minted it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListQuery {
    First {
        params: Vec<(&'static str, String)>,
        page_size: u32,
    },
    Cursor(Cursor),
}

impl ListQuery {
    pub fn first(filter: &impl QueryFilter, page_size: u32) -> Self {
        let params = filter
            .query_params()
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        Self::First { params, page_size }
    }

    pub fn cursor(cursor: Cursor) -> Self {
        Self::Cursor(cursor)
    }

    /// Query string pairs of a first-page request, `page_size` last.
    /// Empty for a cursor request.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::First { params, page_size } => {
                let mut pairs = params.clone();
                pairs.push(("page_size", page_size.to_string()));
                pairs
            }
            Self::Cursor(_) => Vec::new(),
        }
    }

    pub fn as_cursor(&self) -> Option<&Cursor> {
        match self {
            Self::First { .. } => None,
            Self::Cursor(cursor) => Some(cursor),
        }
    }
}

/// One page of a collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
    pub previous_cursor: Option<Cursor>,
    pub total_count: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            previous_cursor: None,
            total_count: 0,
        }
    }
}

impl<T> Page<T> {
    fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            next_cursor: self.next_cursor,
            previous_cursor: self.previous_cursor,
            total_count: self.total_count,
        })
    }
}

/// Collection-oriented contract of the server.
///
/// Implementations must report a missing id on `update`/`delete` as
/// [`EngineError::NotFound`] and a delete refused because of references as
/// [`EngineError::Conflict`].
#[async_trait]
pub trait Remote: Send + Sync {
    async fn list(&self, collection: Collection, query: &ListQuery) -> ResultEngine<Page<Value>>;

    async fn create(&self, collection: Collection, payload: Value) -> ResultEngine<Value>;

    async fn update(&self, collection: Collection, id: Id, payload: Value) -> ResultEngine<Value>;

    async fn delete(&self, collection: Collection, id: Id) -> ResultEngine<()>;
}

/// Typed front of a [`Remote`]. Cheap to clone.
#[derive(Clone)]
pub struct Api {
    remote: Arc<dyn Remote>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api").finish_non_exhaustive()
    }
}

impl Api {
    pub fn new(remote: impl Remote + 'static) -> Self {
        Self {
            remote: Arc::new(remote),
        }
    }

    pub fn from_shared(remote: Arc<dyn Remote>) -> Self {
        Self { remote }
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: Collection,
        query: &ListQuery,
    ) -> ResultEngine<Page<T>> {
        tracing::debug!(
            "list {collection} (cursor: {})",
            query.as_cursor().is_some()
        );
        let page = self.remote.list(collection, query).await?;
        page.try_map(|value| decode(collection, value))
    }

    /// Fetches every page of a collection, following `next` until the end.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
        page_size: u32,
    ) -> ResultEngine<Vec<T>> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut query = ListQuery::first(&NoFilter, page_size);

        loop {
            let page = self.list::<T>(collection, &query).await?;
            items.extend(page.items);
            match page.next_cursor {
                Some(next) if seen.insert(next.clone()) => query = ListQuery::cursor(next),
                Some(next) => {
                    return Err(EngineError::Unknown(format!(
                        "{collection} pagination loops on {}",
                        next.as_str()
                    )));
                }
                None => break,
            }
        }

        Ok(items)
    }

    pub async fn create<T: DeserializeOwned>(
        &self,
        collection: Collection,
        payload: &impl Serialize,
    ) -> ResultEngine<T> {
        tracing::debug!("create in {collection}");
        let value = self.remote.create(collection, encode(payload)?).await?;
        decode(collection, value)
    }

    pub async fn update<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: Id,
        payload: &impl Serialize,
    ) -> ResultEngine<T> {
        tracing::debug!("update {collection}/{id}");
        let value = self.remote.update(collection, id, encode(payload)?).await?;
        decode(collection, value)
    }

    pub async fn delete(&self, collection: Collection, id: Id) -> ResultEngine<()> {
        tracing::debug!("delete {collection}/{id}");
        self.remote.delete(collection, id).await
    }
}

fn encode(payload: &impl Serialize) -> ResultEngine<Value> {
    serde_json::to_value(payload)
        .map_err(|err| EngineError::Unknown(format!("cannot encode payload: {err}")))
}

fn decode<T: DeserializeOwned>(collection: Collection, value: Value) -> ResultEngine<T> {
    serde_json::from_value(value)
        .map_err(|err| EngineError::Unknown(format!("unexpected {collection} payload: {err}")))
}

//! Core of the cash flow console.
//!
//! Leaf first: [`remote`] talks to the server (over [`http`] or the
//! in-process [`memory`] double), [`dictionary`] caches the four
//! classification lists, [`filter`] keeps the cascading record filter valid,
//! [`pager`] drives cursor pagination, [`mutation`] applies writes and the
//! refreshes they require. [`Console`] owns one of each and is what a front
//! end talks to.
pub use api_types;
pub use console::{Console, View};
pub use dictionary::{Dictionaries, DictionaryCache, DictionaryKind};
pub use error::EngineError;
pub use filter::{DateRange, FilterMachine, FilterState, PAGE_SIZES};
pub use forms::{CashFlowDraft, DictionaryDraft};
pub use http::HttpRemote;
pub use memory::InMemoryRemote;
pub use mutation::{Applied, Coordinator, Payload, RefreshPlan, Targets, refresh_plan};
pub use pager::{HasId, Nav, PageRequest, Pager};
pub use remote::{Api, Collection, Cursor, ListQuery, NoFilter, Page, QueryFilter, Remote};

pub mod console;
pub mod dictionary;
pub mod error;
pub mod filter;
pub mod forms;
pub mod http;
pub mod memory;
pub mod mutation;
pub mod pager;
pub mod remote;

pub type ResultEngine<T> = Result<T, EngineError>;

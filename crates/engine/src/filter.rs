//! Cascading Filter State Machine.
//!
//! The record filter keeps `type -> category -> subcategory` valid on every
//! transition: a parent change drops its children, a child must belong to
//! the selected parent. Each accepted transition is pushed, in order, to the
//! subscribers.
use api_types::Id;
use chrono::NaiveDate;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::{
    ResultEngine,
    dictionary::Dictionaries,
    error::EngineError,
    remote::{MAX_PAGE_SIZE, QueryFilter},
};

/// Page sizes offered to the operator.
pub const PAGE_SIZES: [u32; 5] = [5, 10, 25, 50, 100];

/// Inclusive creation date bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DateRange {
    pub after: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(after: Option<NaiveDate>, before: Option<NaiveDate>) -> ResultEngine<Self> {
        if let (Some(after), Some(before)) = (after, before)
            && after > before
        {
            return Err(EngineError::ValidationFailed(format!(
                "date range starts after it ends ({after} > {before})"
            )));
        }
        Ok(Self { after, before })
    }

    pub fn is_empty(&self) -> bool {
        self.after.is_none() && self.before.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterState {
    pub type_id: Option<Id>,
    pub category_id: Option<Id>,
    pub subcategory_id: Option<Id>,
    pub status_id: Option<Id>,
    pub created: DateRange,
    pub page_size: u32,
}

impl FilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            type_id: None,
            category_id: None,
            subcategory_id: None,
            status_id: None,
            created: DateRange::default(),
            page_size,
        }
    }

    /// Whether the cascade holds against `dict`.
    pub fn is_consistent(&self, dict: &Dictionaries) -> bool {
        let category_ok = match self.category_id {
            Some(id) => dict.require_category_of(self.type_id, id).is_ok(),
            None => true,
        };
        let subcategory_ok = match self.subcategory_id {
            Some(id) => dict.require_subcategory_of(self.category_id, id).is_ok(),
            None => true,
        };
        category_ok && subcategory_ok
    }

    fn clear_filters(&mut self) {
        *self = Self::new(self.page_size);
    }
}

impl QueryFilter for FilterState {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let id = |value: Option<Id>| value.map(|id| id.to_string()).unwrap_or_default();
        let date = |value: Option<NaiveDate>| {
            value
                .map(|day| day.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };

        vec![
            ("status", id(self.status_id)),
            ("cash_flow_type", id(self.type_id)),
            ("category", id(self.category_id)),
            ("subcategory", id(self.subcategory_id)),
            ("created_at_after", date(self.created.after)),
            ("created_at_before", date(self.created.before)),
        ]
    }
}

/// Owner of the record [`FilterState`].
#[derive(Debug)]
pub struct FilterMachine {
    state: FilterState,
    subscribers: Vec<UnboundedSender<FilterState>>,
}

impl FilterMachine {
    pub fn new(page_size: u32) -> ResultEngine<Self> {
        check_page_size(page_size)?;
        Ok(Self {
            state: FilterState::new(page_size),
            subscribers: Vec::new(),
        })
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Receives every state accepted from now on.
    pub fn subscribe(&mut self) -> UnboundedReceiver<FilterState> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn set_type(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_type(id)?;
        }
        self.state.type_id = id;
        self.state.category_id = None;
        self.state.subcategory_id = None;
        self.emit();
        Ok(())
    }

    pub fn set_category(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_category_of(self.state.type_id, id)?;
        }
        self.state.category_id = id;
        self.state.subcategory_id = None;
        self.emit();
        Ok(())
    }

    pub fn set_subcategory(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_subcategory_of(self.state.category_id, id)?;
        }
        self.state.subcategory_id = id;
        self.emit();
        Ok(())
    }

    pub fn set_status(&mut self, id: Option<Id>, dict: &Dictionaries) -> ResultEngine<()> {
        if let Some(id) = id {
            dict.require_status(id)?;
        }
        self.state.status_id = id;
        self.emit();
        Ok(())
    }

    pub fn set_date_range(&mut self, range: DateRange) -> ResultEngine<()> {
        let range = DateRange::new(range.after, range.before)?;
        self.state.created = range;
        self.emit();
        Ok(())
    }

    pub fn set_page_size(&mut self, page_size: u32) -> ResultEngine<()> {
        check_page_size(page_size)?;
        self.state.page_size = page_size;
        self.emit();
        Ok(())
    }

    /// Clears every filter; the page size stays.
    pub fn reset(&mut self) {
        self.state.clear_filters();
        self.emit();
    }

    /// Drops selections that `dict` no longer knows, children included.
    /// Emits only when something changed.
    pub fn revalidate(&mut self, dict: &Dictionaries) -> bool {
        let before = self.state.clone();
        let state = &mut self.state;

        if state.type_id.is_some_and(|id| dict.cash_flow_type(id).is_none()) {
            state.type_id = None;
        }
        if let Some(id) = state.category_id
            && dict.require_category_of(state.type_id, id).is_err()
        {
            state.category_id = None;
        }
        if let Some(id) = state.subcategory_id
            && dict.require_subcategory_of(state.category_id, id).is_err()
        {
            state.subcategory_id = None;
        }
        if state.status_id.is_some_and(|id| dict.status(id).is_none()) {
            state.status_id = None;
        }

        let changed = *state != before;
        if changed {
            tracing::info!("filter dropped selections missing from the dictionaries");
            self.emit();
        }
        changed
    }

    fn emit(&mut self) {
        let state = &self.state;
        self.subscribers.retain(|tx| tx.send(state.clone()).is_ok());
    }
}

pub(crate) fn check_page_size(page_size: u32) -> ResultEngine<()> {
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(EngineError::ValidationFailed(format!(
            "page size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
        )));
    }
    Ok(())
}

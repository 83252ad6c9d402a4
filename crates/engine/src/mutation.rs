//! Mutation Coordinator.
//!
//! Writes go to the server first; the views that may now show stale data
//! are then refetched following a [`RefreshPlan`]. Denormalized names are
//! never patched locally.
use api_types::{
    Id,
    cash_flow::{CashFlow, CashFlowNew},
    category::CategoryNew,
    dictionary::{DictionaryEntry, NameNew},
    subcategory::SubcategoryNew,
};
use serde::{Deserialize, Serialize};

use crate::{
    ResultEngine,
    dictionary::{DictionaryCache, DictionaryKind},
    error::EngineError,
    filter::{FilterMachine, FilterState},
    pager::Pager,
    remote::{Api, Collection, NoFilter},
};

/// What the operator is looking at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    Records,
    Dictionary(DictionaryKind),
}

/// Request body of a create or update.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Status(NameNew),
    Type(NameNew),
    Category(CategoryNew),
    Subcategory(SubcategoryNew),
    CashFlow(CashFlowNew),
}

impl Payload {
    pub fn collection(&self) -> Collection {
        match self {
            Self::Status(_) => Collection::Statuses,
            Self::Type(_) => Collection::Types,
            Self::Category(_) => Collection::Categories,
            Self::Subcategory(_) => Collection::Subcategories,
            Self::CashFlow(_) => Collection::CashFlows,
        }
    }
}

/// Refreshes owed after a write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPlan {
    /// Dictionary to refetch.
    pub invalidate: Option<DictionaryKind>,
    /// Refetch the displayed record page.
    pub records: bool,
    /// Refetch the displayed dictionary page.
    pub browser: bool,
}

pub fn refresh_plan(collection: Collection, view: View) -> RefreshPlan {
    match DictionaryKind::from_collection(collection) {
        Some(kind) => RefreshPlan {
            invalidate: Some(kind),
            records: view == View::Records,
            browser: matches!(view, View::Dictionary(_)),
        },
        None => RefreshPlan {
            invalidate: None,
            records: true,
            browser: false,
        },
    }
}

/// State the refresh plan may touch.
pub struct Targets<'a> {
    pub cache: &'a mut DictionaryCache,
    pub filter: &'a mut FilterMachine,
    pub records: &'a mut Pager<CashFlow, FilterState>,
    pub browser: &'a mut Pager<DictionaryEntry, NoFilter>,
    pub view: View,
}

/// Result of a write that reached the server.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Applied {
    /// Id of the created or updated row; `None` after a delete.
    pub id: Option<Id>,
    /// Refreshes that failed afterwards. The write itself stands.
    pub refresh_errors: Vec<EngineError>,
}

#[derive(Deserialize)]
struct Written {
    id: Id,
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    api: Api,
}

impl Coordinator {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    pub async fn create(&self, payload: &Payload, targets: Targets<'_>) -> ResultEngine<Applied> {
        let collection = payload.collection();
        let written: Written = self.api.create(collection, payload).await?;
        tracing::info!("created {collection}/{}", written.id);
        Ok(self.after_write(collection, Some(written.id), targets).await)
    }

    pub async fn update(
        &self,
        id: Id,
        payload: &Payload,
        targets: Targets<'_>,
    ) -> ResultEngine<Applied> {
        let collection = payload.collection();
        let written: Written = self.api.update(collection, id, payload).await?;
        tracing::info!("updated {collection}/{}", written.id);
        Ok(self.after_write(collection, Some(written.id), targets).await)
    }

    pub async fn delete(
        &self,
        collection: Collection,
        id: Id,
        targets: Targets<'_>,
    ) -> ResultEngine<Applied> {
        self.api.delete(collection, id).await?;
        tracing::info!("deleted {collection}/{id}");
        Ok(self.after_write(collection, None, targets).await)
    }

    async fn after_write(
        &self,
        collection: Collection,
        id: Option<Id>,
        targets: Targets<'_>,
    ) -> Applied {
        let plan = refresh_plan(collection, targets.view);
        tracing::debug!("refresh plan after {collection} write: {plan:?}");

        let mut refresh_errors = Vec::new();
        let mut filter_changed = false;
        if let Some(kind) = plan.invalidate {
            match targets.cache.invalidate(kind).await {
                Ok(()) => filter_changed = targets.filter.revalidate(targets.cache.data()),
                Err(err) => refresh_errors.push(err),
            }
        }
        // The displayed cursor still encodes the dropped ids; the emitted
        // filter state reloads the records from the first page instead.
        if filter_changed {
            tracing::debug!("filter changed after {collection} write, skipping record refresh");
        }
        if plan.records
            && !filter_changed
            && let Err(err) = targets.records.refresh_in_place().await
        {
            refresh_errors.push(err);
        }
        if plan.browser
            && let Err(err) = targets.browser.refresh_in_place().await
        {
            refresh_errors.push(err);
        }

        Applied { id, refresh_errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_write_refreshes_records_only_when_shown() {
        assert_eq!(
            refresh_plan(Collection::Types, View::Records),
            RefreshPlan {
                invalidate: Some(DictionaryKind::Type),
                records: true,
                browser: false,
            }
        );
        assert_eq!(
            refresh_plan(
                Collection::Categories,
                View::Dictionary(DictionaryKind::Category)
            ),
            RefreshPlan {
                invalidate: Some(DictionaryKind::Category),
                records: false,
                browser: true,
            }
        );
    }

    #[test]
    fn record_write_refreshes_record_page_only() {
        for view in [View::Records, View::Dictionary(DictionaryKind::Status)] {
            assert_eq!(
                refresh_plan(Collection::CashFlows, view),
                RefreshPlan {
                    invalidate: None,
                    records: true,
                    browser: false,
                }
            );
        }
    }

    #[test]
    fn payload_serializes_as_its_body() {
        let payload = Payload::Category(CategoryNew {
            name: "Salary".into(),
            type_id: 1,
        });
        assert_eq!(payload.collection(), Collection::Categories);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({ "name": "Salary", "cash_flow_type": 1 })
        );
    }
}

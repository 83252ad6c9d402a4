//! Dictionary Cache.
//!
//! Full snapshots of the four classification lists. They are small and
//! curated by hand, so they are fetched to exhaustion and replaced
//! wholesale; nothing patches them locally.
use std::fmt;

use api_types::{
    Id, cash_flow_type::CashFlowType, category::Category, status::Status,
    subcategory::Subcategory,
};
use serde::de::DeserializeOwned;

use crate::{
    ResultEngine,
    error::EngineError,
    remote::{Api, Collection, MAX_PAGE_SIZE},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DictionaryKind {
    Status,
    Type,
    Category,
    Subcategory,
}

impl DictionaryKind {
    pub const ALL: [Self; 4] = [Self::Status, Self::Type, Self::Category, Self::Subcategory];

    pub fn collection(self) -> Collection {
        match self {
            Self::Status => Collection::Statuses,
            Self::Type => Collection::Types,
            Self::Category => Collection::Categories,
            Self::Subcategory => Collection::Subcategories,
        }
    }

    pub fn from_collection(collection: Collection) -> Option<Self> {
        match collection {
            Collection::Statuses => Some(Self::Status),
            Collection::Types => Some(Self::Type),
            Collection::Categories => Some(Self::Category),
            Collection::Subcategories => Some(Self::Subcategory),
            Collection::CashFlows => None,
        }
    }

    /// Kind of the parent a row of this kind points at, if any.
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Category => Some(Self::Type),
            Self::Subcategory => Some(Self::Category),
            Self::Status | Self::Type => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Type => "Type",
            Self::Category => "Category",
            Self::Subcategory => "Subcategory",
        }
    }
}

impl fmt::Display for DictionaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One snapshot of every dictionary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionaries {
    pub statuses: Vec<Status>,
    pub types: Vec<CashFlowType>,
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
}

impl Dictionaries {
    pub fn status(&self, id: Id) -> Option<&Status> {
        self.statuses.iter().find(|status| status.id == id)
    }

    pub fn cash_flow_type(&self, id: Id) -> Option<&CashFlowType> {
        self.types.iter().find(|ty| ty.id == id)
    }

    pub fn category(&self, id: Id) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn subcategory(&self, id: Id) -> Option<&Subcategory> {
        self.subcategories.iter().find(|sub| sub.id == id)
    }

    pub fn categories_of(&self, type_id: Id) -> impl Iterator<Item = &Category> {
        self.categories
            .iter()
            .filter(move |category| category.type_id == type_id)
    }

    pub fn subcategories_of(&self, category_id: Id) -> impl Iterator<Item = &Subcategory> {
        self.subcategories
            .iter()
            .filter(move |sub| sub.category_id == category_id)
    }

    /// `(id, name)` of every row of `kind`, in cache order.
    pub fn options(&self, kind: DictionaryKind) -> Vec<(Id, String)> {
        match kind {
            DictionaryKind::Status => self
                .statuses
                .iter()
                .map(|row| (row.id, row.name.clone()))
                .collect(),
            DictionaryKind::Type => self
                .types
                .iter()
                .map(|row| (row.id, row.name.clone()))
                .collect(),
            DictionaryKind::Category => self
                .categories
                .iter()
                .map(|row| (row.id, row.name.clone()))
                .collect(),
            DictionaryKind::Subcategory => self
                .subcategories
                .iter()
                .map(|row| (row.id, row.name.clone()))
                .collect(),
        }
    }

    pub fn contains(&self, kind: DictionaryKind, id: Id) -> bool {
        match kind {
            DictionaryKind::Status => self.status(id).is_some(),
            DictionaryKind::Type => self.cash_flow_type(id).is_some(),
            DictionaryKind::Category => self.category(id).is_some(),
            DictionaryKind::Subcategory => self.subcategory(id).is_some(),
        }
    }

    pub(crate) fn require_status(&self, id: Id) -> ResultEngine<&Status> {
        self.status(id)
            .ok_or_else(|| EngineError::InvalidReference(format!("status {id}")))
    }

    pub(crate) fn require_type(&self, id: Id) -> ResultEngine<&CashFlowType> {
        self.cash_flow_type(id)
            .ok_or_else(|| EngineError::InvalidReference(format!("type {id}")))
    }

    /// The category `id`, which must belong to the selected type.
    pub(crate) fn require_category_of(
        &self,
        type_id: Option<Id>,
        id: Id,
    ) -> ResultEngine<&Category> {
        let Some(type_id) = type_id else {
            return Err(EngineError::PreconditionFailed(
                "select a type before a category".to_string(),
            ));
        };
        let category = self
            .category(id)
            .ok_or_else(|| EngineError::InvalidReference(format!("category {id}")))?;
        if category.type_id != type_id {
            return Err(EngineError::InvalidReference(format!(
                "category {id} does not belong to type {type_id}"
            )));
        }
        Ok(category)
    }

    /// The subcategory `id`, which must belong to the selected category.
    pub(crate) fn require_subcategory_of(
        &self,
        category_id: Option<Id>,
        id: Id,
    ) -> ResultEngine<&Subcategory> {
        let Some(category_id) = category_id else {
            return Err(EngineError::PreconditionFailed(
                "select a category before a subcategory".to_string(),
            ));
        };
        let sub = self
            .subcategory(id)
            .ok_or_else(|| EngineError::InvalidReference(format!("subcategory {id}")))?;
        if sub.category_id != category_id {
            return Err(EngineError::InvalidReference(format!(
                "subcategory {id} does not belong to category {category_id}"
            )));
        }
        Ok(sub)
    }
}

/// Owner of the dictionary snapshot.
#[derive(Debug)]
pub struct DictionaryCache {
    api: Api,
    page_size: u32,
    data: Dictionaries,
}

impl DictionaryCache {
    pub fn new(api: Api) -> Self {
        Self {
            api,
            page_size: MAX_PAGE_SIZE,
            data: Dictionaries::default(),
        }
    }

    /// Current snapshot, by value.
    pub fn snapshot(&self) -> Dictionaries {
        self.data.clone()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.data.statuses.clone()
    }

    pub fn types(&self) -> Vec<CashFlowType> {
        self.data.types.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.data.categories.clone()
    }

    pub fn subcategories(&self) -> Vec<Subcategory> {
        self.data.subcategories.clone()
    }

    pub fn categories_of(&self, type_id: Id) -> Vec<Category> {
        self.data.categories_of(type_id).cloned().collect()
    }

    pub fn subcategories_of(&self, category_id: Id) -> Vec<Subcategory> {
        self.data.subcategories_of(category_id).cloned().collect()
    }

    pub(crate) fn data(&self) -> &Dictionaries {
        &self.data
    }

    /// Fetches the four dictionaries concurrently.
    ///
    /// A failed fetch keeps the previous rows of its kind; the failures are
    /// returned for the caller to show.
    pub async fn load_all(&mut self) -> Vec<(DictionaryKind, EngineError)> {
        let api = &self.api;
        let size = self.page_size;
        let (statuses, types, categories, subcategories) = tokio::join!(
            api.list_all::<Status>(Collection::Statuses, size),
            api.list_all::<CashFlowType>(Collection::Types, size),
            api.list_all::<Category>(Collection::Categories, size),
            api.list_all::<Subcategory>(Collection::Subcategories, size),
        );

        let mut failed = Vec::new();
        keep(&mut self.data.statuses, statuses, DictionaryKind::Status, &mut failed);
        keep(&mut self.data.types, types, DictionaryKind::Type, &mut failed);
        keep(
            &mut self.data.categories,
            categories,
            DictionaryKind::Category,
            &mut failed,
        );
        keep(
            &mut self.data.subcategories,
            subcategories,
            DictionaryKind::Subcategory,
            &mut failed,
        );

        tracing::debug!(
            "dictionaries loaded: {} statuses, {} types, {} categories, {} subcategories",
            self.data.statuses.len(),
            self.data.types.len(),
            self.data.categories.len(),
            self.data.subcategories.len()
        );
        failed
    }

    /// Re-fetches one dictionary. On failure the previous rows stay.
    pub async fn invalidate(&mut self, kind: DictionaryKind) -> ResultEngine<()> {
        match kind {
            DictionaryKind::Status => self.data.statuses = self.fetch(kind).await?,
            DictionaryKind::Type => self.data.types = self.fetch(kind).await?,
            DictionaryKind::Category => self.data.categories = self.fetch(kind).await?,
            DictionaryKind::Subcategory => self.data.subcategories = self.fetch(kind).await?,
        }
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, kind: DictionaryKind) -> ResultEngine<Vec<T>> {
        self.api
            .list_all(kind.collection(), self.page_size)
            .await
            .inspect_err(|err| tracing::warn!("refresh of {kind} failed, keeping cache: {err}"))
    }
}

fn keep<T>(
    slot: &mut Vec<T>,
    fetched: ResultEngine<Vec<T>>,
    kind: DictionaryKind,
    failed: &mut Vec<(DictionaryKind, EngineError)>,
) {
    match fetched {
        Ok(rows) => *slot = rows,
        Err(err) => {
            tracing::warn!("load of {kind} failed, keeping {} cached rows: {err}", slot.len());
            failed.push((kind, err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dictionaries {
        Dictionaries {
            statuses: vec![Status {
                id: 1,
                name: "Business".into(),
            }],
            types: vec![
                CashFlowType {
                    id: 1,
                    name: "Income".into(),
                },
                CashFlowType {
                    id: 2,
                    name: "Expense".into(),
                },
            ],
            categories: vec![
                Category {
                    id: 4,
                    name: "Salary".into(),
                    type_id: 1,
                    type_name: "Income".into(),
                },
                Category {
                    id: 5,
                    name: "Marketing".into(),
                    type_id: 2,
                    type_name: "Expense".into(),
                },
            ],
            subcategories: vec![Subcategory {
                id: 9,
                name: "Bonus".into(),
                category_id: 4,
                category_name: "Salary".into(),
            }],
        }
    }

    #[test]
    fn children_are_listed_per_parent() {
        let dict = sample();
        let names: Vec<_> = dict.categories_of(2).map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Marketing"]);
        assert_eq!(dict.subcategories_of(4).count(), 1);
        assert_eq!(dict.subcategories_of(5).count(), 0);
    }

    #[test]
    fn membership_checks() {
        let dict = sample();
        assert!(dict.require_category_of(Some(1), 4).is_ok());
        assert!(matches!(
            dict.require_category_of(Some(2), 4),
            Err(EngineError::InvalidReference(_))
        ));
        assert!(matches!(
            dict.require_category_of(None, 4),
            Err(EngineError::PreconditionFailed(_))
        ));
        assert!(matches!(
            dict.require_subcategory_of(Some(4), 77),
            Err(EngineError::InvalidReference(_))
        ));
        assert!(matches!(
            dict.require_status(3),
            Err(EngineError::InvalidReference(_))
        ));
    }

    #[test]
    fn kinds_map_to_collections() {
        for kind in DictionaryKind::ALL {
            assert_eq!(DictionaryKind::from_collection(kind.collection()), Some(kind));
        }
        assert_eq!(DictionaryKind::from_collection(Collection::CashFlows), None);
        assert_eq!(DictionaryKind::Subcategory.parent(), Some(DictionaryKind::Category));
    }
}

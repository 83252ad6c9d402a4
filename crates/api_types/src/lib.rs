use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Server-assigned identifier shared by every collection.
pub type Id = i64;

pub mod page {
    use super::*;

    /// Envelope returned by every list endpoint.
    ///
    /// `next` and `previous` are absolute URLs minted by the server; they
    /// already carry the filters and the page size of the query that
    /// produced them.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Paginated<T> {
        pub count: u64,
        pub next: Option<String>,
        pub previous: Option<String>,
        pub results: Vec<T>,
    }
}

pub mod status {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Status {
        pub id: Id,
        pub name: String,
    }
}

pub mod cash_flow_type {
    use super::*;

    /// Root of the classification hierarchy (income, expense, ...).
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CashFlowType {
        pub id: Id,
        pub name: String,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Category {
        pub id: Id,
        pub name: String,
        #[serde(rename = "cash_flow_type")]
        pub type_id: Id,
        /// Copy of the parent type name at fetch time; stale after a rename
        /// until the category is fetched again.
        #[serde(rename = "cash_flow_type_name", default)]
        pub type_name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        #[serde(rename = "cash_flow_type")]
        pub type_id: Id,
    }
}

pub mod subcategory {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Subcategory {
        pub id: Id,
        pub name: String,
        #[serde(rename = "category")]
        pub category_id: Id,
        #[serde(default)]
        pub category_name: String,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SubcategoryNew {
        pub name: String,
        #[serde(rename = "category")]
        pub category_id: Id,
    }
}

pub mod dictionary {
    use super::*;

    /// Request body for the entities that only carry a name (statuses and
    /// cash flow types).
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NameNew {
        pub name: String,
    }

    /// A row of any dictionary collection, used when browsing them.
    ///
    /// Statuses and types have no parent; categories point at their type and
    /// subcategories at their category.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DictionaryEntry {
        pub id: Id,
        pub name: String,
        #[serde(default, alias = "cash_flow_type", alias = "category")]
        pub parent_id: Option<Id>,
        #[serde(default, alias = "cash_flow_type_name", alias = "category_name")]
        pub parent_name: Option<String>,
    }
}

pub mod cash_flow {
    use super::*;

    /// A ledger movement with the names of its classification copied in.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct CashFlow {
        pub id: Id,
        #[serde(rename = "status")]
        pub status_id: Id,
        #[serde(default)]
        pub status_name: String,
        #[serde(rename = "cash_flow_type")]
        pub type_id: Id,
        #[serde(rename = "cash_flow_type_name", default)]
        pub type_name: String,
        #[serde(rename = "category")]
        pub category_id: Id,
        #[serde(default)]
        pub category_name: String,
        #[serde(rename = "subcategory")]
        pub subcategory_id: Id,
        #[serde(default)]
        pub subcategory_name: String,
        /// Always positive; the type tells the direction.
        pub amount: Decimal,
        #[serde(default)]
        pub comment: String,
        /// RFC3339 timestamp, including timezone offset.
        pub created_at: DateTime<FixedOffset>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct CashFlowNew {
        #[serde(rename = "status")]
        pub status_id: Id,
        #[serde(rename = "cash_flow_type")]
        pub type_id: Id,
        #[serde(rename = "category")]
        pub category_id: Id,
        #[serde(rename = "subcategory")]
        pub subcategory_id: Id,
        pub amount: Decimal,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub comment: Option<String>,
    }
}

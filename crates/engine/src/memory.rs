//! In-memory stand-in for the REST server.
//!
//! It keeps the same observable behaviour as the real collections: page
//! number pagination with absolute `next`/`previous` links, the record
//! filters, denormalized names joined at read time, server-side validation
//! of writes and deletes refused while something still references the row.
//! The console runs against it in demo mode and the tests use it as their
//! backend.
use std::{
    collections::{BTreeMap, HashMap},
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use api_types::{
    Id,
    cash_flow::{CashFlow, CashFlowNew},
    cash_flow_type::CashFlowType,
    category::{Category, CategoryNew},
    dictionary::NameNew,
    status::Status,
    subcategory::{Subcategory, SubcategoryNew},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};

use crate::{
    ResultEngine,
    error::EngineError,
    remote::{Collection, Cursor, ListQuery, MAX_PAGE_SIZE, Page, Remote},
};

const BASE_URL: &str = "http://memory.local/api/";
const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
struct FlowRow {
    status_id: Id,
    type_id: Id,
    category_id: Id,
    subcategory_id: Id,
    amount: Decimal,
    comment: String,
    created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Default)]
struct Store {
    last_id: Id,
    statuses: BTreeMap<Id, String>,
    types: BTreeMap<Id, String>,
    categories: BTreeMap<Id, (String, Id)>,
    subcategories: BTreeMap<Id, (String, Id)>,
    cash_flows: BTreeMap<Id, FlowRow>,
    failures: HashMap<Collection, EngineError>,
    list_log: Vec<(Collection, ListQuery)>,
}

/// Shared handle; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    store: Arc<Mutex<Store>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small ledger with two types, a handful of categories and a few
    /// dozen records spread over the last months.
    pub fn with_sample_data() -> ResultEngine<Self> {
        let remote = Self::new();
        let business = remote.insert_status("Business")?;
        let personal = remote.insert_status("Personal")?;
        let tax = remote.insert_status("Tax")?;

        let income = remote.insert_type("Income")?;
        let expense = remote.insert_type("Expense")?;

        let salary = remote.insert_category("Salary", income)?;
        let sales = remote.insert_category("Sales", income)?;
        let infrastructure = remote.insert_category("Infrastructure", expense)?;
        let marketing = remote.insert_category("Marketing", expense)?;

        let tree = [
            (income, salary, remote.insert_subcategory("Base pay", salary)?),
            (income, salary, remote.insert_subcategory("Bonus", salary)?),
            (income, sales, remote.insert_subcategory("Online", sales)?),
            (expense, infrastructure, remote.insert_subcategory("VPS", infrastructure)?),
            (expense, infrastructure, remote.insert_subcategory("Proxy", infrastructure)?),
            (expense, marketing, remote.insert_subcategory("Avito", marketing)?),
            (expense, marketing, remote.insert_subcategory("Farpost", marketing)?),
        ];
        let statuses = [business, personal, tax];

        let start = Utc
            .with_ymd_and_hms(2025, 1, 6, 9, 30, 0)
            .single()
            .ok_or_else(|| EngineError::Unknown("invalid sample start date".to_string()))?
            .fixed_offset();
        for n in 0..36i64 {
            let (type_id, category_id, subcategory_id) = tree[(n as usize * 5) % tree.len()];
            let amount = Decimal::new(1_500 + (n * 7_919) % 250_000, 2);
            remote.insert_cash_flow(
                CashFlowNew {
                    status_id: statuses[n as usize % statuses.len()],
                    type_id,
                    category_id,
                    subcategory_id,
                    amount,
                    comment: (n % 4 == 0).then(|| format!("entry #{}", n + 1)),
                },
                start + Duration::days(n * 4) + Duration::minutes(n * 37),
            )?;
        }

        Ok(remote)
    }

    pub fn insert_status(&self, name: &str) -> ResultEngine<Id> {
        self.insert(Collection::Statuses, json!({ "name": name }))
    }

    pub fn insert_type(&self, name: &str) -> ResultEngine<Id> {
        self.insert(Collection::Types, json!({ "name": name }))
    }

    pub fn insert_category(&self, name: &str, type_id: Id) -> ResultEngine<Id> {
        self.insert(
            Collection::Categories,
            json!({ "name": name, "cash_flow_type": type_id }),
        )
    }

    pub fn insert_subcategory(&self, name: &str, category_id: Id) -> ResultEngine<Id> {
        self.insert(
            Collection::Subcategories,
            json!({ "name": name, "category": category_id }),
        )
    }

    /// Inserts a record with an explicit creation time.
    pub fn insert_cash_flow(
        &self,
        flow: CashFlowNew,
        created_at: DateTime<FixedOffset>,
    ) -> ResultEngine<Id> {
        let payload = serde_json::to_value(&flow)
            .map_err(|err| EngineError::Unknown(format!("cannot encode payload: {err}")))?;
        let mut store = self.lock();
        let row = store.validate_cash_flow(payload, created_at)?;
        let id = store.next_id();
        store.cash_flows.insert(id, row);
        Ok(id)
    }

    /// Makes every call on `collection` fail with `err` until
    /// [`recover`](Self::recover) is called.
    pub fn fail(&self, collection: Collection, err: EngineError) {
        self.lock().failures.insert(collection, err);
    }

    pub fn recover(&self, collection: Collection) {
        self.lock().failures.remove(&collection);
    }

    /// Every list request received so far, in arrival order.
    pub fn list_requests(&self) -> Vec<(Collection, ListQuery)> {
        self.lock().list_log.clone()
    }

    pub fn clear_list_requests(&self) {
        self.lock().list_log.clear();
    }

    fn insert(&self, collection: Collection, payload: Value) -> ResultEngine<Id> {
        let created = self.lock().write(collection, None, payload)?;
        created
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| EngineError::Unknown("created row has no id".to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Remote for InMemoryRemote {
    async fn list(&self, collection: Collection, query: &ListQuery) -> ResultEngine<Page<Value>> {
        let mut store = self.lock();
        store.list_log.push((collection, query.clone()));
        store.check_failure(collection)?;

        let params = match query {
            ListQuery::First { .. } => query
                .pairs()
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            ListQuery::Cursor(cursor) => parse_cursor(collection, cursor)?,
        };
        store.list(collection, &params)
    }

    async fn create(&self, collection: Collection, payload: Value) -> ResultEngine<Value> {
        let mut store = self.lock();
        store.check_failure(collection)?;
        store.write(collection, None, payload)
    }

    async fn update(&self, collection: Collection, id: Id, payload: Value) -> ResultEngine<Value> {
        let mut store = self.lock();
        store.check_failure(collection)?;
        store.write(collection, Some(id), payload)
    }

    async fn delete(&self, collection: Collection, id: Id) -> ResultEngine<()> {
        let mut store = self.lock();
        store.check_failure(collection)?;
        store.delete(collection, id)
    }
}

impl Store {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn check_failure(&self, collection: Collection) -> ResultEngine<()> {
        match self.failures.get(&collection) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn list(&self, collection: Collection, params: &[(String, String)]) -> ResultEngine<Page<Value>> {
        let page_size = match param(params, "page_size") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| bad_request("page_size", "A valid integer is required."))?
                .clamp(1, MAX_PAGE_SIZE as usize),
            None => DEFAULT_PAGE_SIZE,
        };
        let page = match param(params, "page") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or_else(|| EngineError::NotFound(format!("{collection} page {raw}")))?,
            None => 1,
        };

        let rows = match collection {
            Collection::Statuses => self.statuses_rows()?,
            Collection::Types => self.types_rows()?,
            Collection::Categories => self.categories_rows()?,
            Collection::Subcategories => self.subcategories_rows()?,
            Collection::CashFlows => self.cash_flow_rows(params)?,
        };

        let count = rows.len();
        let pages = count.div_ceil(page_size).max(1);
        if page > pages {
            return Err(EngineError::NotFound(format!("{collection} page {page}")));
        }

        let items = rows
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        let link = |target: usize| {
            let mut url = Url::parse(BASE_URL)
                .and_then(|base| base.join(collection.path()))
                .map_err(|err| EngineError::Unknown(format!("invalid memory url: {err}")))?;
            {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in params.iter().filter(|(key, _)| key != "page") {
                    pairs.append_pair(key, value);
                }
                if target > 1 {
                    pairs.append_pair("page", &target.to_string());
                }
            }
            Ok::<_, EngineError>(Cursor::new(url.to_string()))
        };

        Ok(Page {
            items,
            next_cursor: if page < pages { Some(link(page + 1)?) } else { None },
            previous_cursor: if page > 1 { Some(link(page - 1)?) } else { None },
            total_count: count as u64,
        })
    }

    fn statuses_rows(&self) -> ResultEngine<Vec<Value>> {
        self.statuses
            .iter()
            .map(|(id, name)| {
                to_value(&Status {
                    id: *id,
                    name: name.clone(),
                })
            })
            .collect()
    }

    fn types_rows(&self) -> ResultEngine<Vec<Value>> {
        self.types
            .iter()
            .map(|(id, name)| {
                to_value(&CashFlowType {
                    id: *id,
                    name: name.clone(),
                })
            })
            .collect()
    }

    fn categories_rows(&self) -> ResultEngine<Vec<Value>> {
        self.categories
            .iter()
            .map(|(id, (name, type_id))| {
                to_value(&Category {
                    id: *id,
                    name: name.clone(),
                    type_id: *type_id,
                    type_name: self.types.get(type_id).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }

    fn subcategories_rows(&self) -> ResultEngine<Vec<Value>> {
        self.subcategories
            .iter()
            .map(|(id, (name, category_id))| {
                to_value(&Subcategory {
                    id: *id,
                    name: name.clone(),
                    category_id: *category_id,
                    category_name: self
                        .categories
                        .get(category_id)
                        .map(|(name, _)| name.clone())
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    fn cash_flow_rows(&self, params: &[(String, String)]) -> ResultEngine<Vec<Value>> {
        let status = id_filter(params, "status", &self.statuses)?;
        let type_id = id_filter(params, "cash_flow_type", &self.types)?;
        let category = id_filter(params, "category", &self.categories)?;
        let subcategory = id_filter(params, "subcategory", &self.subcategories)?;
        let after = date_filter(params, "created_at_after")?;
        let before = date_filter(params, "created_at_before")?;

        let mut rows = self
            .cash_flows
            .iter()
            .filter(|(_, row)| status.is_none_or(|id| row.status_id == id))
            .filter(|(_, row)| type_id.is_none_or(|id| row.type_id == id))
            .filter(|(_, row)| category.is_none_or(|id| row.category_id == id))
            .filter(|(_, row)| subcategory.is_none_or(|id| row.subcategory_id == id))
            .filter(|(_, row)| after.is_none_or(|day| row.created_at.date_naive() >= day))
            .filter(|(_, row)| before.is_none_or(|day| row.created_at.date_naive() <= day))
            .collect::<Vec<_>>();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| b_id.cmp(a_id))
        });

        rows.into_iter()
            .map(|(id, row)| to_value(&self.cash_flow_view(*id, row)))
            .collect()
    }

    fn cash_flow_view(&self, id: Id, row: &FlowRow) -> CashFlow {
        CashFlow {
            id,
            status_id: row.status_id,
            status_name: self.statuses.get(&row.status_id).cloned().unwrap_or_default(),
            type_id: row.type_id,
            type_name: self.types.get(&row.type_id).cloned().unwrap_or_default(),
            category_id: row.category_id,
            category_name: self
                .categories
                .get(&row.category_id)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            subcategory_id: row.subcategory_id,
            subcategory_name: self
                .subcategories
                .get(&row.subcategory_id)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            amount: row.amount,
            comment: row.comment.clone(),
            created_at: row.created_at,
        }
    }

    /// Creates (`id == None`) or patches a row and returns its read view.
    fn write(&mut self, collection: Collection, id: Option<Id>, payload: Value) -> ResultEngine<Value> {
        let target = |id: Id| format!("{collection}/{id}");
        let payload = match id {
            Some(id) => merge(self.writable(collection, id).ok_or_else(|| {
                EngineError::NotFound(target(id))
            })?, payload)?,
            None => payload,
        };

        match collection {
            Collection::Statuses | Collection::Types => {
                let body: NameNew = parse_body(payload)?;
                let table = if collection == Collection::Statuses {
                    &self.statuses
                } else {
                    &self.types
                };
                let name = validate_name(&body.name, table.iter().map(|(k, v)| (*k, v)), id)?;
                let id = id.unwrap_or_else(|| self.next_id());
                let table = if collection == Collection::Statuses {
                    &mut self.statuses
                } else {
                    &mut self.types
                };
                table.insert(id, name.clone());
                to_value(&Status { id, name })
            }
            Collection::Categories => {
                let body: CategoryNew = parse_body(payload)?;
                let name = validate_name(
                    &body.name,
                    self.categories.iter().map(|(k, (v, _))| (*k, v)),
                    id,
                )?;
                let type_name = self
                    .types
                    .get(&body.type_id)
                    .cloned()
                    .ok_or_else(|| invalid_pk("cash_flow_type", body.type_id))?;
                let id = id.unwrap_or_else(|| self.next_id());
                self.categories.insert(id, (name.clone(), body.type_id));
                to_value(&Category {
                    id,
                    name,
                    type_id: body.type_id,
                    type_name,
                })
            }
            Collection::Subcategories => {
                let body: SubcategoryNew = parse_body(payload)?;
                let name = validate_name(
                    &body.name,
                    self.subcategories.iter().map(|(k, (v, _))| (*k, v)),
                    id,
                )?;
                let category_name = self
                    .categories
                    .get(&body.category_id)
                    .map(|(name, _)| name.clone())
                    .ok_or_else(|| invalid_pk("category", body.category_id))?;
                let id = id.unwrap_or_else(|| self.next_id());
                self.subcategories.insert(id, (name.clone(), body.category_id));
                to_value(&Subcategory {
                    id,
                    name,
                    category_id: body.category_id,
                    category_name,
                })
            }
            Collection::CashFlows => {
                let created_at = match id.and_then(|id| self.cash_flows.get(&id)) {
                    Some(existing) => existing.created_at,
                    None => Utc::now().fixed_offset(),
                };
                let row = self.validate_cash_flow(payload, created_at)?;
                let id = id.unwrap_or_else(|| self.next_id());
                let view = self.cash_flow_view(id, &row);
                self.cash_flows.insert(id, row);
                to_value(&view)
            }
        }
    }

    fn validate_cash_flow(
        &self,
        payload: Value,
        created_at: DateTime<FixedOffset>,
    ) -> ResultEngine<FlowRow> {
        let body: CashFlowNew = parse_body(payload)?;
        if !self.statuses.contains_key(&body.status_id) {
            return Err(invalid_pk("status", body.status_id));
        }
        if !self.types.contains_key(&body.type_id) {
            return Err(invalid_pk("cash_flow_type", body.type_id));
        }
        let (_, category_type) = self
            .categories
            .get(&body.category_id)
            .ok_or_else(|| invalid_pk("category", body.category_id))?;
        let (_, subcategory_category) = self
            .subcategories
            .get(&body.subcategory_id)
            .ok_or_else(|| invalid_pk("subcategory", body.subcategory_id))?;

        if *subcategory_category != body.category_id {
            return Err(bad_request(
                "subcategory",
                "Subcategory does not belong to the selected category.",
            ));
        }
        if *category_type != body.type_id {
            return Err(bad_request(
                "category",
                "Category does not belong to the selected cash flow type.",
            ));
        }
        if body.amount <= Decimal::ZERO {
            return Err(bad_request("amount", "Amount must be positive"));
        }

        Ok(FlowRow {
            status_id: body.status_id,
            type_id: body.type_id,
            category_id: body.category_id,
            subcategory_id: body.subcategory_id,
            amount: body.amount,
            comment: body.comment.unwrap_or_default(),
            created_at,
        })
    }

    /// Writable fields of an existing row, in request form.
    fn writable(&self, collection: Collection, id: Id) -> Option<Value> {
        match collection {
            Collection::Statuses => self.statuses.get(&id).map(|name| json!({ "name": name })),
            Collection::Types => self.types.get(&id).map(|name| json!({ "name": name })),
            Collection::Categories => self
                .categories
                .get(&id)
                .map(|(name, type_id)| json!({ "name": name, "cash_flow_type": type_id })),
            Collection::Subcategories => self
                .subcategories
                .get(&id)
                .map(|(name, category_id)| json!({ "name": name, "category": category_id })),
            Collection::CashFlows => self.cash_flows.get(&id).map(|row| {
                json!({
                    "status": row.status_id,
                    "cash_flow_type": row.type_id,
                    "category": row.category_id,
                    "subcategory": row.subcategory_id,
                    "amount": row.amount.to_string(),
                    "comment": row.comment,
                })
            }),
        }
    }

    fn delete(&mut self, collection: Collection, id: Id) -> ResultEngine<()> {
        let target = format!("{collection}/{id}");
        let referenced = match collection {
            Collection::Statuses => self.cash_flows.values().any(|row| row.status_id == id),
            Collection::Types => {
                self.categories.values().any(|(_, type_id)| *type_id == id)
                    || self.cash_flows.values().any(|row| row.type_id == id)
            }
            Collection::Categories => {
                self.subcategories
                    .values()
                    .any(|(_, category_id)| *category_id == id)
                    || self.cash_flows.values().any(|row| row.category_id == id)
            }
            Collection::Subcategories => {
                self.cash_flows.values().any(|row| row.subcategory_id == id)
            }
            Collection::CashFlows => false,
        };

        let exists = match collection {
            Collection::Statuses => self.statuses.contains_key(&id),
            Collection::Types => self.types.contains_key(&id),
            Collection::Categories => self.categories.contains_key(&id),
            Collection::Subcategories => self.subcategories.contains_key(&id),
            Collection::CashFlows => self.cash_flows.contains_key(&id),
        };
        if !exists {
            return Err(EngineError::NotFound(target));
        }
        if referenced {
            return Err(EngineError::Conflict(format!(
                "{target} is still referenced by other entries"
            )));
        }

        match collection {
            Collection::Statuses => self.statuses.remove(&id).map(drop),
            Collection::Types => self.types.remove(&id).map(drop),
            Collection::Categories => self.categories.remove(&id).map(drop),
            Collection::Subcategories => self.subcategories.remove(&id).map(drop),
            Collection::CashFlows => self.cash_flows.remove(&id).map(drop),
        };
        Ok(())
    }
}

fn parse_cursor(collection: Collection, cursor: &Cursor) -> ResultEngine<Vec<(String, String)>> {
    let url = Url::parse(cursor.as_str())
        .map_err(|err| EngineError::Unknown(format!("cursor is not a valid url: {err}")))?;
    if !url.path().ends_with(collection.path()) {
        return Err(EngineError::NotFound(url.path().to_string()));
    }
    Ok(url.query_pairs().into_owned().collect())
}

fn merge(existing: Value, patch: Value) -> ResultEngine<Value> {
    let (Value::Object(mut base), Value::Object(patch)) = (existing, patch) else {
        return Err(bad_request("non_field_errors", "Invalid data. Expected a dictionary."));
    };
    for (key, value) in patch {
        base.insert(key, value);
    }
    Ok(Value::Object(base))
}

fn validate_name<'a>(
    raw: &str,
    mut existing: impl Iterator<Item = (Id, &'a String)>,
    own_id: Option<Id>,
) -> ResultEngine<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(bad_request("name", "This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(bad_request(
            "name",
            "Ensure this field has no more than 100 characters.",
        ));
    }
    if existing.any(|(id, other)| other == name && Some(id) != own_id) {
        return Err(bad_request("name", "An entry with this name already exists."));
    }
    Ok(name.to_string())
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn id_filter<V>(
    params: &[(String, String)],
    field: &str,
    table: &BTreeMap<Id, V>,
) -> ResultEngine<Option<Id>> {
    let Some(raw) = param(params, field) else {
        return Ok(None);
    };
    match Id::from_str(raw) {
        Ok(id) if table.contains_key(&id) => Ok(Some(id)),
        _ => Err(bad_request(
            field,
            "Select a valid choice. That choice is not one of the available choices.",
        )),
    }
}

fn date_filter(params: &[(String, String)], field: &str) -> ResultEngine<Option<NaiveDate>> {
    param(params, field)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| bad_request(field, "Enter a valid date."))
        })
        .transpose()
}

fn parse_body<T: DeserializeOwned>(payload: Value) -> ResultEngine<T> {
    serde_json::from_value(payload).map_err(|err| bad_request("non_field_errors", &err.to_string()))
}

fn to_value(value: &impl Serialize) -> ResultEngine<Value> {
    serde_json::to_value(value)
        .map_err(|err| EngineError::Unknown(format!("cannot encode row: {err}")))
}

fn invalid_pk(field: &str, id: Id) -> EngineError {
    bad_request(
        field,
        &format!("Invalid pk \"{id}\" - object does not exist."),
    )
}

fn bad_request(field: &str, message: &str) -> EngineError {
    let mut body = Map::new();
    body.insert(field.to_string(), json!([message]));
    EngineError::transport(Some(400), Value::Object(body).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::NoFilter;

    fn first(page_size: u32) -> ListQuery {
        ListQuery::first(&NoFilter, page_size)
    }

    #[tokio::test]
    async fn pages_link_to_each_other() {
        let remote = InMemoryRemote::new();
        for name in ["a", "b", "c", "d", "e"] {
            remote.insert_status(name).unwrap();
        }

        let page = remote.list(Collection::Statuses, &first(2)).await.unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.items.len(), 2);
        assert!(page.previous_cursor.is_none());
        let next = page.next_cursor.unwrap();
        assert!(next.as_str().contains("page=2"));

        let second = remote
            .list(Collection::Statuses, &ListQuery::cursor(next))
            .await
            .unwrap();
        assert_eq!(second.items[0]["name"], "c");
        let previous = second.previous_cursor.unwrap();
        assert!(!previous.as_str().contains("page="));
        assert!(previous.as_str().contains("page_size=2"));
    }

    #[tokio::test]
    async fn rename_shows_up_in_denormalized_names() {
        let remote = InMemoryRemote::new();
        let income = remote.insert_type("Income").unwrap();
        remote.insert_category("Salary", income).unwrap();

        remote
            .update(Collection::Types, income, json!({ "name": "Revenue" }))
            .await
            .unwrap();

        let page = remote.list(Collection::Categories, &first(10)).await.unwrap();
        assert_eq!(page.items[0]["cash_flow_type_name"], "Revenue");
    }

    #[tokio::test]
    async fn delete_of_referenced_type_conflicts() {
        let remote = InMemoryRemote::new();
        let income = remote.insert_type("Income").unwrap();
        remote.insert_category("Salary", income).unwrap();

        let err = remote.delete(Collection::Types, income).await.unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let err = remote.delete(Collection::Types, 999).await.unwrap_err();
        assert_eq!(err, EngineError::NotFound("types/999".to_string()));
    }

    #[tokio::test]
    async fn inconsistent_cash_flow_is_rejected() {
        let remote = InMemoryRemote::new();
        let status = remote.insert_status("Business").unwrap();
        let income = remote.insert_type("Income").unwrap();
        let expense = remote.insert_type("Expense").unwrap();
        let salary = remote.insert_category("Salary", income).unwrap();
        let bonus = remote.insert_subcategory("Bonus", salary).unwrap();

        let err = remote
            .create(
                Collection::CashFlows,
                json!({
                    "status": status,
                    "cash_flow_type": expense,
                    "category": salary,
                    "subcategory": bonus,
                    "amount": "10.00",
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Transport { status: Some(400), .. }));
    }

    #[tokio::test]
    async fn unknown_filter_id_is_a_bad_request() {
        let remote = InMemoryRemote::with_sample_data().unwrap();
        let query = ListQuery::First {
            params: vec![("status", "999".to_string())],
            page_size: 10,
        };
        let err = remote.list(Collection::CashFlows, &query).await.unwrap_err();
        assert!(matches!(err, EngineError::Transport { status: Some(400), .. }));
    }
}

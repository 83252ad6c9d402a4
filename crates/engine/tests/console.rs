use std::str::FromStr;

use api_types::{Id, cash_flow::CashFlowNew, dictionary::DictionaryEntry};
use chrono::{DateTime, Duration, FixedOffset};
use rust_decimal::Decimal;

use engine::{
    Api, CashFlowDraft, Collection, Console, DictionaryCache, DictionaryDraft, DictionaryKind,
    EngineError, FilterState, InMemoryRemote, ListQuery, Pager, View,
};

struct Ledger {
    remote: InMemoryRemote,
    income: Id,
    expense: Id,
    business: Id,
    salary: Id,
    marketing: Id,
    bonus: Id,
    avito: Id,
}

fn start_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2025-03-01T10:00:00+03:00").unwrap()
}

/// Income = 1, Expense = 2, Business = 3, Salary = 4 (Income),
/// Marketing = 5 (Expense), Bonus = 6 (Salary), Avito = 7 (Marketing).
fn ledger(income_rows: i64, expense_rows: i64) -> Ledger {
    let remote = InMemoryRemote::new();
    let income = remote.insert_type("Income").unwrap();
    let expense = remote.insert_type("Expense").unwrap();
    let business = remote.insert_status("Business").unwrap();
    let salary = remote.insert_category("Salary", income).unwrap();
    let marketing = remote.insert_category("Marketing", expense).unwrap();
    let bonus = remote.insert_subcategory("Bonus", salary).unwrap();
    let avito = remote.insert_subcategory("Avito", marketing).unwrap();

    let ledger = Ledger {
        remote,
        income,
        expense,
        business,
        salary,
        marketing,
        bonus,
        avito,
    };
    for n in 0..income_rows {
        ledger.flow(income, salary, bonus, n);
    }
    for n in 0..expense_rows {
        ledger.flow(expense, marketing, avito, income_rows + n);
    }
    ledger
}

impl Ledger {
    fn flow(&self, type_id: Id, category_id: Id, subcategory_id: Id, n: i64) -> Id {
        self.remote
            .insert_cash_flow(
                CashFlowNew {
                    status_id: self.business,
                    type_id,
                    category_id,
                    subcategory_id,
                    amount: Decimal::new(10_000 + n, 2),
                    comment: None,
                },
                start_time() + Duration::hours(n),
            )
            .unwrap()
    }

    async fn console(&self) -> Console {
        let mut console = Console::new(Api::new(self.remote.clone()), 10, 10).unwrap();
        let errors = console.start().await;
        assert!(errors.is_empty(), "{errors:?}");
        console
    }
}

fn ids<T: engine::HasId>(items: &[T]) -> Vec<Id> {
    items.iter().map(|item| item.id()).collect()
}

#[tokio::test]
async fn selecting_type_then_category_walks_pages_by_cursor() {
    let ledger = ledger(20, 5);
    let mut console = ledger.console().await;
    assert_eq!(console.filter(), &FilterState::new(10));
    assert_eq!(console.records().page().total_count, 25);

    console.set_type(Some(ledger.income)).await.unwrap();
    console.set_category(Some(ledger.salary)).await.unwrap();

    let records = console.records();
    assert_eq!(records.items().len(), 10);
    assert_eq!(records.page().total_count, 20);
    assert!(records.items().iter().all(|row| row.category_id == ledger.salary));
    let cursor = records.page().next_cursor.clone().unwrap();

    ledger.remote.clear_list_requests();
    console.next_page().await.unwrap();
    assert_eq!(
        ledger.remote.list_requests(),
        vec![(Collection::CashFlows, ListQuery::cursor(cursor.clone()))]
    );
    assert_eq!(console.records().page_number(), 2);
    assert_eq!(console.records().items().len(), 10);

    let victim = console.records().items()[3].id;
    ledger.remote.clear_list_requests();
    let applied = console.delete(Collection::CashFlows, victim).await.unwrap();
    assert!(applied.refresh_errors.is_empty());

    // the page is refetched through the cursor that produced it
    assert_eq!(
        ledger.remote.list_requests(),
        vec![(Collection::CashFlows, ListQuery::cursor(cursor))]
    );
    assert_eq!(console.records().items().len(), 9);
    assert!(console.records().find(victim).is_none());
    assert_eq!(console.records().page_number(), 2);
}

#[tokio::test]
async fn next_then_previous_returns_to_first_page() {
    let ledger = ledger(12, 13);
    for page_size in [1, 5, 10, 25] {
        let api = Api::new(ledger.remote.clone());
        let mut pager: Pager<api_types::cash_flow::CashFlow, FilterState> = Pager::new(
            api,
            Collection::CashFlows,
            FilterState::new(page_size),
            page_size,
        );
        let mut filter = FilterState::new(page_size);
        filter.type_id = Some(ledger.expense);

        pager.load(filter, page_size).await.unwrap();
        let first = ids(pager.items());

        pager.next().await.unwrap();
        pager.previous().await.unwrap();
        assert_eq!(ids(pager.items()), first, "page size {page_size}");
        assert_eq!(pager.page_number(), 1);
    }
}

#[tokio::test]
async fn stale_completion_never_replaces_newer_page() {
    let ledger = ledger(3, 4);
    let api = Api::new(ledger.remote.clone());
    let mut pager: Pager<api_types::cash_flow::CashFlow, FilterState> =
        Pager::new(api.clone(), Collection::CashFlows, FilterState::new(10), 10);

    let mut x = FilterState::new(10);
    x.type_id = Some(ledger.income);
    let mut y = FilterState::new(10);
    y.type_id = Some(ledger.expense);

    let a = pager.begin_load(x, 10);
    let b = pager.begin_load(y.clone(), 10);
    let (result_a, result_b) = tokio::join!(
        a.fetch::<api_types::cash_flow::CashFlow>(&api),
        b.fetch::<api_types::cash_flow::CashFlow>(&api)
    );

    assert_eq!(pager.complete(b, result_b), Ok(true));
    assert_eq!(pager.complete(a, result_a), Ok(false));
    assert_eq!(pager.filter(), &y);
    assert_eq!(pager.items().len(), 4);
    assert!(pager.items().iter().all(|row| row.type_id == ledger.expense));
}

#[tokio::test]
async fn renamed_type_shows_on_displayed_records() {
    let ledger = ledger(4, 2);
    let mut console = ledger.console().await;
    assert!(
        console
            .records()
            .items()
            .iter()
            .any(|row| row.type_name == "Income")
    );

    let mut draft = DictionaryDraft::new(DictionaryKind::Type);
    draft.id = Some(ledger.income);
    draft.name = "Revenue".into();
    let applied = console.save_dictionary(&draft).await.unwrap();
    assert_eq!(applied.id, Some(ledger.income));

    for row in console.records().items() {
        if row.type_id == ledger.income {
            assert_eq!(row.type_name, "Revenue");
        } else {
            assert_eq!(row.type_name, "Expense");
        }
    }
    let types = console.cache().types();
    assert!(types.iter().any(|ty| ty.name == "Revenue"));
}

#[tokio::test]
async fn reset_twice_equals_reset_once() {
    let ledger = ledger(3, 3);
    let mut console = ledger.console().await;
    console.set_page_size(25).await.unwrap();
    console.set_type(Some(ledger.expense)).await.unwrap();
    console.set_status(Some(ledger.business)).await.unwrap();

    console.reset_filters().await.unwrap();
    let once = console.filter().clone();
    console.reset_filters().await.unwrap();
    assert_eq!(console.filter(), &once);
    assert_eq!(once, FilterState::new(25));
    assert_eq!(console.records().items().len(), 6);
}

#[tokio::test]
async fn rejected_selection_keeps_state_and_page() {
    let ledger = ledger(3, 3);
    let mut console = ledger.console().await;
    console.set_type(Some(ledger.income)).await.unwrap();
    let shown = ids(console.records().items());

    let err = console.set_category(Some(ledger.marketing)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidReference(_)));
    let err = console.set_subcategory(Some(ledger.bonus)).await.unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));

    assert_eq!(console.filter().category_id, None);
    assert_eq!(ids(console.records().items()), shown);
}

#[tokio::test]
async fn referenced_delete_conflicts_and_missing_delete_is_not_found() {
    let ledger = ledger(3, 0);
    let mut console = ledger.console().await;
    let shown = ids(console.records().items());

    let err = console
        .delete(Collection::Types, ledger.income)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let err = console.delete(Collection::CashFlows, 999).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound("cash_flows/999".into()));

    assert_eq!(ids(console.records().items()), shown);
    assert_eq!(console.cache().types().len(), 2);
}

#[tokio::test]
async fn deleting_selected_subcategory_clears_it_from_the_filter() {
    let ledger = ledger(3, 0);
    let spare = ledger.remote.insert_subcategory("Spare", ledger.marketing).unwrap();
    let mut console = ledger.console().await;
    console.set_type(Some(ledger.expense)).await.unwrap();
    console.set_category(Some(ledger.marketing)).await.unwrap();
    console.set_subcategory(Some(spare)).await.unwrap();
    assert!(console.records().items().is_empty());

    console.show(View::Dictionary(DictionaryKind::Subcategory)).await.unwrap();
    console.delete(Collection::Subcategories, spare).await.unwrap();

    assert_eq!(console.filter().subcategory_id, None);
    assert_eq!(console.filter().category_id, Some(ledger.marketing));
    assert!(
        console
            .browser()
            .items()
            .iter()
            .all(|entry: &DictionaryEntry| entry.id != spare)
    );
}

#[tokio::test]
async fn deleting_selected_subcategory_never_queries_it_again() {
    let ledger = ledger(3, 1);
    let spare = ledger.remote.insert_subcategory("Spare", ledger.marketing).unwrap();
    let mut console = ledger.console().await;
    console.set_type(Some(ledger.expense)).await.unwrap();
    console.set_category(Some(ledger.marketing)).await.unwrap();
    console.set_subcategory(Some(spare)).await.unwrap();
    assert_eq!(console.view(), View::Records);
    ledger.remote.clear_list_requests();

    let applied = console.delete(Collection::Subcategories, spare).await.unwrap();

    assert!(applied.refresh_errors.is_empty(), "{:?}", applied.refresh_errors);
    assert_eq!(console.filter().subcategory_id, None);
    assert_eq!(console.records().items().len(), 1);
    assert_eq!(console.records().page_number(), 1);
    assert!(console.records().last_error().is_none());

    let dangling = format!("subcategory={spare}");
    for (collection, query) in ledger.remote.list_requests() {
        if collection != Collection::CashFlows {
            continue;
        }
        assert!(
            !query
                .pairs()
                .iter()
                .any(|(key, value)| *key == "subcategory" && *value == spare.to_string()),
            "{query:?}"
        );
        assert!(
            query
                .as_cursor()
                .is_none_or(|cursor| !cursor.as_str().contains(&dangling)),
            "{query:?}"
        );
    }
}

#[tokio::test]
async fn deleting_last_row_of_last_page_steps_back() {
    let ledger = ledger(11, 0);
    let mut console = ledger.console().await;
    console.next_page().await.unwrap();
    assert_eq!(console.records().items().len(), 1);

    let last = console.records().items()[0].id;
    let applied = console.delete(Collection::CashFlows, last).await.unwrap();
    assert!(applied.refresh_errors.is_empty());
    assert_eq!(console.records().page_number(), 1);
    assert_eq!(console.records().items().len(), 10);
    assert!(!console.records().has_next());
}

#[tokio::test]
async fn failed_dictionary_fetch_keeps_previous_rows() {
    let ledger = ledger(0, 0);
    let mut cache = DictionaryCache::new(Api::new(ledger.remote.clone()));
    assert!(cache.load_all().await.is_empty());
    assert_eq!(cache.categories().len(), 2);

    ledger.remote.insert_type("Transfer").unwrap();
    ledger.remote.insert_category("Payroll", ledger.income).unwrap();
    ledger.remote.fail(
        Collection::Categories,
        EngineError::Transport {
            status: Some(503),
            body: "maintenance".into(),
        },
    );

    let failed = cache.load_all().await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, DictionaryKind::Category);
    assert_eq!(cache.categories().len(), 2);
    assert_eq!(cache.types().len(), 3);

    ledger.remote.recover(Collection::Categories);
    cache.invalidate(DictionaryKind::Category).await.unwrap();
    assert_eq!(cache.categories_of(ledger.income).len(), 2);
}

#[tokio::test]
async fn failed_page_load_keeps_displayed_rows() {
    let ledger = ledger(15, 0);
    let mut console = ledger.console().await;
    let shown = ids(console.records().items());

    ledger.remote.fail(
        Collection::CashFlows,
        EngineError::Transport {
            status: None,
            body: "connection refused".into(),
        },
    );
    assert!(console.next_page().await.is_err());
    assert_eq!(ids(console.records().items()), shown);
    assert!(console.records().last_error().is_some());

    ledger.remote.recover(Collection::CashFlows);
    console.next_page().await.unwrap();
    assert_eq!(console.records().items().len(), 5);
    assert!(console.records().last_error().is_none());
}

#[tokio::test]
async fn cash_flow_form_creates_record_and_refreshes_page() {
    let ledger = ledger(2, 0);
    let mut console = ledger.console().await;
    let dict = console.dictionaries();

    let mut draft = CashFlowDraft::new();
    draft.set_status(Some(ledger.business), &dict).unwrap();
    draft.set_type(Some(ledger.expense), &dict).unwrap();
    draft.set_category(Some(ledger.marketing), &dict).unwrap();
    draft.set_subcategory(Some(ledger.avito), &dict).unwrap();
    draft.amount = "250.00".into();
    draft.comment = "banner".into();

    let applied = console.save_cash_flow(&draft).await.unwrap();
    let id = applied.id.unwrap();
    let row = console.records().find(id).unwrap();
    assert_eq!(row.amount, Decimal::from_str("250.00").unwrap());
    assert_eq!(row.subcategory_name, "Avito");
    assert_eq!(row.comment, "banner");
    assert_eq!(console.records().page().total_count, 3);

    draft.amount = "0".into();
    let err = console.save_cash_flow(&draft).await.unwrap_err();
    assert!(err.is_local());
}

#[tokio::test]
async fn dictionary_views_keep_their_own_page_size() {
    let ledger = ledger(0, 0);
    let mut console = ledger.console().await;

    console
        .show(View::Dictionary(DictionaryKind::Category))
        .await
        .unwrap();
    console.set_dictionary_page_size(1).await.unwrap();
    assert_eq!(console.browser().items().len(), 1);
    assert_eq!(console.browser().items()[0].parent_name.as_deref(), Some("Income"));

    console
        .show(View::Dictionary(DictionaryKind::Type))
        .await
        .unwrap();
    assert_eq!(console.browser().page_size(), 10);
    assert_eq!(console.browser().items().len(), 2);

    console
        .show(View::Dictionary(DictionaryKind::Category))
        .await
        .unwrap();
    assert_eq!(console.browser().page_size(), 1);

    console.show(View::Records).await.unwrap();
    assert!(console.set_dictionary_page_size(5).await.is_err());
}

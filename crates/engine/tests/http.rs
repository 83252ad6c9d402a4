use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use api_types::{cash_flow::CashFlow, cash_flow_type::CashFlowType, dictionary::NameNew, status::Status};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use serde_json::{Value, json};

use engine::{
    Api, Collection, DateRange, EngineError, FilterState, HttpRemote, ListQuery, NoFilter,
};

#[derive(Clone)]
struct Server {
    addr: SocketAddr,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Server {
    fn record(&self, method: Method, uri: &Uri) {
        self.seen.lock().unwrap().push(format!("{method} {uri}"));
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

async fn list_types(
    State(server): State<Server>,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    server.record(Method::GET, &uri);
    let base = format!("http://{}/api/cash_flow_types/", server.addr);
    match params.get("page").map(String::as_str) {
        Some("2") => Json(json!({
            "count": 2,
            "next": null,
            "previous": format!("{base}?page_size=1"),
            "results": [{ "id": 2, "name": "Expense" }],
        })),
        _ => Json(json!({
            "count": 2,
            "next": format!("{base}?page=2&page_size=1"),
            "previous": null,
            "results": [{ "id": 1, "name": "Income" }],
        })),
    }
}

async fn list_cash_flows(State(server): State<Server>, uri: Uri) -> Json<Value> {
    server.record(Method::GET, &uri);
    Json(json!({
        "count": 1,
        "next": null,
        "previous": null,
        "results": [{
            "id": 7,
            "status": 3,
            "status_name": "Business",
            "cash_flow_type": 1,
            "cash_flow_type_name": "Income",
            "category": 4,
            "category_name": "Salary",
            "subcategory": 6,
            "subcategory_name": "Bonus",
            "amount": "1250.50",
            "comment": "",
            "created_at": "2025-03-01T10:15:00+03:00",
        }],
    }))
}

async fn create_status(
    State(server): State<Server>,
    uri: Uri,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    server.record(Method::POST, &uri);
    (
        StatusCode::CREATED,
        Json(json!({ "id": 10, "name": body["name"] })),
    )
}

async fn delete_status(
    State(server): State<Server>,
    uri: Uri,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    server.record(Method::DELETE, &uri);
    match id {
        404 => (StatusCode::NOT_FOUND, "{\"detail\":\"Not found.\"}").into_response(),
        409 => (StatusCode::CONFLICT, "status is used by cash flows").into_response(),
        500 => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn patch_category(State(server): State<Server>, uri: Uri) -> impl IntoResponse {
    server.record(Method::PATCH, &uri);
    (
        StatusCode::BAD_REQUEST,
        "{\"name\":[\"This field may not be blank.\"]}",
    )
}

async fn serve() -> (Server, Api) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server = Server {
        addr: listener.local_addr().unwrap(),
        seen: Arc::default(),
    };

    let router = Router::new()
        .route("/api/cash_flow_types/", get(list_types))
        .route("/api/cash_flows/", get(list_cash_flows))
        .route("/api/statuses/", post(create_status))
        .route("/api/statuses/{id}/", delete(delete_status))
        .route(
            "/api/categories/{id}/",
            axum::routing::patch(patch_category),
        )
        .with_state(server.clone());
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

    let remote = HttpRemote::new(
        &format!("http://{}/api", server.addr),
        Duration::from_secs(5),
    )
    .unwrap();
    (server, Api::new(remote))
}

#[tokio::test]
async fn cursor_is_followed_verbatim() {
    let (server, api) = serve().await;

    let first = api
        .list::<CashFlowType>(Collection::Types, &ListQuery::first(&NoFilter, 1))
        .await
        .unwrap();
    assert_eq!(first.total_count, 2);
    assert_eq!(first.items[0].name, "Income");

    let next = first.next_cursor.unwrap();
    let second = api
        .list::<CashFlowType>(Collection::Types, &ListQuery::cursor(next))
        .await
        .unwrap();
    assert_eq!(second.items[0].name, "Expense");
    assert!(second.next_cursor.is_none());

    assert_eq!(
        server.seen(),
        vec![
            "GET /api/cash_flow_types/?page_size=1".to_string(),
            "GET /api/cash_flow_types/?page=2&page_size=1".to_string(),
        ]
    );
}

#[tokio::test]
async fn list_all_exhausts_pages() {
    let (_server, api) = serve().await;
    let types: Vec<CashFlowType> = api.list_all(Collection::Types, 1).await.unwrap();
    let names: Vec<_> = types.iter().map(|ty| ty.name.as_str()).collect();
    assert_eq!(names, vec!["Income", "Expense"]);
}

#[tokio::test]
async fn record_filter_sends_only_set_fields() {
    let (server, api) = serve().await;
    let mut filter = FilterState::new(10);
    filter.type_id = Some(1);
    filter.created = DateRange::new(NaiveDate::from_ymd_opt(2025, 1, 1), None).unwrap();

    let page = api
        .list::<CashFlow>(Collection::CashFlows, &ListQuery::first(&filter, 10))
        .await
        .unwrap();
    assert_eq!(page.items[0].category_name, "Salary");
    assert_eq!(
        server.seen(),
        vec!["GET /api/cash_flows/?cash_flow_type=1&created_at_after=2025-01-01&page_size=10"]
    );
}

#[tokio::test]
async fn writes_use_collection_and_item_urls() {
    let (server, api) = serve().await;

    let created: Status = api
        .create(
            Collection::Statuses,
            &NameNew {
                name: "Tax".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, 10);
    api.delete(Collection::Statuses, 10).await.unwrap();

    assert_eq!(
        server.seen(),
        vec!["POST /api/statuses/", "DELETE /api/statuses/10/"]
    );
}

#[tokio::test]
async fn error_statuses_map_to_error_kinds() {
    let (_server, api) = serve().await;

    assert_eq!(
        api.delete(Collection::Statuses, 404).await,
        Err(EngineError::NotFound("statuses/404".into()))
    );
    assert_eq!(
        api.delete(Collection::Statuses, 409).await,
        Err(EngineError::Conflict("status is used by cash flows".into()))
    );
    assert!(matches!(
        api.delete(Collection::Statuses, 500).await,
        Err(EngineError::Transport {
            status: Some(500),
            ..
        })
    ));

    let err = api
        .update::<Value>(Collection::Categories, 4, &json!({ "name": "" }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Transport {
            status: Some(400),
            body: "{\"name\":[\"This field may not be blank.\"]}".into()
        }
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = HttpRemote::new(&format!("http://{addr}/api/"), Duration::from_secs(2)).unwrap();
    let err = Api::new(remote)
        .list::<Status>(Collection::Statuses, &ListQuery::first(&NoFilter, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Transport { status: None, .. }));
}

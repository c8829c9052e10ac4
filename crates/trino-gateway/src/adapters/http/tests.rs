use std::path::Path;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use url::{form_urlencoded, Url};

use super::{
    create_router,
    state::{AppState, Settings},
};
use crate::core::{
    connection::ConnectionManager, cursor::CursorEncoder, limits::Page, query::paginate,
    testing::fixture,
};

const SETTINGS: Settings = Settings {
    page_size: 1024,
    max_rows: 100,
    timeout_ms: 30_000,
};

struct TestApp {
    router: Router,
    _dir: TempDir,
}

fn app_with(settings: Settings) -> TestApp {
    let (dir, path) = fixture();
    TestApp {
        router: router_for(&path, settings),
        _dir: dir,
    }
}

fn app() -> TestApp {
    app_with(SETTINGS)
}

fn router_for(path: &Path, settings: Settings) -> Router {
    create_router(AppState {
        connections: ConnectionManager::open(path).unwrap(),
        cursors: CursorEncoder::new("https", "gateway.test:8443").unwrap(),
        settings,
    })
}

fn statement_uri(query: &str, limit: &str, offset: &str) -> String {
    let qs = form_urlencoded::Serializer::new(String::new())
        .append_pair("query", query)
        .append_pair("limit", limit)
        .append_pair("offset", offset)
        .finish();
    format!("/v1/statement?{qs}")
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.router.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &TestApp, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut req = Request::builder().method(Method::POST).uri("/v1/statement");
    if let Some(ct) = content_type {
        req = req.header(CONTENT_TYPE, ct);
    }
    send(app, req.body(Body::from(body.to_string())).unwrap()).await
}

/// The path and query of an absolute `nextUri`, for replaying it in-process.
fn local_part(next_uri: &str) -> String {
    let url = Url::parse(next_uri).unwrap();
    format!("{}?{}", url.path(), url.query().unwrap())
}

#[tokio::test]
async fn pages_until_a_short_page() {
    let app = app();
    let query = "SELECT id FROM t ORDER BY id";

    let (status, first) = get(&app, &statement_uri(query, "2", "0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["columns"], json!([{"name": "id", "type": "INTEGER"}]));
    assert_eq!(first["data"], json!([[1], [2]]));

    let next = first["nextUri"].as_str().unwrap();
    assert!(next.starts_with("https://gateway.test:8443/v1/statement?"), "{next}");
    let pairs: Vec<(String, String)> = Url::parse(next)
        .unwrap()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("limit".into(), "2".into())));
    assert!(pairs.contains(&("offset".into(), "2".into())));
    assert!(pairs.contains(&("query".into(), query.into())));

    let (_, second) = get(&app, &local_part(next)).await;
    assert_eq!(second["data"], json!([[3], [4]]));
    assert!(second["nextUri"].is_string());

    let (status, last) = get(&app, &local_part(second["nextUri"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["data"], json!([[5]]));
    assert!(last.get("nextUri").is_none());
}

#[tokio::test]
async fn nulls_and_kinds_in_cells() {
    let app = app();
    let sql = "SELECT name, score, active FROM t WHERE id IN (2, 3) ORDER BY id";
    let (status, body) = get(&app, &statement_uri(sql, "10", "0")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["columns"],
        json!([
            {"name": "name", "type": "VARCHAR"},
            {"name": "score", "type": "DOUBLE"},
            {"name": "active", "type": "BOOLEAN"},
        ])
    );
    assert_eq!(body["data"], json!([["beta", null, false], [null, 3.25, null]]));
}

#[tokio::test]
async fn post_raw_show_catalogs() {
    let app = app();
    let (status, body) = post(&app, None, "SHOW CATALOGS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"][0]["name"], "Catalog");
    let rows = body["data"].as_array().unwrap();
    assert!(rows.contains(&json!(["acme"])), "{rows:?}");
    assert!(body.get("nextUri").is_none());
}

#[tokio::test]
async fn post_form_show_tables() {
    let app = app();
    let (status, body) = post(
        &app,
        Some("application/x-www-form-urlencoded"),
        "query=show+tables+from+acme.sales",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"][0]["name"], "Table");
    assert_eq!(body["data"], json!([["customers"], ["orders"]]));
}

#[tokio::test]
async fn show_schemas_lists_the_catalog() {
    let app = app();
    let (status, body) = get(&app, &statement_uri("SHOW SCHEMAS FROM acme", "10", "0")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert!(rows.contains(&json!(["main"])), "{rows:?}");
    assert!(rows.contains(&json!(["sales"])), "{rows:?}");
}

#[tokio::test]
async fn empty_post_is_a_client_error() {
    let app = app();
    let (status, body) = post(&app, None, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["errorCode"], 400);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn bad_limit_is_a_client_error() {
    let app = app();
    let (status, body) = get(&app, &statement_uri("SELECT 1", "abc", "0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["errorCode"], 400);
    assert!(body["error"]["message"].as_str().unwrap().contains("limit"));

    let (status, _) = get(&app, "/v1/statement?query=SELECT%201&limit=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/v1/statement?limit=2&offset=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn engine_error_text_is_passed_through() {
    let app = app();
    let (status, body) = post(&app, None, "SELEC 1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let expected = {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let sql = paginate("SELEC 1", Page { limit: 1024, offset: 0 });
        match conn.prepare(&sql) {
            Ok(_) => panic!("statement should not parse"),
            Err(e) => e.to_string(),
        }
    };
    assert_eq!(body["error"]["message"], expected);
}

#[tokio::test]
async fn missing_table_is_a_client_error() {
    let app = app();
    let (status, body) = get(&app, &statement_uri("SELECT * FROM nope", "10", "0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("nope"), "{message}");
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_query_times_out() {
    let app = app_with(Settings {
        timeout_ms: 200,
        ..SETTINGS
    });
    let (status, body) = post(&app, None, "SELECT count(*) FROM range(1000000000000)").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["errorCode"], 504);

    let (status, _) = post(&app, None, "SELECT 1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn limit_is_capped() {
    let app = app_with(Settings {
        max_rows: 2,
        ..SETTINGS
    });
    let (_, body) = get(&app, &statement_uri("SELECT id FROM t ORDER BY id", "50", "0")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let next = body["nextUri"].as_str().unwrap();
    assert!(next.contains("limit=2"), "{next}");
}

#[tokio::test]
async fn health() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

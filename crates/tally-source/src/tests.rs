//! Client tests against a local axum server standing in for the dashboard.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use axum::{
  Json, Router,
  extract::{Query, State},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
  routing::{get, post},
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tally_core::{
  poll::{PollConfig, Poller, TrackOutcome},
  source::{DataSource, FetchError},
};
use tally_store_sqlite::SqliteStore;

use crate::{Error, PublisherClient, PublisherConfig};

async fn serve(app: Router) -> String {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  format!("http://{addr}")
}

fn client(base_url: String) -> PublisherClient {
  PublisherClient::new(PublisherConfig {
    base_url,
    csrf_token: "tok".into(),
    session_cookie: "_csrf=tok; session=abc".into(),
    ..PublisherConfig::default()
  })
  .unwrap()
}

fn authorised(headers: &HeaderMap) -> bool {
  headers.get("x-csrf-token").is_some_and(|v| v == "tok")
    && headers
      .get("cookie")
      .is_some_and(|v| v == "_csrf=tok; session=abc")
}

fn dashboard() -> Router {
  Router::new()
    .route(
      "/publisher-v2-api/monthly-sales",
      get(
        |headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
          if !authorised(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
          }
          Json(json!([{
            "package_id": 42,
            "name": q.get("date").cloned().unwrap_or_default(),
            "price": "15.00",
            "sales": "3",
            "gross": "45.00",
            "revenue": "31.50",
            "last": "2025-05-03 14:07:09"
          }]))
          .into_response()
        },
      ),
    )
    .route(
      "/publisher-v2-api/review/list",
      post(|headers: HeaderMap, Json(body): Json<Value>| async move {
        if !authorised(&headers) {
          return StatusCode::FORBIDDEN.into_response();
        }
        Json(json!({ "results": [{
          "id": 1,
          "packageName": format!("page {} of {}", body["page"], body["perPage"]),
          "rating": 5,
          "subject": "Great",
          "body": "Love it",
          "createdTime": "2025-05-02T10:00:00Z"
        }]}))
        .into_response()
      }),
    )
    .route(
      "/publisher-v2-api/dashboard/daily",
      post(|Json(body): Json<Value>| async move {
        let start = body["start_date"].as_str().unwrap_or_default().to_owned();
        Json(json!({ start: { "gross": 12.5, "sales": 1 } }))
      }),
    )
}

#[tokio::test]
async fn fetch_sales_sends_period_and_credentials() {
  let c = client(serve(dashboard()).await);
  let period = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

  let rows = c.fetch_sales(period).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].name, "2025-05-01");
  assert_eq!(rows[0].item_id, "42");
  assert_eq!(rows[0].units_sold, 3);
  assert_eq!(rows[0].revenue_cents, 3150);
}

#[tokio::test]
async fn fetch_reviews_posts_page() {
  let c = client(serve(dashboard()).await);
  let rows = c.fetch_reviews(1, 100).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].item_name, "page 1 of 100");
  assert_eq!(rows[0].rating, 5);
}

#[tokio::test]
async fn fetch_daily_posts_range() {
  let c = client(serve(dashboard()).await);
  let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
  let end = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

  let daily = c.fetch_daily(start, end).await.unwrap();
  assert_eq!(daily[&start].gross_cents, 1250);
  assert_eq!(daily[&start].sales, 1);
}

#[tokio::test]
async fn rejected_credentials_are_auth_failures() {
  let base = serve(dashboard()).await;
  let c = PublisherClient::new(PublisherConfig {
    base_url: base,
    csrf_token: "stale".into(),
    ..PublisherConfig::default()
  })
  .unwrap();

  let period = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
  assert_eq!(c.fetch_sales(period).await, Err(FetchError::Auth));
  assert_eq!(c.fetch_reviews(1, 100).await, Err(FetchError::Auth));
}

#[tokio::test]
async fn missing_token_fails_without_a_request() {
  let c = PublisherClient::new(PublisherConfig {
    base_url: "http://127.0.0.1:9".into(),
    ..PublisherConfig::default()
  })
  .unwrap();
  assert_eq!(c.fetch_reviews(1, 100).await, Err(FetchError::Auth));
}

#[tokio::test]
async fn server_errors_are_network_failures() {
  let app = Router::new().route(
    "/publisher-v2-api/review/list",
    post(|| async { StatusCode::BAD_GATEWAY }),
  );
  let c = client(serve(app).await);
  assert!(matches!(
    c.fetch_reviews(1, 100).await,
    Err(FetchError::Network(msg)) if msg.contains("502")
  ));
}

#[tokio::test]
async fn unreachable_host_is_a_network_failure() {
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let c = client(format!("http://{addr}"));
  assert!(matches!(c.fetch_reviews(1, 100).await, Err(FetchError::Network(_))));
}

#[tokio::test]
async fn unexpected_body_is_malformed() {
  let app = Router::new().route(
    "/publisher-v2-api/monthly-sales",
    get(|| async { "<html>login</html>" }),
  );
  let c = client(serve(app).await);
  let period = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
  assert!(matches!(c.fetch_sales(period).await, Err(FetchError::Malformed(_))));
}

#[test]
fn base_url_must_be_http() {
  let err = PublisherClient::new(PublisherConfig {
    base_url: "publisher.example".into(),
    ..PublisherConfig::default()
  });
  assert!(matches!(err, Err(Error::BaseUrl(_))));
}

// ─── Poll cycle ──────────────────────────────────────────────────────────────

/// A dashboard whose sales report can be swapped between polls.
fn scripted(sales: Arc<Mutex<String>>) -> Router {
  Router::new()
    .route(
      "/publisher-v2-api/monthly-sales",
      get(|State(body): State<Arc<Mutex<String>>>| async move {
        body.lock().unwrap().clone()
      }),
    )
    .route(
      "/publisher-v2-api/review/list",
      post(|| async { Json(json!({ "results": [] })) }),
    )
    .with_state(sales)
}

#[tokio::test]
async fn incomplete_row_leaves_baseline_for_next_poll() {
  let report = Arc::new(Mutex::new(
    json!([
      {"package_id": "A", "price": "15.00", "sales": "40", "last": "2025-05-01 10:00:00"},
      {"package_id": "B", "price": "5.00", "sales": "1", "last": "2025-05-01 09:00:00"}
    ])
    .to_string(),
  ));
  let c = client(serve(scripted(report.clone())).await);
  let store = SqliteStore::open_in_memory().await.unwrap();
  let p = Poller::new(store.clone(), c, store, PollConfig::default());
  p.on_install().await.unwrap();

  // A transient glitch: A arrives without its price.
  *report.lock().unwrap() = json!([
    {"package_id": "A", "sales": "40", "last": "2025-05-01 10:00:00"},
    {"package_id": "B", "price": "5.00", "sales": "1", "last": "2025-05-01 09:00:00"}
  ])
  .to_string();
  let glitch = p.on_poll_tick().await;
  assert!(matches!(glitch.sales, TrackOutcome::Malformed(_)));

  // Recovery with one genuine sale of B.
  *report.lock().unwrap() = json!([
    {"package_id": "A", "price": "15.00", "sales": "40", "last": "2025-05-01 10:00:00"},
    {"package_id": "B", "price": "5.00", "sales": "2", "last": "2025-05-01 11:00:00"}
  ])
  .to_string();
  let recovered = p.on_poll_tick().await;
  assert_eq!(recovered.sales, TrackOutcome::Notified(1));
  assert_eq!(p.unread().await.unwrap().sales, 1);

  let raised = p.notifications().await.unwrap();
  assert_eq!(raised.len(), 1);
  assert_eq!(raised[0].title, "New sale!");
}

//! Async HTTP client for the publisher dashboard API.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tally_core::{
  record::{DailySales, ReviewRecord, SaleRecord},
  source::{DataSource, FetchError},
};
use tracing::debug;

use crate::{Error, Result, wire};

/// Connection settings for the publisher dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
  #[serde(default = "default_base_url")]
  pub base_url:       String,
  /// Value of the dashboard's `_csrf` cookie, sent as `X-CSRF-Token`.
  #[serde(default)]
  pub csrf_token:     String,
  /// Raw `Cookie` header of a logged-in dashboard session.
  #[serde(default)]
  pub session_cookie: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:   u64,
}

fn default_base_url() -> String { "https://publisher.unity.com".into() }

fn default_timeout_secs() -> u64 { 30 }

impl Default for PublisherConfig {
  fn default() -> Self {
    Self {
      base_url:       default_base_url(),
      csrf_token:     String::new(),
      session_cookie: String::new(),
      timeout_secs:   default_timeout_secs(),
    }
  }
}

/// Async HTTP client for the publisher dashboard.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct PublisherClient {
  client: Client,
  config: PublisherConfig,
}

impl PublisherClient {
  pub fn new(config: PublisherConfig) -> Result<Self> {
    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://")
    {
      return Err(Error::BaseUrl(config.base_url));
    }
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/publisher-v2-api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// Attach session credentials. Without a CSRF token the dashboard rejects
  /// every call, so that is reported as an auth failure up front.
  fn auth(&self, req: RequestBuilder) -> Result<RequestBuilder, FetchError> {
    if self.config.csrf_token.is_empty() {
      return Err(FetchError::Auth);
    }
    let req = req.header("X-CSRF-Token", &self.config.csrf_token);
    Ok(if self.config.session_cookie.is_empty() {
      req
    } else {
      req.header(reqwest::header::COOKIE, &self.config.session_cookie)
    })
  }

  /// Send `req` and return the response body, classifying failures.
  async fn send(&self, what: &str, req: RequestBuilder) -> Result<String, FetchError> {
    let resp = self
      .auth(req)?
      .send()
      .await
      .map_err(|e| FetchError::Network(format!("{what} failed: {e}")))?;

    let status = resp.status();
    debug!(%status, what, "publisher response");
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
      return Err(FetchError::Auth);
    }
    if !status.is_success() {
      return Err(FetchError::Network(format!("{what} → {status}")));
    }
    resp
      .text()
      .await
      .map_err(|e| FetchError::Network(format!("reading {what}: {e}")))
  }

  // ── Endpoints ─────────────────────────────────────────────────────────────

  /// `GET /publisher-v2-api/monthly-sales?date=<YYYY-MM-01>`
  pub async fn monthly_sales(
    &self,
    period_start: NaiveDate,
  ) -> Result<Vec<SaleRecord>, FetchError> {
    let req = self
      .client
      .get(self.url("/monthly-sales"))
      .query(&[("date", period_start.format("%Y-%m-%d").to_string())]);
    let body = self.send("GET /monthly-sales", req).await?;
    wire::decode_sales(&body)
  }

  /// `POST /publisher-v2-api/review/list`
  pub async fn review_list(
    &self,
    page: u32,
    page_size: u32,
  ) -> Result<Vec<ReviewRecord>, FetchError> {
    let req = self
      .client
      .post(self.url("/review/list"))
      .json(&json!({ "page": page, "perPage": page_size }));
    let body = self.send("POST /review/list", req).await?;
    wire::decode_reviews(&body)
  }

  /// `POST /publisher-v2-api/dashboard/daily`
  pub async fn daily(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<DailySales, FetchError> {
    let stamp = |d: NaiveDate| d.format("%Y-%m-%dT00:00:00Z").to_string();
    let req = self.client.post(self.url("/dashboard/daily")).json(&json!({
      "start_date": stamp(start),
      "end_date": stamp(end),
      "package_ids": [],
    }));
    let body = self.send("POST /dashboard/daily", req).await?;
    wire::decode_daily(&body)
  }
}

// ─── DataSource impl ─────────────────────────────────────────────────────────

impl DataSource for PublisherClient {
  async fn fetch_sales(
    &self,
    period_start: NaiveDate,
  ) -> Result<Vec<SaleRecord>, FetchError> {
    self.monthly_sales(period_start).await
  }

  async fn fetch_reviews(
    &self,
    page: u32,
    page_size: u32,
  ) -> Result<Vec<ReviewRecord>, FetchError> {
    self.review_list(page, page_size).await
  }

  async fn fetch_daily(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<DailySales, FetchError> {
    self.daily(start, end).await
  }
}

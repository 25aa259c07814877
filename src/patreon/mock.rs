//! In-process stand-in for the Patreon members endpoint.

use crate::config::ApiConfig;
use axum::{Json, Router};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const TOKEN: &str = "test-token";

/// `(data, included)` for one page.
pub type MockPage = (Vec<Value>, Vec<Value>);

struct MockState {
    base_url: String,
    campaign_id: String,
    pages: Vec<MockPage>,
    requests: AtomicUsize,
    failing_page: AtomicUsize,
    slow_page: AtomicUsize,
    garbled_page: AtomicUsize,
}

pub struct MockCampaign {
    state: Arc<MockState>,
}

impl MockCampaign {
    pub async fn start(campaign_id: &str, pages: Vec<MockPage>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(MockState {
            base_url: format!("http://{addr}"),
            campaign_id: campaign_id.to_string(),
            pages,
            requests: AtomicUsize::new(0),
            failing_page: AtomicUsize::new(0),
            slow_page: AtomicUsize::new(0),
            garbled_page: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/campaigns/{campaign_id}/members", get(members))
            .with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { state }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.state.base_url.clone(),
            timeout_secs: 5,
        }
    }

    /// Makes the 1-based `page` answer with a 500.
    pub fn fail_page(&self, page: usize) {
        self.state.failing_page.store(page, Ordering::SeqCst);
    }

    /// Makes the 1-based `page` stall for longer than any test timeout.
    pub fn stall_page(&self, page: usize) {
        self.state.slow_page.store(page, Ordering::SeqCst);
    }

    /// Makes the 1-based `page` answer 200 with a body that isn't JSON.
    pub fn garble_page(&self, page: usize) {
        self.state.garbled_page.store(page, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }
}

async fn members(
    State(state): State<Arc<MockState>>,
    Path(campaign_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"));
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if campaign_id != state.campaign_id {
        return StatusCode::NOT_FOUND.into_response();
    }

    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    if page == 1 && query.get("include").map(String::as_str) != Some("user") {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if page == state.failing_page.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if page == state.slow_page.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    if page == state.garbled_page.load(Ordering::SeqCst) {
        return (StatusCode::OK, "{\"data\": [").into_response();
    }

    let (data, included) = page
        .checked_sub(1)
        .and_then(|i| state.pages.get(i))
        .cloned()
        .unwrap_or_default();
    let next = (page < state.pages.len()).then(|| {
        format!(
            "{}/campaigns/{}/members?page={}",
            state.base_url,
            state.campaign_id,
            page + 1
        )
    });
    Json(json!({
        "data": data,
        "included": included,
        "links": {"next": next}
    }))
    .into_response()
}

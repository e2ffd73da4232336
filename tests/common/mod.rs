#![allow(dead_code)]

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};

use caption_harvester::config::{ApiSettings, OAuthSettings};

/// Requests seen by the fake OAuth and YouTube endpoints
#[derive(Default)]
pub struct Recorded {
    pub token_requests: Mutex<Vec<HashMap<String, String>>>,
    pub api_requests: Mutex<Vec<String>>,
    pub authorizations: Mutex<Vec<String>>,
}

pub struct FakeGoogle {
    pub addr: SocketAddr,
    pub recorded: Arc<Recorded>,
}

impl FakeGoogle {
    pub async fn start() -> Self {
        let recorded = Arc::new(Recorded::default());
        let app = Router::new()
            .route("/token", post(token))
            .route("/youtube/v3/channels", get(channels))
            .route("/youtube/v3/playlistItems", get(playlist_items))
            .route("/youtube/v3/captions", get(captions))
            .route("/youtube/v3/captions/{id}", get(download))
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, recorded }
    }

    pub fn token_url(&self) -> String {
        format!("http://{}/token", self.addr)
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: format!("http://{}/youtube/v3", self.addr),
            page_size: 50,
        }
    }

    /// OAuth settings rooted in `dir`, listening on an ephemeral port
    pub fn oauth_settings(&self, dir: &FsPath) -> OAuthSettings {
        OAuthSettings {
            credentials_path: dir.join("credentials.json"),
            token_path: dir.join("token.json"),
            listen_host: "127.0.0.1".to_string(),
            listen_port: 0,
            token_url: self.token_url(),
            ..OAuthSettings::default()
        }
    }

    pub fn token_request_count(&self) -> usize {
        self.recorded.token_requests.lock().unwrap().len()
    }

    pub fn api_requests(&self) -> Vec<String> {
        self.recorded.api_requests.lock().unwrap().clone()
    }

    pub fn authorizations(&self) -> Vec<String> {
        self.recorded.authorizations.lock().unwrap().clone()
    }
}

pub fn write_registration(dir: &FsPath) {
    fs_err::write(
        dir.join("credentials.json"),
        r#"{"installed": {
            "client_id": "test-client.apps.googleusercontent.com",
            "client_secret": "test-secret",
            "redirect_uris": ["http://localhost:3000"]
        }}"#,
    )
    .unwrap();
}

async fn token(
    State(recorded): State<Arc<Recorded>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    recorded.token_requests.lock().unwrap().push(form.clone());

    let grant_type = form.get("grant_type").map(String::as_str);
    match grant_type {
        Some("authorization_code") if form.get("code").map(String::as_str) == Some("good-code") => {
            Json(json!({
                "access_token": "ya29.granted",
                "refresh_token": "1//granted",
                "expires_in": 3599,
                "scope": "https://www.googleapis.com/auth/youtube.force-ssl",
                "token_type": "Bearer"
            }))
            .into_response()
        }
        Some("refresh_token") => Json(json!({
            "access_token": "ya29.refreshed",
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
        .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Bad Request"})),
        )
            .into_response(),
    }
}

fn record(recorded: &Recorded, headers: &HeaderMap, request: String) {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    recorded.authorizations.lock().unwrap().push(authorization);
    recorded.api_requests.lock().unwrap().push(request);
}

async fn channels(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    record(&recorded, &headers, format!("channels mine={}", query["mine"]));
    Json(json!({
        "items": [{
            "id": "UC1",
            "contentDetails": {"relatedPlaylists": {"uploads": "UU1"}}
        }]
    }))
}

async fn playlist_items(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let page_token = query.get("pageToken").cloned();
    record(
        &recorded,
        &headers,
        format!(
            "playlistItems {} max={} page={}",
            query["playlistId"],
            query["maxResults"],
            page_token.as_deref().unwrap_or("-")
        ),
    );

    match page_token.as_deref() {
        None => Json(json!({
            "nextPageToken": "p2",
            "items": [
                {"snippet": {"title": "Hello, World! #1", "resourceId": {"videoId": "v1"}}},
                {"snippet": {"title": "No Subs Here", "resourceId": {"videoId": "v2"}}}
            ]
        })),
        _ => Json(json!({
            "items": [
                {"snippet": {"title": "Part 3: Finale", "resourceId": {"videoId": "v3"}}}
            ]
        })),
    }
}

async fn captions(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let video_id = query["videoId"].clone();
    record(&recorded, &headers, format!("captions {}", video_id));

    match video_id.as_str() {
        "v2" => Json(json!({"items": []})).into_response(),
        "forbidden" => (
            StatusCode::FORBIDDEN,
            Json(json!({"error": {"code": 403, "message": "forbidden"}})),
        )
            .into_response(),
        other => Json(json!({
            "items": [
                {"id": format!("{}-first", other), "snippet": {"language": "en", "trackKind": "standard"}},
                {"id": format!("{}-second", other), "snippet": {"language": "de", "trackKind": "asr"}}
            ]
        }))
        .into_response(),
    }
}

async fn download(
    State(recorded): State<Arc<Recorded>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> String {
    record(&recorded, &headers, format!("download {}", id));
    format!("caption {} as {}", id, query["tfmt"])
}

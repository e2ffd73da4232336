use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::Credential;

/// One-shot signal that can be fulfilled from several places but delivers only once
pub struct CompletionSignal<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> CompletionSignal<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (sender, receiver) = oneshot::channel();
        let signal = Self {
            sender: Mutex::new(Some(sender)),
        };
        (signal, receiver)
    }

    /// Deliver `value` if nobody has yet. Returns false when the signal was already fulfilled.
    pub fn fulfil(&self, value: T) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(sender) => {
                if sender.send(value).is_err() {
                    tracing::debug!("Authorization result dropped, nobody is waiting for it");
                }
                true
            }
            None => {
                tracing::debug!("Authorization already completed, ignoring repeated completion");
                false
            }
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Shared state of the redirect listener
pub(crate) struct ListenerState {
    credential: tokio::sync::Mutex<Credential>,
    scopes: Vec<String>,
    signal: CompletionSignal<Result<Credential>>,
}

impl ListenerState {
    pub(crate) fn new(
        credential: Credential,
        scopes: Vec<String>,
        signal: CompletionSignal<Result<Credential>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            credential: tokio::sync::Mutex::new(credential),
            scopes,
            signal,
        })
    }

    /// Complete authorization with whatever credential is installed right now
    pub(crate) async fn fulfil_with_current(&self) -> bool {
        let credential = self.credential.lock().await.clone();
        self.signal.fulfil(Ok(credential))
    }

    async fn complete_grant(&self, code: &str) -> Result<Credential> {
        let mut credential = self.credential.lock().await;
        let token = credential.client().exchange_code(code).await?;
        credential.install(token)?;
        Ok(credential.clone())
    }
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

pub(crate) fn router(state: Arc<ListenerState>) -> Router {
    Router::new().route("/", get(root)).with_state(state)
}

/// Serve the redirect listener in the background. It is never shut down explicitly.
pub(crate) fn spawn(listener: TcpListener, state: Arc<ListenerState>) {
    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Authorization listener failed: {}", e);
        }
    });
}

async fn root(
    State(state): State<Arc<ListenerState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = params.error.as_deref() {
        tracing::warn!("Consent screen returned an error: {}", error);
    }

    if let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) {
        return match state.complete_grant(code).await {
            Ok(credential) => {
                let page = Html(format!(
                    "Token stored to {}",
                    credential.store().path().display()
                ));
                tracing::info!("Token stored to {}", credential.store().path().display());
                state.signal.fulfil(Ok(credential));
                page.into_response()
            }
            Err(e) => {
                tracing::error!("Authorization code exchange failed: {:#}", e);
                let body = Html(format!("Authorization failed: {:#}", e));
                state.signal.fulfil(Err(e));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        };
    }

    let authorize_url = {
        let credential = state.credential.lock().await;
        if credential.has_access_token() {
            None
        } else {
            Some(credential.client().authorize_url(&state.scopes))
        }
    };

    match authorize_url {
        None => {
            state.fulfil_with_current().await;
            Html("Already authenticated with YouTube.".to_string()).into_response()
        }
        Some(Ok(url)) => Html(format!(
            "<a href=\"{}\">Authorize this app by visiting this link</a>",
            url
        ))
        .into_response(),
        Some(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("Cannot build the authorization link: {:#}", e)),
        )
            .into_response(),
    }
}

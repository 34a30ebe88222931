//! Route table and handlers
//!
//! | Path                  | Handler                                    |
//! |-----------------------|--------------------------------------------|
//! | `/`, `/index.html`    | status page, accounts and recent activity  |
//! | `/auth_step_one.html` | client id/secret form                      |
//! | `/auth_step_two.html` | stores the client app, shows the auth link |
//! | `/monzo`              | OAuth callback                             |
//! | anything else         | 404 page                                   |

use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use common::Secret;
use monzo_api::{MonzoClient, TransactionQuery};
use monzo_auth::ErrorKind;

use crate::html;
use crate::state::{AppState, ClientApp, ViewerState};

/// How far back the index page looks for transactions.
const TRANSACTION_WINDOW_DAYS: i64 = 7;

pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/index.html", get(index))
        .route("/auth_step_one.html", get(auth_step_one))
        .route(
            "/auth_step_two.html",
            get(auth_step_two_query).post(auth_step_two_form),
        )
        .route("/monzo", get(oauth_callback))
        .fallback(not_found)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

fn page(status: StatusCode, body: String) -> Response {
    (status, Html(body)).into_response()
}

fn upstream_failure(error: &monzo_auth::Error) -> Response {
    warn!(error = %error, "Monzo request failed");
    page(StatusCode::BAD_GATEWAY, html::error_page(&error.to_string()))
}

async fn not_found() -> Response {
    debug!("serving 404 page");
    page(StatusCode::NOT_FOUND, html::not_found())
}

#[derive(Debug, Default, Deserialize)]
struct IndexParams {
    accounts: Option<String>,
    transactions: Option<String>,
}

async fn index(State(state): State<AppState>, Query(params): Query<IndexParams>) -> Response {
    let mut viewer = state.viewer.lock().await;
    let ViewerState {
        session, accounts, ..
    } = &mut *viewer;

    let Some(session) = session.as_mut() else {
        return page(StatusCode::OK, html::unconfigured_index());
    };
    let mut client = match MonzoClient::new(session) {
        Ok(client) => client,
        Err(_) => return page(StatusCode::OK, html::unconfigured_index()),
    };

    if accounts.is_none() {
        match client.accounts(None).await {
            Ok(list) => *accounts = Some(list),
            Err(e) => return upstream_failure(&e),
        }
    }
    let accounts = accounts.as_deref().unwrap_or_default();

    let selected = match (&params.accounts, &params.transactions) {
        (Some(account_id), Some(_)) => {
            let query = TransactionQuery::new(account_id.clone())
                .since(Utc::now() - TimeDelta::days(TRANSACTION_WINDOW_DAYS))
                .expand("merchant");
            match client.transactions(&query).await {
                Ok(list) => Some((account_id.as_str(), list)),
                Err(e) if e.kind() == ErrorKind::Permissions => {
                    debug!(account_id = %account_id, "no permission to list transactions");
                    Some((account_id.as_str(), Vec::new()))
                }
                Err(e) => return upstream_failure(&e),
            }
        }
        _ => None,
    };

    let body = html::index(
        accounts,
        selected
            .as_ref()
            .map(|(id, list)| (*id, list.as_slice())),
    );
    page(StatusCode::OK, body)
}

async fn auth_step_one(State(state): State<AppState>) -> Response {
    debug!("serving client credential form");
    page(
        StatusCode::OK,
        html::auth_step_one(&state.settings.redirect_url, None, ""),
    )
}

#[derive(Debug, Default, Deserialize)]
struct StepTwoParams {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
}

async fn auth_step_two_query(
    State(state): State<AppState>,
    Query(params): Query<StepTwoParams>,
) -> Response {
    auth_step_two(state, params).await
}

async fn auth_step_two_form(
    State(state): State<AppState>,
    Form(params): Form<StepTwoParams>,
) -> Response {
    auth_step_two(state, params).await
}

async fn auth_step_two(state: AppState, params: StepTwoParams) -> Response {
    if params.client_id.is_empty() || params.client_secret.is_empty() {
        debug!("missing client_id or client_secret, re-requesting details");
        return page(
            StatusCode::OK,
            html::auth_step_one(
                &state.settings.redirect_url,
                Some("Please enter all fields"),
                &params.client_id,
            ),
        );
    }

    let client = ClientApp {
        client_id: params.client_id,
        client_secret: Secret::new(params.client_secret),
    };
    let authorization_url = match state.new_session(&client).build_authorization_url() {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, "could not prepare authorization URL");
            return page(
                StatusCode::INTERNAL_SERVER_ERROR,
                html::error_page(&e.to_string()),
            );
        }
    };

    info!(client_id = %client.client_id, "client app registered, awaiting authorization");
    state.viewer.lock().await.client = Some(client);
    page(StatusCode::OK, html::auth_step_two(&authorization_url))
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.code.is_empty() && params.state.is_empty() {
        debug!("callback without code or state");
        return not_found().await;
    }

    let mut viewer = state.viewer.lock().await;
    let Some(client) = viewer.client.clone() else {
        warn!("callback received before a client app was registered");
        return not_found().await;
    };

    let mut session = state.new_session(&client);
    session.register_credential_sink(state.credential_sink());

    match session
        .complete_authentication(&params.code, &params.state)
        .await
    {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::Authentication => {
            warn!(error = %e, "authentication failed");
            return not_found().await;
        }
        Err(e) => return upstream_failure(&e),
    }

    let credentials = session.credentials();
    viewer.session = Some(session);
    viewer.accounts = None;
    page(
        StatusCode::OK,
        html::auth_tokens(&credentials, &state.settings.redirect_url),
    )
}

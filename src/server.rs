// http server mode - run the gate as an api

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::core::{Db, Generator, QueryResult, Store, ai, gate};
use crate::{Config, Error};

/// Shared, read-only per-process state.
pub struct AppState {
    pub generator: Arc<dyn Generator>,
    pub store: Arc<dyn Store>,
    pub schema: String,
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    generated_sql: String,
    results: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generated_sql: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

type Reply<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub struct Server;

impl Server {
    pub async fn run(config: &Config) -> Result<(), Error> {
        let db = Db::connect(config.database_url()?).await?;
        let schema = db.schema().await?;
        let generator = ai::from_config(config)?;

        let state = Arc::new(AppState {
            generator: Arc::from(generator),
            store: Arc::new(db),
            schema,
        });

        let addr = config.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        tracing::info!(%addr, provider = ?config.provider, "server running");

        axum::serve(listener, Self::router(state))
            .await
            .map_err(|e| Error::Server(e.to_string()))?;

        Ok(())
    }

    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/", get(hello))
            .route("/health", get(health))
            .route("/schema", get(get_schema))
            .route("/actors", get(actors))
            .route("/movies", get(movies))
            .route("/post_movies", post(query))
            .route("/query", post(query))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }
}

async fn hello() -> &'static str {
    "Hello from sqlgate!"
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn get_schema(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "schema": state.schema }))
}

async fn actors(State(state): State<Arc<AppState>>) -> Reply<Vec<Vec<serde_json::Value>>> {
    list(&state, "SELECT * FROM Actors").await
}

async fn movies(State(state): State<Arc<AppState>>) -> Reply<Vec<Vec<serde_json::Value>>> {
    list(&state, "SELECT * FROM Movies").await
}

// fixed listings, no generated text involved
async fn list(state: &AppState, sql: &str) -> Reply<Vec<Vec<serde_json::Value>>> {
    state
        .store
        .execute(sql)
        .await
        .map(|QueryResult { rows, .. }| Json(rows))
        .map_err(|e| error_reply(&e))
}

async fn query(
    State(state): State<Arc<AppState>>,
    req: Result<Json<QueryRequest>, JsonRejection>,
) -> Reply<QueryResponse> {
    // bad bodies get the same error shape as everything else
    let Json(req) = req.map_err(|rejection| {
        (
            rejection.status(),
            Json(ErrorResponse {
                error: rejection.body_text(),
                reason: None,
                generated_sql: None,
            }),
        )
    })?;

    let answer = gate::answer(
        req.query.as_deref(),
        &state.schema,
        state.generator.as_ref(),
        state.store.as_ref(),
    )
    .await
    .map_err(|e| error_reply(&e))?;

    Ok(Json(QueryResponse {
        generated_sql: answer.generated_sql,
        results: answer.result.rows,
    }))
}

fn error_reply(e: &Error) -> (StatusCode, Json<ErrorResponse>) {
    let (status, reason, generated_sql) = match e {
        Error::MissingInput => (StatusCode::BAD_REQUEST, None, None),
        Error::UnsafeStatement { reason, .. } => {
            (StatusCode::BAD_REQUEST, Some(reason.code()), None)
        }
        Error::StoreExecution { statement, .. } => {
            (StatusCode::BAD_REQUEST, None, Some(statement.clone()))
        }
        Error::Generation(_) | Error::Http(_) => (StatusCode::BAD_GATEWAY, None, None),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, None, None),
    };

    // the client matches on this exact text
    let error = match e {
        Error::UnsafeStatement { .. } => "Unsafe SQL detected".to_string(),
        other => other.to_string(),
    };

    (
        status,
        Json(ErrorResponse {
            error,
            reason,
            generated_sql,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_errors_are_bad_gateway() {
        // no scheme, so reqwest fails before touching the network
        let err = reqwest::get("not a url").await.unwrap_err();
        let (status, Json(body)) = error_reply(&Error::from(err));

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.error.starts_with("HTTP error"));
    }

    #[test]
    fn unsafe_hides_statement_but_names_reason() {
        let err = Error::UnsafeStatement {
            statement: "DROP TABLE Movies".to_string(),
            reason: crate::core::DenyReason::ForbiddenKeyword("drop"),
        };
        let (status, Json(body)) = error_reply(&err);

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Unsafe SQL detected");
        assert_eq!(body.reason.as_deref(), Some("forbidden-keyword:drop"));
        assert!(body.generated_sql.is_none());
    }
}

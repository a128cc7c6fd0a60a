use crate::config::Listener as ListenerConfig;
use crate::pagination::PaginationParams;
use crate::scheduler::{LAUNCH_NOT_FOUND, LaunchError, MISSING_LAUNCH_PROPERTY};
use crate::service::LaunchService;
use crate::types::{AbortStatus, Launch, Planet, ScheduleRequest};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::Serialize;
use tokio::net::TcpListener;

pub fn router(launches: LaunchService) -> Router {
    Router::new()
        .route(
            "/v1/launches",
            get(http_get_all_launches).post(http_add_new_launch),
        )
        .route("/v1/launches/{id}", delete(http_abort_launch))
        .route("/v1/planets", get(http_get_all_planets))
        .with_state(launches)
}

pub async fn serve(listener: &ListenerConfig, launches: LaunchService) -> std::io::Result<()> {
    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "launches API listening");

    axum::serve(listener, router(launches)).await
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error: String,
}

impl IntoResponse for LaunchError {
    fn into_response(self) -> Response {
        let status = match self {
            LaunchError::Validation(_) | LaunchError::Conflict(_) => StatusCode::BAD_REQUEST,
            LaunchError::NotFound(_) => StatusCode::NOT_FOUND,
            LaunchError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            LaunchError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "launch request failed");
        }

        let body = Json(ApiErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

async fn http_get_all_launches(
    State(launches): State<LaunchService>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Vec<Launch>>, LaunchError> {
    launches.get_all_launches(&params).await.map(Json)
}

async fn http_add_new_launch(
    State(launches): State<LaunchService>,
    body: Bytes,
) -> Result<(StatusCode, Json<Launch>), LaunchError> {
    // An absent or unreadable body is reported like any other missing property.
    let request = if body.is_empty() {
        ScheduleRequest::default()
    } else {
        serde_json::from_slice::<ScheduleRequest>(&body)
            .map_err(|_| LaunchError::Validation(MISSING_LAUNCH_PROPERTY))?
    };

    let launch = launches.schedule_new_launch(request).await?;
    Ok((StatusCode::CREATED, Json(launch)))
}

async fn http_abort_launch(
    State(launches): State<LaunchService>,
    Path(id): Path<String>,
) -> Result<Json<AbortStatus>, LaunchError> {
    let id = id
        .parse()
        .map_err(|_| LaunchError::NotFound(LAUNCH_NOT_FOUND))?;
    launches.abort_launch_by_id(id).await.map(Json)
}

async fn http_get_all_planets(State(launches): State<LaunchService>) -> Json<Vec<Planet>> {
    Json(launches.planets().planets().to_vec())
}

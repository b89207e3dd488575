use crate::db::{KeyFilter, KeyRepo};
use crate::error::{AppError, AppResult};
use crate::lifecycle::EffectiveStatus;
use crate::panel::{KeyDetail, KeyListing, ListQuery, PanelData};
use crate::web::admin;
use crate::web::state::{request_origin, AppState};
use crate::web::templates::{render, DetailTemplate, IndexTemplate, SelectOption};
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body.
const BODY_LIMIT_BYTES: usize = 256 * 1024;

/// Public key listing
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let panel = PanelData::load(&state.pool, &state.config, &request_origin(&headers)).await?;

    let filter = KeyFilter {
        key_type: query.key_type.trim().to_string(),
        query: query.q.trim().to_string(),
    };
    let rows = KeyRepo::list(&state.pool, &filter).await?;
    let listing = KeyListing::build(rows, &query.status, state.clock.today());

    render(&IndexTemplate {
        panel: panel.view,
        items: listing.items,
        q: filter.query,
        types: SelectOption::list(listing.types, &filter.key_type),
        statuses: SelectOption::list(EffectiveStatus::ALL.map(|s| s.as_str()), &query.status),
    })
}

/// Key detail page
pub async fn detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let panel = PanelData::load(&state.pool, &state.config, &request_origin(&headers)).await?;

    let record = match id.trim().parse::<i64>() {
        Ok(id) => KeyRepo::get(&state.pool, id).await?,
        Err(_) => None,
    };

    let Some(record) = record else {
        let page = render(&DetailTemplate {
            panel: panel.view,
            item: None,
            error: "Key not found.".to_string(),
        })?;
        return Ok((StatusCode::NOT_FOUND, page).into_response());
    };

    let item = KeyDetail::new(record, &panel.view.ui_text, state.clock.today());
    let page = render(&DetailTemplate {
        panel: panel.view,
        item: Some(item),
        error: String::new(),
    })?;
    Ok(page.into_response())
}

/// Anything unrouted
pub async fn not_found() -> AppError {
    AppError::NotFound
}

/// Create the web router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/k/{id}", get(detail))
        .route("/{admin_path}", get(admin::dashboard))
        .route("/{admin_path}/login", post(admin::login))
        .route("/{admin_path}/logout", post(admin::logout))
        .route("/{admin_path}/add", post(admin::add_key))
        .route("/{admin_path}/delete/{id}", post(admin::delete_key))
        .route("/{admin_path}/toggle/{id}", post(admin::toggle_key))
        .route("/{admin_path}/announce", post(admin::save_announcement))
        .route("/{admin_path}/ui-text", post(admin::save_ui_text))
        .nest_service("/public", ServeDir::new("public"))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

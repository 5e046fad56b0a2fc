use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use restock_core::StoreId;
use restock_renderer::{PageContext, StoreCtx, TemplateKind};
use restock_sync::{lookup_store, submit_report, LookupOutcome};

use crate::error::WebError;
use crate::state::AppState;

const MISSING_ID: &str =
    "店舗IDが指定されていません。URLに「?store=店舗ID」を追加するか、以下から入力してください。";
const INVALID_ID: &str = "有効な店舗IDを入力してください。";
const LOOKUP_FAILED: &str = "店舗情報の取得中にエラーが発生しました。";

type Page = (StatusCode, Html<String>);

#[derive(Debug, Deserialize)]
struct StoreQuery {
    #[serde(default)]
    store: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReportForm {
    #[serde(default)]
    store: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(store_page))
        .route("/report", post(report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn render(state: &AppState, status: StatusCode, kind: TemplateKind, ctx: &PageContext) -> Result<Page, WebError> {
    let html = state.renderer().render_page(kind, ctx)?;
    Ok((status, Html(html)))
}

fn error_page(state: &AppState, status: StatusCode, message: &str, store_id: Option<&str>) -> Result<Page, WebError> {
    render(
        state,
        status,
        TemplateKind::ErrorPage,
        &PageContext::error(message, store_id),
    )
}

/// GET /?store=<id>
async fn store_page(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> Result<Page, WebError> {
    let raw = query.store.unwrap_or_default();
    if raw.trim().is_empty() {
        return error_page(&state, StatusCode::OK, MISSING_ID, None);
    }
    let Ok(id) = StoreId::parse(&raw) else {
        return error_page(&state, StatusCode::BAD_REQUEST, INVALID_ID, None);
    };

    match lookup_store(state.docs(), &id).await {
        LookupOutcome::Found { id, info } => render(
            &state,
            StatusCode::OK,
            TemplateKind::StorePage,
            &PageContext::store(StoreCtx::new(&id, &info)),
        ),
        LookupOutcome::Invalid { .. } => {
            error_page(&state, StatusCode::BAD_REQUEST, INVALID_ID, None)
        }
        LookupOutcome::NotFound { id } => error_page(
            &state,
            StatusCode::NOT_FOUND,
            &format!("店舗ID: {id} の情報が見つかりません"),
            Some(id.as_str()),
        ),
        LookupOutcome::Unavailable { id, .. } => error_page(
            &state,
            StatusCode::SERVICE_UNAVAILABLE,
            LOOKUP_FAILED,
            Some(id.as_str()),
        ),
    }
}

/// POST /report
async fn report(
    State(state): State<AppState>,
    Form(form): Form<ReportForm>,
) -> Result<Page, WebError> {
    let Ok(id) = StoreId::parse(&form.store) else {
        warn!("report with malformed store id refused");
        return error_page(&state, StatusCode::BAD_REQUEST, INVALID_ID, None);
    };

    match submit_report(state.docs(), &id, Utc::now()).await {
        Ok(report) => {
            info!(store_id = %report.store_id, "report accepted");
            render(
                &state,
                StatusCode::OK,
                TemplateKind::ThanksPage,
                &PageContext::thanks(&report.store_id),
            )
        }
        Err(err) => {
            warn!(store_id = %id, error = %err, "report submission failed");
            error_page(
                &state,
                StatusCode::SERVICE_UNAVAILABLE,
                &format!("報告の送信中にエラーが発生しました: {err}"),
                Some(id.as_str()),
            )
        }
    }
}

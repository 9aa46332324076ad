// HTTP surface - JSON views of the dashboard pages plus the invoice mutations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::actions::{self, ActionOutcome};
use crate::cache::{PageCache, INVOICES_PATH};
use crate::error::{DashboardError, DashboardResult};
use crate::queries::{self, InvoicesTableRow};
use crate::schema::RawForm;
use crate::utils::{
    format_currency, format_date_to_local, generate_pagination, generate_y_axis, page_url,
    PageItem, SearchParams,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub cache: Arc<PageCache<InvoicesPage>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            cache: Arc::new(PageCache::new()),
        }
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_db<T, F>(&self, f: F) -> DashboardResult<T>
    where
        F: FnOnce(&Connection) -> DashboardResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| DashboardError::LockPoisoned)?;
            f(&conn)
        })
        .await
        .map_err(|e| DashboardError::Task(e.to_string()))?
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::err(self.to_string())),
        )
            .into_response()
    }
}

// ============================================================================
// View models
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct InvoiceView {
    #[serde(flatten)]
    row: InvoicesTableRow,
    formatted_amount: String,
    formatted_date: String,
}

impl From<InvoicesTableRow> for InvoiceView {
    fn from(row: InvoicesTableRow) -> Self {
        Self {
            formatted_amount: format_currency(row.amount),
            formatted_date: format_date_to_local(&row.date),
            row,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct PageLink {
    page: PageItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    href: Option<String>,
    active: bool,
}

/// One page of the invoices table, as served and as cached
#[derive(Debug, Clone, Serialize)]
pub struct InvoicesPage {
    query: String,
    current_page: u32,
    total_pages: u32,
    invoices: Vec<InvoiceView>,
    pagination: Vec<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

impl InvoicesPage {
    fn build(query: &str, current_page: u32, total_pages: u32, rows: Vec<InvoicesTableRow>) -> Self {
        let pagination = generate_pagination(current_page, total_pages)
            .into_iter()
            .map(|item| match item {
                PageItem::Page(number) => PageLink {
                    page: item,
                    href: Some(page_url(INVOICES_PATH, query, number)),
                    active: number == current_page,
                },
                PageItem::Ellipsis => PageLink {
                    page: item,
                    href: None,
                    active: false,
                },
            })
            .collect();

        Self {
            query: query.to_string(),
            current_page,
            total_pages,
            invoices: rows.into_iter().map(InvoiceView::from).collect(),
            pagination,
            previous: (current_page > 1).then(|| page_url(INVOICES_PATH, query, current_page - 1)),
            next: (current_page < total_pages)
                .then(|| page_url(INVOICES_PATH, query, current_page + 1)),
        }
    }
}

// ============================================================================
// Read handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /dashboard - revenue chart, latest invoices and cards, fetched concurrently
async fn dashboard_overview(State(state): State<AppState>) -> Result<Response, DashboardError> {
    let (revenue, latest_invoices, cards) = tokio::try_join!(
        state.with_db(queries::fetch_revenue),
        state.with_db(queries::fetch_latest_invoices),
        state.with_db(queries::fetch_card_data),
    )?;

    let y_axis = generate_y_axis(&revenue);

    Ok(Json(ApiResponse::ok(json!({
        "revenue": revenue,
        "y_axis": y_axis,
        "latest_invoices": latest_invoices,
        "cards": cards,
    })))
    .into_response())
}

/// GET /dashboard/invoices?query=&page=
async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, DashboardError> {
    let query = params.query().to_string();
    let current_page = params.page();
    let key = format!("query={query}&page={current_page}");

    if let Some(page) = state.cache.get(INVOICES_PATH, &key) {
        return Ok(Json(ApiResponse::ok(page)).into_response());
    }

    // Taken before the read so a revalidation during it keeps this page out
    let generation = state.cache.generation();
    let search = query.clone();
    let (rows, total_pages) = state
        .with_db(move |conn| {
            let rows = queries::fetch_filtered_invoices(conn, &search, current_page)?;
            let pages = queries::fetch_invoices_pages(conn, &search)?;
            Ok((rows, pages))
        })
        .await?;

    let page = InvoicesPage::build(&query, current_page, total_pages, rows);
    state.cache.insert(INVOICES_PATH, key, page.clone(), generation);

    Ok(Json(ApiResponse::ok(page)).into_response())
}

/// GET /dashboard/invoices/create - customer options for the form
async fn create_form(State(state): State<AppState>) -> Result<Response, DashboardError> {
    let customers = state.with_db(queries::fetch_customers).await?;
    Ok(Json(ApiResponse::ok(json!({ "customers": customers }))).into_response())
}

/// GET /dashboard/invoices/:id/edit
async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, DashboardError> {
    let (invoice, customers) = state
        .with_db(move |conn| {
            let invoice = queries::fetch_invoice_by_id(conn, &id)?;
            let customers = queries::fetch_customers(conn)?;
            Ok((invoice, customers))
        })
        .await?;

    let response = match invoice {
        Some(invoice) => Json(ApiResponse::ok(json!({
            "invoice": invoice,
            "customers": customers,
        })))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("Invoice not found")),
        )
            .into_response(),
    };
    Ok(response)
}

/// GET /dashboard/customers?query=
async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, DashboardError> {
    let query = params.query().to_string();
    let search = query.clone();
    let customers = state
        .with_db(move |conn| queries::fetch_filtered_customers(conn, &search))
        .await?;

    Ok(Json(ApiResponse::ok(json!({
        "query": query,
        "customers": customers,
    })))
    .into_response())
}

// ============================================================================
// Mutation handlers
// ============================================================================

/// Apply an action's outcome: revalidate, then redirect or acknowledge
fn finish(state: &AppState, outcome: ActionOutcome) -> Response {
    match outcome {
        ActionOutcome::Invalid(form_state) => {
            let error = form_state.message.clone();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse {
                    success: false,
                    data: Some(form_state),
                    error,
                }),
            )
                .into_response()
        }
        ActionOutcome::Completed {
            revalidate,
            redirect,
        } => {
            state.cache.revalidate_path(revalidate);
            match redirect {
                Some(to) => Redirect::to(to).into_response(),
                None => Json(ApiResponse::ok(json!({ "revalidated": revalidate }))).into_response(),
            }
        }
    }
}

/// POST /dashboard/invoices
async fn create_invoice(
    State(state): State<AppState>,
    Form(form): Form<RawForm>,
) -> Result<Response, DashboardError> {
    let outcome = state
        .with_db(move |conn| Ok(actions::create_invoice(conn, &form)))
        .await?;
    Ok(finish(&state, outcome))
}

/// POST /dashboard/invoices/:id/edit
async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<RawForm>,
) -> Result<Response, DashboardError> {
    let outcome = state
        .with_db(move |conn| Ok(actions::update_invoice(conn, &id, &form)))
        .await?;
    Ok(finish(&state, outcome))
}

/// POST /dashboard/invoices/:id/delete
async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, DashboardError> {
    let outcome = state
        .with_db(move |conn| Ok(actions::delete_invoice(conn, &id)))
        .await?;
    Ok(finish(&state, outcome))
}

// ============================================================================
// Router
// ============================================================================

pub fn build_app(state: AppState) -> Router {
    let api_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .route("/dashboard", get(dashboard_overview))
        .route("/dashboard/invoices", get(list_invoices).post(create_invoice))
        .route("/dashboard/invoices/create", get(create_form))
        .route("/dashboard/invoices/:id/edit", get(edit_form).post(update_invoice))
        .route("/dashboard/invoices/:id/delete", post(delete_invoice))
        .route("/dashboard/customers", get(list_customers))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    extract::{Path, Query, State},
    http::{Method, Request, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::editor::{Authorized, EditorError, FormError, MenuEditor, MenuForm, DELETE_PROMPT};
use crate::menu::{self, MenuItem};
use crate::navigation::{storefront_menu, NavEntry};
use crate::orders::{place_order, NewOrder, OrderError, OrderStore};
use crate::products::{category_filter, ProductStore};
use crate::store::{MenuStore, StoreError};
use crate::util::now_iso_rfc3339;

const MAX_BODY: usize = 1_048_576;

/* ================== Context ================== */

#[derive(Clone)]
pub struct ApiCtx {
    pub api_key: String,
    pub hmac_secret: String,
    pub store: Arc<dyn MenuStore>,
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
}

#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn api_err(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ApiError { error: msg.into() })).into_response()
}

fn editor_err(e: EditorError) -> Response {
    let status = match &e {
        EditorError::Unauthorized => StatusCode::UNAUTHORIZED,
        EditorError::NotFound(_) => StatusCode::NOT_FOUND,
        EditorError::Form(_) => StatusCode::BAD_REQUEST,
    };
    api_err(status, e.to_string())
}

fn store_err(e: StoreError) -> Response {
    match e {
        StoreError::Unreachable(_) => api_err(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        StoreError::Backend(_) => api_err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/* ================== Auth Middleware ================== */

/// مفتاح API إجباري، وتوقيع HMAC-SHA256 للجسم إن أُرسل `x-signature`.
/// الطلب المقبول يحمل `Authorized(true)` إلى المعالجات.
async fn auth_mw(
    State(ctx): State<Arc<ApiCtx>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    tracing::debug!(target: "http", "HTTP {} {}", req.method(), req.uri().path());

    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let api_key = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if api_key != ctx.api_key {
        tracing::warn!(target: "http", "-> Unauthorized (bad API key) {}", req.uri().path());
        return Err(api_err(StatusCode::UNAUTHORIZED, "Unauthorized (API key)"));
    }

    let sig_opt = req
        .headers()
        .get("x-signature")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if let Some(sig) = sig_opt {
        let owned: Body = std::mem::take(req.body_mut());
        let bytes = to_bytes(owned, MAX_BODY)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST.into_response())?;

        let mut mac = Hmac::<Sha256>::new_from_slice(ctx.hmac_secret.as_bytes())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())?;
        mac.update(&bytes);
        let expected = hex::encode(mac.finalize().into_bytes());

        if !expected.eq_ignore_ascii_case(&sig) {
            tracing::warn!(target: "http", "-> Invalid signature ({:.8}…)", sig);
            return Err(api_err(StatusCode::UNAUTHORIZED, "Invalid signature"));
        }

        let (parts, _) = req.into_parts();
        req = Request::from_parts(parts, Body::from(bytes));
    }

    req.extensions_mut().insert(Authorized(true));
    Ok(next.run(req).await)
}

/* ================== Routes: عامة ================== */

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "service": "alamal-menus",
        "ts": now_iso_rfc3339()
    }))
}

async fn navigation(State(ctx): State<Arc<ApiCtx>>) -> Json<Vec<NavEntry>> {
    Json(storefront_menu(ctx.store.as_ref()).await)
}

/* ================== Menus (لوحة التحكم) ================== */

async fn mount(ctx: &ApiCtx, auth: Authorized) -> Result<MenuEditor, Response> {
    MenuEditor::mount(ctx.store.as_ref(), auth)
        .await
        .map_err(editor_err)
}

async fn menus_list(
    State(ctx): State<Arc<ApiCtx>>,
    Extension(auth): Extension<Authorized>,
) -> Result<Response, Response> {
    let editor = mount(&ctx, auth).await?;
    Ok(Json(editor.rows()).into_response())
}

async fn menus_roots(
    State(ctx): State<Arc<ApiCtx>>,
    Extension(auth): Extension<Authorized>,
) -> Result<Response, Response> {
    let editor = mount(&ctx, auth).await?;
    Ok(Json(editor.parent_options()).into_response())
}

async fn menu_add(
    State(ctx): State<Arc<ApiCtx>>,
    Extension(auth): Extension<Authorized>,
    Json(form): Json<MenuForm>,
) -> Result<Response, Response> {
    let mut editor = mount(&ctx, auth).await?;
    *editor.begin_add() = form;

    let saved = editor
        .submit(ctx.store.as_ref())
        .await
        .map_err(editor_err)?;
    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

async fn menu_update(
    Path(id): Path<i64>,
    State(ctx): State<Arc<ApiCtx>>,
    Extension(auth): Extension<Authorized>,
    Json(form): Json<MenuForm>,
) -> Result<Response, Response> {
    let mut editor = mount(&ctx, auth).await?;
    *editor.begin_edit(id).map_err(editor_err)? = form;

    let saved = editor
        .submit(ctx.store.as_ref())
        .await
        .map_err(editor_err)?;
    Ok(Json(saved).into_response())
}

#[derive(Deserialize)]
struct DeleteQuery {
    #[serde(default)]
    confirm: bool,
}

async fn menu_delete(
    Path(id): Path<i64>,
    Query(q): Query<DeleteQuery>,
    State(ctx): State<Arc<ApiCtx>>,
    Extension(auth): Extension<Authorized>,
) -> Result<Response, Response> {
    let mut editor = mount(&ctx, auth).await?;

    let outcome = editor
        .delete(id, |_| q.confirm, ctx.store.as_ref())
        .await
        .map_err(editor_err)?;

    match outcome {
        Some(deletion) => Ok(Json(deletion).into_response()),
        None => Err(api_err(StatusCode::CONFLICT, DELETE_PROMPT)),
    }
}

/* ---- bulk replace ---- */

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuItemInput {
    id: Option<i64>,
    name: String,
    url: String,
    parent_id: Option<i64>,
    #[serde(default = "default_order")]
    order: i64,
    #[serde(default = "default_active")]
    is_active: bool,
    icon_url: Option<String>,
}

fn default_order() -> i64 {
    1
}

fn default_active() -> bool {
    true
}

/// يعطي كل عنصر بلا معرّف معرّفاً بعد أكبر معرّف مخزَّن أو مُرسَل.
fn assign_ids(existing: &[MenuItem], input: Vec<MenuItemInput>) -> Result<Vec<MenuItem>, FormError> {
    let payload_max = input.iter().filter_map(|m| m.id).max().unwrap_or(0).max(0);
    let mut next = menu::next_id(existing)
        .zip(payload_max.checked_add(1))
        .map(|(a, b)| a.max(b));

    let mut out = Vec::with_capacity(input.len());
    for m in input {
        if m.name.trim().is_empty() {
            return Err(FormError::MissingName);
        }
        if m.url.trim().is_empty() {
            return Err(FormError::MissingUrl);
        }
        let id = match m.id {
            Some(id) => id,
            None => {
                let id = next.ok_or(FormError::IdsExhausted)?;
                next = id.checked_add(1);
                id
            }
        };
        out.push(MenuItem {
            id,
            name: m.name,
            url: m.url,
            parent_id: m.parent_id.filter(|p| *p != 0),
            order: m.order,
            is_active: m.is_active,
            icon_url: m.icon_url.filter(|s| !s.trim().is_empty()),
        });
    }
    Ok(out)
}

async fn menus_save_all(
    State(ctx): State<Arc<ApiCtx>>,
    Extension(auth): Extension<Authorized>,
    Json(input): Json<Vec<MenuItemInput>>,
) -> Result<Response, Response> {
    let editor = mount(&ctx, auth).await?;
    let items = assign_ids(editor.items(), input)
        .map_err(|e| api_err(StatusCode::BAD_REQUEST, e.to_string()))?;

    ctx.store.save_all(&items).await.map_err(|e| {
        tracing::error!(target: "menus", "bulk save failed: {e}");
        store_err(e)
    })?;

    tracing::info!(target: "menus", "bulk saved {} menus", items.len());
    Ok(Json(items).into_response())
}

/* ================== Products & Orders ================== */

#[derive(Deserialize)]
struct ProductsQuery {
    category: Option<String>,
}

async fn products_list(
    State(ctx): State<Arc<ApiCtx>>,
    Query(q): Query<ProductsQuery>,
) -> Result<Response, Response> {
    let category = category_filter(q.category.as_deref());
    let items = ctx.products.list(category.as_deref()).await.map_err(|e| {
        tracing::error!(target: "products", "list products failed: {e}");
        store_err(e)
    })?;
    Ok(Json(items).into_response())
}

// الشراء عام: العميل لا يملك مفتاح API
async fn checkout(
    State(ctx): State<Arc<ApiCtx>>,
    Json(new): Json<NewOrder>,
) -> Result<Response, Response> {
    match place_order(ctx.orders.as_ref(), new).await {
        Ok(order) => Ok((StatusCode::CREATED, Json(order)).into_response()),
        Err(OrderError::Store(e)) => {
            tracing::error!(target: "orders", "save order failed: {e}");
            Err(store_err(e))
        }
        Err(e) => Err(api_err(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn orders_list(State(ctx): State<Arc<ApiCtx>>) -> Result<Response, Response> {
    let orders = ctx.orders.list().await.map_err(store_err)?;
    Ok(Json(orders).into_response())
}

async fn orders_by_phone(
    Path(phone): Path<String>,
    State(ctx): State<Arc<ApiCtx>>,
) -> Result<Response, Response> {
    let orders = ctx.orders.list_by_phone(&phone).await.map_err(store_err)?;
    Ok(Json(orders).into_response())
}

/* ================== Runner ================== */

pub fn router(ctx: Arc<ApiCtx>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/navigation", get(navigation))
        .route("/api/products", get(products_list))
        .route("/api/checkout", post(checkout));

    let protected = Router::new()
        .route(
            "/api/menus",
            get(menus_list).post(menu_add).put(menus_save_all),
        )
        .route("/api/menus/roots", get(menus_roots))
        .route("/api/menus/:id", put(menu_update).delete(menu_delete))
        .route("/api/orders", get(orders_list))
        .route("/api/orders/phone/:phone", get(orders_by_phone))
        .layer(from_fn_with_state(ctx.clone(), auth_mw));

    public
        .merge(protected)
        .with_state(ctx)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(ctx: Arc<ApiCtx>, port: u16) -> anyhow::Result<()> {
    let app = router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(target: "http", "[http] listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

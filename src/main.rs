// src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::admin_guard;

fn router(app_state: AppState) -> Router {
    // Rotas do cliente (escopo: cabeçalho x-session-id)
    let cart_routes = Router::new()
        .route("/", get(handlers::cart::get_cart).delete(handlers::cart::clear_cart))
        .route("/count", get(handlers::cart::get_count))
        .route("/items", post(handlers::cart::add_item))
        .route(
            "/items/{index}",
            patch(handlers::cart::update_quantity).delete(handlers::cart::remove_item),
        );

    let profile_routes = Router::new().route(
        "/",
        get(handlers::profile::get_profile)
            .put(handlers::profile::save_profile)
            .delete(handlers::profile::delete_profile),
    );

    let promotion_routes = Router::new()
        .route("/seen", get(handlers::profile::seen_promotions))
        .route("/{id}/seen", post(handlers::profile::mark_promotion_seen));

    let order_routes = Router::new()
        .route("/whatsapp", post(handlers::orders::submit_whatsapp))
        .route("/call", post(handlers::orders::call_shop));

    let loyalty_routes = Router::new()
        .route("/me", get(handlers::loyalty::my_account))
        .route("/{customer_id}", get(handlers::loyalty::get_account));

    // Painel (protegido pelo JWT do admin)
    let admin_routes = Router::new()
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route("/orders/{id}/status", put(handlers::orders::update_status))
        .route("/loyalty/sync", post(handlers::loyalty::bulk_sync))
        .route("/loyalty/cache", delete(handlers::loyalty::flush_cache))
        .route("/loyalty/cache/{crm_id}", delete(handlers::loyalty::invalidate_cache_entry))
        .route("/loyalty/{customer_id}/link", delete(handlers::loyalty::unlink))
        .route("/coupons/redeem", post(handlers::coupons::redeem))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), admin_guard));

    let admin_auth_routes = Router::new()
        .route("/login", post(handlers::admin::login))
        .route("/logout", post(handlers::admin::logout));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/coupons", post(handlers::coupons::activate_offer))
        .nest("/api/cart", cart_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/promotions", promotion_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/loyalty", loyalty_routes)
        .nest("/api/admin", admin_auth_routes.merge(admin_routes))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível (padrão: info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!().run(pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    let app = router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

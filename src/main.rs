use anyhow::Result;
use axum::Router;
use comanda_orderservice::{app_state::AppState, bootstrap, config, db, routes};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use utoipa_swagger_ui::SwaggerUi;

/// Migrations embedded into the binary, so a fresh install needs nothing
/// beyond the executable and a writable data directory.
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let routes = routes::routes_with_openapi();

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Comanda OrderService API")
        .version("1.0.0")
        .build();
    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi);

    let app = Router::new().merge(routes).merge(swagger_ui);

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations(MIGRATIONS, &config.database.path).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let store = db::Store::open(&config.database.path).await?;
    let state = AppState::new(store);

    bootstrap::serve("OrderService", app, state, &config.server).await?;
    Ok(())
}

pub mod ingredients;
pub mod orders;
pub mod products;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

/// Every route module merged into one OpenAPI-aware router.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    ingredients::routes_with_openapi()
        .merge(products::routes_with_openapi())
        .merge(orders::routes_with_openapi())
}

//! Role dashboards: the counters and totals the customer and provider home
//! screens render.

use axum::extract::State;
use axum::Json;
use servicematch_db::models::dashboard::{CustomerDashboard, ProviderDashboard};
use servicematch_db::repositories::AdminRepo;

use crate::error::AppResult;
use crate::middleware::rbac::{RequireCustomer, RequireProvider};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/dashboard/customer
pub async fn customer_dashboard(
    RequireCustomer(auth): RequireCustomer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<CustomerDashboard>>> {
    let dashboard = AdminRepo::customer_dashboard(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse::new(dashboard)))
}

/// GET /api/v1/dashboard/provider
pub async fn provider_dashboard(
    RequireProvider(auth): RequireProvider,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ProviderDashboard>>> {
    let dashboard = AdminRepo::provider_dashboard(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse::new(dashboard)))
}

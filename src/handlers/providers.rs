use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Provider, ServiceCategory};
use crate::state::AppState;

// GET /api/providers?serviceType=
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersQuery {
    pub service_type: Option<String>,
}

#[derive(Serialize)]
pub struct ProviderResponse {
    id: String,
    name: String,
    service_type: ServiceCategory,
    location: String,
    working_hours: String,
}

impl From<&Provider> for ProviderResponse {
    fn from(p: &Provider) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            service_type: p.service_type,
            location: p.location.clone(),
            working_hours: p.working_hours.to_human_readable(),
        }
    }
}

pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProvidersQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let providers: Vec<ProviderResponse> = match query.service_type.as_deref() {
        None | Some("") => state.directory.all().iter().map(ProviderResponse::from).collect(),
        Some(raw) => {
            let category = ServiceCategory::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown service type: {raw}")))?;
            state
                .directory
                .for_category(category)
                .into_iter()
                .map(ProviderResponse::from)
                .collect()
        }
    };

    Ok(Json(serde_json::json!({"providers": providers})))
}

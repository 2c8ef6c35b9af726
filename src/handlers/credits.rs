use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{required, UserQuery};
use crate::errors::AppError;
use crate::models::{find_plan, CreditPlan, CREDIT_PLANS};
use crate::state::AppState;

// GET /api/credits?userId=
pub async fn get_credits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = required(query.user_id, "User ID required")?;
    let credits = state.ledger.get_balance(&user_id).await?;
    Ok(Json(serde_json::json!({"credits": credits})))
}

// POST /api/credits
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCreditsRequest {
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Serialize)]
pub struct CreditsResponse {
    success: bool,
    credits: i64,
}

pub async fn update_credits(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateCreditsRequest>,
) -> Result<Json<CreditsResponse>, AppError> {
    let user_id = required(body.user_id, "User ID required")?;

    let credits = match body.action.as_deref() {
        Some("add") => {
            let amount = body.amount.unwrap_or(0);
            state.ledger.adjust(&user_id, amount).await?
        }
        Some("deduct") => {
            let amount = body.amount.unwrap_or(1);
            state.ledger.adjust(&user_id, amount.saturating_neg()).await?
        }
        Some("set") => {
            let amount = body.amount.unwrap_or(0);
            state.ledger.set_balance(&user_id, amount).await?
        }
        _ => return Err(AppError::Validation("Invalid action".to_string())),
    };

    Ok(Json(CreditsResponse {
        success: true,
        credits,
    }))
}

// GET /api/credits/plans
pub async fn list_plans() -> Json<serde_json::Value> {
    let plans: &[CreditPlan] = &CREDIT_PLANS;
    Json(serde_json::json!({"plans": plans}))
}

// POST /api/credits/purchase
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub user_id: Option<String>,
    pub plan_id: Option<String>,
}

pub async fn purchase_plan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PurchaseRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = required(body.user_id, "User ID required")?;
    let plan_id = required(body.plan_id, "Plan ID required")?;
    let plan = find_plan(&plan_id)
        .ok_or_else(|| AppError::Validation(format!("Unknown plan: {plan_id}")))?;

    let credits = state.ledger.adjust(&user_id, plan.credits).await?;
    tracing::info!(user_id = %user_id, plan = plan.id, added = plan.credits, "credit pack purchased");

    Ok(Json(serde_json::json!({
        "success": true,
        "plan": plan,
        "credits": credits,
    })))
}

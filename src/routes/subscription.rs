use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::block_chain::utils::format_timestamp;
use crate::notifications::Notification;
use crate::subscription::query::SubscriptionState;
use crate::subscription::tiers::{all_tiers, TierInfo};
use crate::transactions::executor::ExecutionOutcome;

fn one_month() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub tier: u8,
    #[serde(default = "one_month")]
    pub months: u64,
}

#[derive(Debug, Deserialize)]
pub struct RenewRequest {
    #[serde(default = "one_month")]
    pub months: u64,
}

#[derive(Debug, Deserialize)]
pub struct AutoRenewRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub subscription: SubscriptionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
}

#[get("/tiers")]
pub async fn get_tiers() -> web::Json<Vec<TierInfo>> {
    web::Json(all_tiers())
}

#[get("/subscription")]
pub async fn get_subscription(state: web::Data<AppState>) -> impl Responder {
    let session = state.wallet.session();
    let address = session.connected_address();
    let status = state.query.status(session.network, address);
    if let (SubscriptionState::Loading, Some(address)) = (&status, address) {
        state.query.resolve_in_background(session.network, address);
    }

    let expires = match &status {
        SubscriptionState::Resolved(Some(subscription)) => format_timestamp(subscription.expires_at),
        _ => None,
    };
    HttpResponse::Ok().json(SubscriptionResponse { subscription: status, expires })
}

#[post("/subscription/subscribe")]
pub async fn subscribe(data: web::Json<SubscribeRequest>, state: web::Data<AppState>) -> web::Json<ExecutionOutcome> {
    web::Json(state.subscriptions.subscribe(data.tier, data.months).await)
}

#[post("/subscription/renew")]
pub async fn renew(data: web::Json<RenewRequest>, state: web::Data<AppState>) -> web::Json<ExecutionOutcome> {
    web::Json(state.subscriptions.renew(data.months).await)
}

#[post("/subscription/cancel")]
pub async fn cancel(state: web::Data<AppState>) -> web::Json<ExecutionOutcome> {
    web::Json(state.subscriptions.cancel().await)
}

#[post("/subscription/auto-renew")]
pub async fn set_auto_renew(data: web::Json<AutoRenewRequest>, state: web::Data<AppState>) -> web::Json<ExecutionOutcome> {
    web::Json(state.subscriptions.set_auto_renew(data.enabled).await)
}

#[get("/notifications")]
pub async fn get_notifications(state: web::Data<AppState>) -> web::Json<Vec<Notification>> {
    web::Json(state.notifications.recent())
}

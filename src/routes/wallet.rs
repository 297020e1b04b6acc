use actix_web::{get, post, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::balance::Balance;
use crate::block_chain::utils::{format_address, TransactionResponse};
use crate::config::Network;
use crate::error::AppError;
use crate::wallet::bridge::SignatureRequest;
use crate::wallet::{ConnectRequest, WalletSession};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub session: WalletSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faucet_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub session: WalletSession,
}

#[derive(Debug, Deserialize)]
pub struct NetworkRequest {
    pub network: Network,
}

/// Answer from the browser wallet: the executed transaction or a rejection.
#[derive(Debug, Deserialize)]
pub struct SignatureAnswer {
    pub response: Option<TransactionResponse>,
    pub error: Option<String>,
}

fn wallet_response(state: &AppState) -> WalletResponse {
    let session = state.wallet.session();
    let network_config = state.config.network_config(session.network).ok();
    let address = session.connected_address();

    WalletResponse {
        short_address: address.map(|a| format_address(a, 6, 4)),
        explorer_url: address.zip(network_config).map(|(a, c)| c.address_url(session.network, a)),
        faucet_url: network_config.and_then(|c| c.faucet_url.clone()),
        session,
    }
}

#[get("/wallet")]
pub async fn get_wallet(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(wallet_response(&state))
}

#[post("/wallet/connect")]
pub async fn connect_wallet(data: web::Json<ConnectRequest>, state: web::Data<AppState>) -> impl Responder {
    let success = state.wallet.connect(data.into_inner()).await;
    HttpResponse::Ok().json(ActionResponse {
        success,
        session: state.wallet.session(),
    })
}

#[post("/wallet/disconnect")]
pub async fn disconnect_wallet(state: web::Data<AppState>) -> impl Responder {
    let success = state.wallet.disconnect().await;
    HttpResponse::Ok().json(ActionResponse {
        success,
        session: state.wallet.session(),
    })
}

#[post("/wallet/network")]
pub async fn switch_network(
    data: web::Json<NetworkRequest>,
    state: web::Data<AppState>,
) -> Result<web::Json<WalletResponse>, AppError> {
    state.wallet.switch_network(data.network)?;
    Ok(web::Json(wallet_response(&state)))
}

#[get("/wallet/requests")]
pub async fn list_signature_requests(state: web::Data<AppState>) -> web::Json<Vec<SignatureRequest>> {
    web::Json(state.bridge.pending_requests())
}

#[post("/wallet/requests/{id}")]
pub async fn answer_signature_request(
    path: web::Path<Uuid>,
    data: web::Json<SignatureAnswer>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let outcome = match data.into_inner() {
        SignatureAnswer { response: Some(response), .. } => Ok(response),
        SignatureAnswer { error: Some(error), .. } => Err(error),
        _ => return Err(AppError::BadRequest("either response or error is required".to_string())),
    };
    state.bridge.resolve(path.into_inner(), outcome)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
}

#[get("/balance")]
pub async fn get_balance(state: web::Data<AppState>) -> web::Json<Balance> {
    web::Json(state.balance.current())
}

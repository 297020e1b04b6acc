use actix_web::{get, web};

use crate::access::AccessReport;
use crate::app::AppState;
use crate::block_chain::utils::now_ms;
use crate::error::AppError;
use crate::subscription::query::SubscriptionState;
use crate::transactions::builder::parse_tier;

// Never blocks on the chain: an unresolved subscription reports `unknown`
// and starts a resolution.
#[get("/access/{required_tier}")]
pub async fn check_access(
    path: web::Path<u8>,
    state: web::Data<AppState>,
) -> Result<web::Json<AccessReport>, AppError> {
    let required = parse_tier(path.into_inner()).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let session = state.wallet.session();
    let address = session.connected_address();
    let status = state.query.status(session.network, address);
    if let (SubscriptionState::Loading, Some(address)) = (&status, address) {
        state.query.resolve_in_background(session.network, address);
    }

    Ok(web::Json(AccessReport::new(&status, required, now_ms())))
}

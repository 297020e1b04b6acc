use actix_web::{post, web};

use crate::app::AppState;
use crate::transactions::executor::ExecutionOutcome;

#[post("/content/{id}/view")]
pub async fn view_content(path: web::Path<String>, state: web::Data<AppState>) -> web::Json<ExecutionOutcome> {
    web::Json(state.subscriptions.view_content(&path.into_inner()).await)
}

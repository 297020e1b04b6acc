pub mod access;
pub mod content;
pub mod subscription;
pub mod wallet;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(wallet::get_wallet)
        .service(wallet::connect_wallet)
        .service(wallet::disconnect_wallet)
        .service(wallet::switch_network)
        .service(wallet::list_signature_requests)
        .service(wallet::answer_signature_request)
        .service(wallet::get_balance)
        .service(subscription::get_tiers)
        .service(subscription::get_subscription)
        .service(subscription::subscribe)
        .service(subscription::renew)
        .service(subscription::cancel)
        .service(subscription::set_auto_renew)
        .service(subscription::get_notifications)
        .service(access::check_access)
        .service(content::view_content);
}

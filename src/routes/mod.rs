use actix_web::web;

pub mod backend_health;
pub mod invitations;

use crate::middleware::auth::AuthMiddleware;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    // Invitation routes (require authentication)
    cfg.service(
        web::scope("/invitations")
            .wrap(AuthMiddleware)
            .configure(invitations::init_invitation_routes)
    );
}

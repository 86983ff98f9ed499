use actix_web::web;

use crate::handlers::invitation_handler;

pub fn init_invitation_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(invitation_handler::list_invitations))
    )
    .service(
        web::resource("/{token}/accept")
            .route(web::post().to(invitation_handler::accept_invitation))
    )
    .service(
        web::resource("/{token}/decline")
            .route(web::post().to(invitation_handler::decline_invitation))
    );
}

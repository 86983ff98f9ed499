use actix_web::{get, HttpResponse, Responder};

#[get("/backend_health")]
async fn backend_health() -> impl Responder {
    HttpResponse::Ok().finish()
}

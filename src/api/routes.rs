use actix_web::web;

use super::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/patients", web::get().to(handlers::list_patients))
            .route("/patients/{patient_id}", web::get().to(handlers::get_patient))
            .route("/readings/{patient_id}", web::get().to(handlers::recent_readings)),
    );
}

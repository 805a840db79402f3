use actix_web::{web, HttpResponse};

use crate::error::ApiError;
use crate::AppState;

/// Fixed cap on the recent-readings query; there is no further pagination.
pub const RECENT_READINGS_CAP: i64 = 100;

pub async fn list_patients(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let patients = state.db.list_patients().await?;
    Ok(HttpResponse::Ok().json(patients))
}

pub async fn get_patient(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let patient_id = path.into_inner();
    let patient = state
        .db
        .get_patient(&patient_id)
        .await?
        .ok_or(ApiError::PatientNotFound)?;
    Ok(HttpResponse::Ok().json(patient))
}

pub async fn recent_readings(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let patient_id = path.into_inner();
    let readings = state
        .db
        .recent_readings(&patient_id, RECENT_READINGS_CAP)
        .await?;
    Ok(HttpResponse::Ok().json(readings))
}

//! Workout catalog handlers. The catalog is static content served from
//! `repset_core`, not user data.

use axum::Json;
use axum::extract::Path;
use repset_core::workouts::{self, WorkoutKind, WorkoutRoutine};

use crate::error::{AppError, AppResult};

/// `GET /workouts` — all routines, in dashboard order.
pub async fn list_workouts_handler() -> Json<Vec<WorkoutRoutine>> {
    Json(workouts::catalog())
}

/// `GET /workouts/{kind}` — one routine by slug.
pub async fn get_workout_handler(Path(kind): Path<String>) -> AppResult<Json<WorkoutRoutine>> {
    let kind: WorkoutKind = kind
        .parse()
        .map_err(|_| AppError::NotFound(format!("No workout named {kind}")))?;
    Ok(Json(workouts::routine(kind)))
}

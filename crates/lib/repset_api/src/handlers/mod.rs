//! HTTP request handlers.

pub mod auth;
pub mod health;
pub mod profiles;
pub mod storage;
pub mod workouts;

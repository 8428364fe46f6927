// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware inserts the caller's AuthUser

pub mod activity;
pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod leads;
pub mod tasks;

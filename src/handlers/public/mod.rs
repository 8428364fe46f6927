// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition only: login and refresh.

pub mod auth;

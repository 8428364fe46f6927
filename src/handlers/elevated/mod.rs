// handlers/elevated/mod.rs - Admin-only routes, behind jwt_auth then require_admin

pub mod leads; // POST /api/leads/:id/reassign
pub mod users; // /api/auth/users, POST /api/auth/register

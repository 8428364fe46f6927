// handlers/protected/leads/mod.rs - /api/leads

pub mod actions; // convert, restore
pub mod collection; // GET/POST /api/leads
pub mod record; // GET/PATCH/DELETE /api/leads/:id

pub use actions::{convert_post, restore_post};
pub use collection::{leads_get, leads_post};
pub use record::{lead_delete, lead_get, lead_patch};

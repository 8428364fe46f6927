// handlers/protected/customers/mod.rs - /api/customers

pub mod collection; // GET/POST /api/customers
pub mod notes; // POST /api/customers/:id/notes
pub mod record; // GET/PATCH/DELETE /api/customers/:id

pub use collection::{customers_get, customers_post};
pub use notes::note_post;
pub use record::{customer_delete, customer_get, customer_patch};

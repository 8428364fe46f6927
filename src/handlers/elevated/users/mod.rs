// handlers/elevated/users/mod.rs - User administration

pub mod create; // POST /api/auth/register
pub mod delete; // DELETE /api/auth/users/:id
pub mod list; // GET /api/auth/users
pub mod show; // GET /api/auth/users/:id
pub mod update; // PATCH /api/auth/users/:id

pub use create::register_post;
pub use delete::user_delete;
pub use list::users_get;
pub use show::user_get;
pub use update::user_patch;

// handlers/protected/tasks/mod.rs - /api/tasks

pub mod collection; // GET/POST /api/tasks
pub mod record; // GET/PATCH/DELETE /api/tasks/:id

pub use collection::{tasks_get, tasks_post};
pub use record::{task_delete, task_get, task_patch};

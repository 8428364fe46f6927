pub mod extract;
pub mod pagination;
pub mod validation;

pub use extract::{parse_param, ApiJson, ApiPath, ApiQuery};
pub use pagination::{Page, Pagination};
pub use validation::{FieldError, Validate, Validator};

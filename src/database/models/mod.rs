/// Declares a closed set of string-valued variants with matching serde names,
/// `as_str`, `Display` and a case-insensitive `FromStr`. The stored column
/// value and the JSON value are the same string.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| format!("unknown {} '{}'", stringify!($name), s))
            }
        }
    };
}

pub mod activity;
pub mod customer;
pub mod lead;
pub mod task;
pub mod user;

pub use activity::{Activity, ActivityFilter, ActivityType, EntityType};
pub use customer::{Customer, CustomerFilter, CustomerSummary, CustomerUpdate, NewCustomer, NewNote, Note};
pub use lead::{HistoryAction, HistoryEntry, Lead, LeadFilter, LeadStatus, LeadUpdate, NewLead, ReassignLead};
pub use task::{NewTask, RelatedRef, RelatedType, Task, TaskFilter, TaskPriority, TaskStatus, TaskUpdate, TaskView};
pub use user::{NewUser, RefreshToken, Role, User, UserFilter, UserUpdate};

mod authed;
mod with_db;

pub use authed::{authed, authed_is_of_kind, Caller, Forbidden, Role, Unauthorized};
pub use with_db::with_db;

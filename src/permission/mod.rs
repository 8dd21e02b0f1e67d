pub mod directory;
pub mod resolver;
pub mod scope_filter;

pub use directory::{StudentDirectory, StudentPage, StudentQuery};
pub use resolver::{PermissionResolver, Scope};
pub use scope_filter::{ScopeFilter, StudentPredicate};

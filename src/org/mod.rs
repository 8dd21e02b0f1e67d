pub mod service;
pub mod tree;

pub use service::OrgService;
pub use tree::{CollegeNode, MajorNode, OrgTree, OrgTreeBuilder};

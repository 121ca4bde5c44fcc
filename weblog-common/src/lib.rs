pub mod content;
pub mod model;
pub mod pagination;
pub mod password;

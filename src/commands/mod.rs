//! CLI commands implementation

pub mod ask;
pub mod delete;
pub mod init;
pub mod list;
pub mod status;
pub mod upload;

pub use ask::*;
pub use delete::*;
pub use init::*;
pub use list::*;
pub use status::*;
pub use upload::*;

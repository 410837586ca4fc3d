//! Command implementations for ArcView CLI.

pub mod create;
pub mod extract;
pub mod hash;
pub mod info;
pub mod list;
pub mod test;

pub use create::{CreateFormat, cmd_create};
pub use extract::{ExtractOptions, OverwriteArg, PathModeArg, cmd_extract};
pub use hash::cmd_hash;
pub use info::cmd_info;
pub use list::cmd_list;
pub use test::cmd_test;

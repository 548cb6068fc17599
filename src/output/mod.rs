//! Output naming and placement.

pub mod collision;
pub mod naming;

pub use collision::resolve_output_path;
pub use naming::{output_base_name, NameTokens};

pub mod hcl;
pub mod render;

pub use render::{render, resource_label};

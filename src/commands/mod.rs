pub mod export;
pub mod list;

pub use export::ExportCommand;
pub use list::ListCommand;

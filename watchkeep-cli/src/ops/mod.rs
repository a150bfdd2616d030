mod actions;
mod output;
mod runtime;
mod status;
pub mod ui;

pub use actions::run_action;
pub use output::OutputFormat;
pub use runtime::{alive, id, ping, quit, validate};
pub use status::show_status;

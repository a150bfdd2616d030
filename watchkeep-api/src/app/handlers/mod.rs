mod doaction;
mod home;
mod info;
mod runtime;
mod service;
mod status;

pub use doaction::do_action;
pub use home::home;
pub use info::{about, alive, get_id, handler_404, ping};
pub use runtime::{runtime, runtime_action, view_log};
pub use service::{service_action, service_page};
pub use status::{status, status2};

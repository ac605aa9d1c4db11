//! Use case layer: application workflows and orchestration.

pub mod bootstrap;
pub mod context;
pub mod contracts;
pub mod logout;
pub mod send_message;
pub mod shell;
pub mod sign_in;
pub mod startup;
pub mod watch_messages;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}

//! Domain layer: core entities and view state rules.

pub mod composer_state;
pub mod events;
pub mod message;
pub mod message_input_state;
pub mod message_list_state;
pub mod session;
pub mod shell_state;
pub mod status;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}

//! Firebase integration: Google sign-in, token refresh and the Firestore room collection.

mod auth;
mod backend;
mod firestore;
mod live_query;

pub use backend::FirebaseBackend;

/// Returns the firebase module name for smoke checks.
pub fn module_name() -> &'static str {
    "firebase"
}

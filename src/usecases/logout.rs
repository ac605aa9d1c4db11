use crate::{
    infra::{contracts::SessionStore, error::AppError},
    usecases::sign_in::{SessionProvider, SignOutSourceError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub session_removed: bool,
}

/// Signs out through the provider when one could be built, otherwise clears local state only.
pub fn logout_and_reset(
    provider: Option<&dyn SessionProvider>,
    store: &dyn SessionStore,
) -> Result<LogoutOutcome, AppError> {
    let provider_removed = match provider {
        Some(provider) => match provider.sign_out() {
            Ok(removed) => removed,
            Err(SignOutSourceError::StorageUnavailable) => {
                tracing::warn!(
                    code = "LOGOUT_PROVIDER_STORAGE_FAILED",
                    "provider sign-out could not clear storage, clearing directly"
                );
                false
            }
        },
        None => false,
    };

    let store_removed = store.clear()?;

    Ok(LogoutOutcome {
        session_removed: provider_removed || store_removed,
    })
}

/// Health of the live query as seen by the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncHealth {
    Idle,
    Waiting,
    Ok,
    Degraded,
}

impl SyncHealth {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Idle => "SYNC_IDLE",
            Self::Waiting => "SYNC_WAITING",
            Self::Ok => "SYNC_OK",
            Self::Degraded => "SYNC_DEGRADED",
        }
    }
}

/// What the user must do to finish the provider-hosted sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInPrompt {
    pub verification_url: String,
    pub user_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInFailure {
    /// The user declined consent on the provider page.
    Denied,
    /// The device code expired before the user finished.
    Expired,
    Timeout,
    /// OAuth client or Firebase project settings were rejected.
    Misconfigured,
    Transient,
}

impl SignInFailure {
    pub fn code(self) -> &'static str {
        match self {
            Self::Denied => "AUTH_DENIED",
            Self::Expired => "AUTH_EXPIRED",
            Self::Timeout => "AUTH_TIMEOUT",
            Self::Misconfigured => "AUTH_MISCONFIGURED",
            Self::Transient => "AUTH_TRANSIENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    Unauthorized,
    Denied,
    Unavailable,
    InvalidData,
}

impl StoreFailure {
    pub fn code(self) -> &'static str {
        match self {
            Self::Unauthorized => "STORE_UNAUTHORIZED",
            Self::Denied => "STORE_DENIED",
            Self::Unavailable => "STORE_UNAVAILABLE",
            Self::InvalidData => "STORE_INVALID_DATA",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignInStatus {
    #[default]
    Idle,
    Starting,
    AwaitingUser(SignInPrompt),
    Failed(SignInFailure),
}

impl SignInStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Starting | Self::AwaitingUser(_))
    }
}

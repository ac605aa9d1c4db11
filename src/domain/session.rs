/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Session {
    pub fn new(
        uid: impl Into<String>,
        display_name: impl Into<String>,
        avatar_url: Option<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            avatar_url,
        }
    }
}

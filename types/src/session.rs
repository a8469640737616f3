use std::fmt;

/// Credentials the script server expects in every request path.
///
/// Passed explicitly to whoever talks to the server; there is no ambient
/// session singleton.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionContext {
    access_token: String,
    user_id: String,
}

impl SessionContext {
    #[must_use]
    pub fn new(access_token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Path segments prefixed to every endpoint: `{token}/{user}`.
    #[must_use]
    pub fn path_segments(&self) -> [&str; 2] {
        [self.access_token.as_str(), self.user_id.as_str()]
    }
}

// Manual Debug impl to prevent leaking the access token in logs.
impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.access_token.is_empty() {
            "None"
        } else {
            "[REDACTED]"
        };
        f.debug_struct("SessionContext")
            .field("access_token", &token)
            .field("user_id", &self.user_id)
            .finish()
    }
}

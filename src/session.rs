use serde::Serialize;

/// Login state of the visitor, as reported by the service for the current session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoginState {
    LoggedOut,
    LoggedIn,
    /// The session is about to expire and can be silently renewed with a redirect.
    Renewable,
}

impl LoginState {
    /// Map the integer status returned by the login status endpoint.
    ///
    /// Unknown codes are treated as logged out.
    pub fn from_status(status: i64) -> LoginState {
        match status {
            1 => LoginState::LoggedIn,
            2 => LoginState::Renewable,
            _ => LoginState::LoggedOut,
        }
    }

    /// Whether hits may be reported for this state. A renewable session counts as logged in.
    pub fn is_logged_in(self) -> bool {
        !matches!(self, LoginState::LoggedOut)
    }
}

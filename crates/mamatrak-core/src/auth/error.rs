use std::error::Error as StdError;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Why a sign-in attempt did not produce a session.
///
/// Only [`SignInError::Rejected`] with a server message is shown to the user
/// verbatim; every other case maps to the generic fallback message.
#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    /// Another attempt is still waiting on the Auth API.
    #[error("a sign-in attempt is already in progress")]
    InProgress,

    /// The Auth API answered with a non-2xx status.
    #[error("sign-in rejected (HTTP {status})")]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The request never produced a response.
    #[error("sign-in request failed")]
    Transport(#[source] BoxError),

    /// 2xx response whose body is not a session.
    #[error("sign-in response was malformed")]
    MalformedResponse(#[source] serde_json::Error),

    /// Signed in, but the session could not be stored.
    #[error("failed to store session")]
    Storage(#[source] BoxError),
}

impl SignInError {
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Server-provided message, if this is a rejection that carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }

    /// Text for the error banner.
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.server_message().unwrap_or(fallback)
    }

    /// Full cause chain, for logs only.
    pub fn diagnostic(&self) -> String {
        let mut out = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_rejection_message_is_shown_verbatim() {
        let err = SignInError::Rejected {
            status: 401,
            message: Some("Invalid username or password".to_string()),
        };
        assert_eq!(err.user_message("fallback"), "Invalid username or password");
    }

    #[test]
    fn test_rejection_without_message_uses_fallback() {
        let err = SignInError::Rejected {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message("Invalid credentials"), "Invalid credentials");
    }

    #[test]
    fn test_transport_cause_stays_out_of_user_message() {
        let err = SignInError::transport(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert_eq!(err.user_message("Invalid credentials"), "Invalid credentials");
        assert_eq!(
            err.diagnostic(),
            "sign-in request failed: connection refused"
        );
    }
}

use std::fmt;

/// Input rejected before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsError {
    #[error("Email or phone number is required")]
    MissingIdentifier,
    #[error("Password is required")]
    MissingSecret,
}

/// Identifier (email or phone) and password for one sign-in attempt.
///
/// Never persisted; `Debug` redacts the secret.
#[derive(Clone)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    /// Validates required fields. The identifier is trimmed; the secret is
    /// kept verbatim.
    ///
    /// # Errors
    /// Returns an error if either field is empty.
    pub fn new(
        identifier: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let identifier = identifier.into().trim().to_string();
        let secret = secret.into();

        if identifier.is_empty() {
            return Err(CredentialsError::MissingIdentifier);
        }
        if secret.is_empty() {
            return Err(CredentialsError::MissingSecret);
        }

        Ok(Self { identifier, secret })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

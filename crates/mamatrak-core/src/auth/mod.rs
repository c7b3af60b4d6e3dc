//! Sign-in flow: credentials, the Auth API client, feedback banners and the
//! authenticator state machine that ties them to session storage and
//! post-login navigation.

mod api;
mod authenticator;
mod credentials;
mod error;
mod feedback;
mod schedule;

pub use api::{AuthApi, HttpAuthApi, SIGNIN_PATH, SignInResponse};
pub use authenticator::{AuthPhase, AuthSettings, SessionAuthenticator};
pub use credentials::{Credentials, CredentialsError};
pub use error::{BoxError, SignInError};
pub use feedback::{Feedback, FeedbackState};
pub use schedule::ScheduledTask;

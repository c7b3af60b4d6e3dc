//! Sign-in state machine.
//!
//! ```text
//! Idle/Failed/Success --attempt--> Submitting --2xx--> Success --delay--> Idle
//!                                       \--error--> Failed
//! ```
//!
//! One request at a time; a successful attempt writes the session once and
//! schedules one navigation. Feedback banners expire on their own. All timers
//! belong to the authenticator and die with it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;

use super::api::{AuthApi, SignInResponse};
use super::credentials::Credentials;
use super::error::SignInError;
use super::feedback::{Feedback, FeedbackState};
use super::schedule::ScheduledTask;
use crate::config::AuthConfig;
use crate::navigate::{DASHBOARD_ROUTE, Navigator};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Idle,
    Submitting,
    Success,
    Failed,
}

impl AuthPhase {
    /// Whether the submit control is enabled.
    pub fn accepts_submit(self) -> bool {
        !matches!(self, AuthPhase::Submitting)
    }
}

/// Timing and text knobs for the sign-in flow.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub navigate_delay: Duration,
    pub feedback_timeout: Duration,
    pub fallback_error_message: String,
    pub success_message: String,
    pub dashboard_route: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for AuthSettings {
    fn from(config: &AuthConfig) -> Self {
        Self {
            navigate_delay: config.navigate_delay(),
            feedback_timeout: config.feedback_timeout(),
            fallback_error_message: config.fallback_error_message.clone(),
            success_message: config.success_message.clone(),
            dashboard_route: DASHBOARD_ROUTE.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    phase: AuthPhase,
    feedback: FeedbackState,
}

#[derive(Debug, Default)]
struct Timers {
    feedback: Option<ScheduledTask>,
    navigations: Vec<ScheduledTask>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Returns the phase to `Idle` if an attempt is dropped mid-request.
struct SubmitGuard<'a> {
    shared: &'a Mutex<Shared>,
    armed: bool,
}

impl SubmitGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut shared = lock(self.shared);
        if shared.phase == AuthPhase::Submitting {
            shared.phase = AuthPhase::Idle;
            tracing::debug!("sign-in attempt abandoned");
        }
    }
}

/// Owns one sign-in form's worth of state.
pub struct SessionAuthenticator<A, S> {
    api: A,
    store: S,
    navigator: Arc<dyn Navigator>,
    settings: AuthSettings,
    shared: Arc<Mutex<Shared>>,
    timers: Mutex<Timers>,
}

impl<A: AuthApi, S: SessionStore> SessionAuthenticator<A, S> {
    pub fn new(api: A, store: S, navigator: Arc<dyn Navigator>, settings: AuthSettings) -> Self {
        Self {
            api,
            store,
            navigator,
            settings,
            shared: Arc::new(Mutex::new(Shared::default())),
            timers: Mutex::new(Timers::default()),
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn phase(&self) -> AuthPhase {
        lock(&self.shared).phase
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.phase().accepts_submit()
    }

    /// The banner currently showing, if any.
    pub fn feedback(&self) -> Option<Feedback> {
        lock(&self.shared).feedback.current().cloned()
    }

    /// Runs one sign-in attempt.
    ///
    /// On success the session has been stored and a navigation is pending.
    /// On failure the error banner is already showing; the returned error is
    /// for callers that want the classification.
    ///
    /// # Errors
    /// [`SignInError::InProgress`] if another attempt is outstanding (no
    /// request is made and feedback is untouched); otherwise the reason the
    /// attempt failed.
    pub async fn attempt_sign_in(&self, credentials: &Credentials) -> Result<Session, SignInError> {
        {
            let mut shared = lock(&self.shared);
            if shared.phase == AuthPhase::Submitting {
                tracing::debug!("sign-in already in progress; ignoring submit");
                return Err(SignInError::InProgress);
            }
            shared.phase = AuthPhase::Submitting;
            shared.feedback.clear();
        }
        lock(&self.timers).feedback = None;

        let guard = SubmitGuard {
            shared: &self.shared,
            armed: true,
        };

        tracing::info!(identifier = %credentials.identifier(), "signing in");
        let result = match self.api.sign_in(credentials).await {
            Ok(response) => self.store_session(response),
            Err(err) => Err(err),
        };
        guard.disarm();

        match result {
            Ok((session, message)) => {
                self.on_success(&session, message);
                Ok(session)
            }
            Err(err) => {
                self.on_failure(&err);
                Err(err)
            }
        }
    }

    /// Clears the banner now and cancels its timer.
    pub fn dismiss_feedback(&self) -> bool {
        let cleared = lock(&self.shared).feedback.clear();
        if let Some(task) = lock(&self.timers).feedback.take() {
            task.cancel();
        }
        cleared
    }

    /// The stored session, if any.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn current_session(&self) -> Result<Option<Session>> {
        self.store.get()
    }

    /// Removes the stored session. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn sign_out(&self) -> Result<bool> {
        let removed = self.store.clear()?;
        if removed {
            tracing::info!("signed out");
        }
        Ok(removed)
    }

    /// Waits until every pending navigation has fired.
    pub async fn wait_for_navigation(&self) {
        let pending = std::mem::take(&mut lock(&self.timers).navigations);
        for task in pending {
            task.wait().await;
        }
    }

    /// Cancels all pending timers. Dropping the authenticator does the same.
    pub fn shutdown(&self) {
        let Timers {
            feedback,
            navigations,
        } = std::mem::take(&mut *lock(&self.timers));
        if feedback.is_some() || !navigations.is_empty() {
            tracing::debug!(
                navigations = navigations.len(),
                "canceling pending sign-in timers"
            );
        }
        feedback.into_iter().chain(navigations).for_each(ScheduledTask::cancel);
    }

    fn store_session(
        &self,
        response: SignInResponse,
    ) -> Result<(Session, Option<String>), SignInError> {
        let (session, message) = response.into_parts();
        self.store
            .set(&session)
            .map_err(|err| SignInError::Storage(err.into()))?;
        Ok((session, message))
    }

    fn on_success(&self, session: &Session, message: Option<String>) {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.settings.success_message.clone());

        let generation = {
            let mut shared = lock(&self.shared);
            shared.phase = AuthPhase::Success;
            shared.feedback.show(Feedback::Success(message))
        };
        tracing::info!(role = %session.role, "signed in");

        self.arm_feedback_timer(generation);
        self.schedule_navigation();
    }

    fn on_failure(&self, err: &SignInError) {
        match err {
            SignInError::Rejected {
                status,
                message: Some(_),
            } => tracing::info!(status, "sign-in rejected"),
            other => tracing::warn!(error = %other.diagnostic(), "sign-in failed"),
        }

        let message = err
            .user_message(&self.settings.fallback_error_message)
            .to_string();
        let generation = {
            let mut shared = lock(&self.shared);
            shared.phase = AuthPhase::Failed;
            shared.feedback.show(Feedback::Error(message))
        };

        self.arm_feedback_timer(generation);
    }

    fn arm_feedback_timer(&self, generation: u64) {
        let shared = Arc::clone(&self.shared);
        let task = ScheduledTask::after(self.settings.feedback_timeout, move || {
            if lock(&shared).feedback.expire(generation) {
                tracing::debug!("feedback dismissed");
            }
        });
        // Replacing the handle cancels the previous timer.
        lock(&self.timers).feedback = Some(task);
    }

    fn schedule_navigation(&self) {
        let shared = Arc::clone(&self.shared);
        let navigator = Arc::clone(&self.navigator);
        let route = self.settings.dashboard_route.clone();

        let task = ScheduledTask::after(self.settings.navigate_delay, move || {
            tracing::debug!(route = %route, "navigating");
            navigator.navigate(&route);
            let mut shared = lock(&shared);
            if shared.phase == AuthPhase::Success {
                shared.phase = AuthPhase::Idle;
            }
        });

        let mut timers = lock(&self.timers);
        timers.navigations.retain(|task| !task.is_finished());
        timers.navigations.push(task);
    }
}

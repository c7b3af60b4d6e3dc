//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use mamatrak_core::auth::{AuthSettings, Credentials, HttpAuthApi, SessionAuthenticator};
use mamatrak_core::config::Config;
use mamatrak_core::navigate::{Navigator, resolve_route};
use mamatrak_core::session::{FileSessionStore, SessionStore, mask_token};

use crate::cli::interrupt::InterruptedError;

/// Set to skip launching a browser after sign-in.
const NO_BROWSER_ENV: &str = "MAMATRAK_NO_BROWSER";

/// Opens dashboard routes in the system browser.
struct BrowserNavigator {
    dashboard_url: String,
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, route: &str) {
        let url = match resolve_route(&self.dashboard_url, route) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "cannot resolve dashboard route");
                return;
            }
        };

        println!("Opening {url}");
        if std::env::var(NO_BROWSER_ENV).is_ok() {
            return;
        }
        if let Err(err) = open::that_detached(url.as_str()) {
            tracing::warn!(error = %err, "failed to open browser");
        }
    }
}

pub async fn login(identifier: Option<String>, config: &Config) -> Result<()> {
    let identifier = match identifier {
        Some(identifier) => identifier,
        None => prompt_line("Email or phone number: ")?,
    };
    let password = read_password()?;
    let credentials = Credentials::new(identifier, password)?;

    let settings = AuthSettings::from(&config.auth);
    let redirect = resolve_route(&config.dashboard_url, &settings.dashboard_route)?;
    let delay = settings.navigate_delay;

    let api = HttpAuthApi::new(&config.effective_api_base_url()?)?;
    let store = FileSessionStore::default_location();
    let session_path = store.path().to_path_buf();
    let navigator = Arc::new(BrowserNavigator {
        dashboard_url: config.dashboard_url.clone(),
    });
    let auth = SessionAuthenticator::new(api, store, navigator, settings);

    println!("Signing in as {}...", credentials.identifier());
    if auth.attempt_sign_in(&credentials).await.is_err() {
        let message = auth.feedback().map_or_else(
            || auth.settings().fallback_error_message.clone(),
            |feedback| feedback.message().to_string(),
        );
        anyhow::bail!("{message}");
    }

    let session = auth
        .current_session()?
        .context("Session was not stored")?;
    if let Some(feedback) = auth.feedback() {
        println!("✓ {}", feedback.message());
    }
    println!("  Signed in as {} ({})", session.display_name(), session.role);
    println!("  Session saved to: {}", session_path.display());
    println!("Redirecting to {redirect} in {}s...", delay.as_secs_f64());

    tokio::select! {
        () = auth.wait_for_navigation() => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.context("listen for Ctrl+C")?;
            auth.shutdown();
            println!();
            Err(InterruptedError.into())
        }
    }
}

pub fn logout() -> Result<()> {
    let store = FileSessionStore::default_location();
    if store.clear()? {
        println!("✓ Signed out");
        println!("  Session removed from: {}", store.path().display());
    } else {
        println!("Not signed in (no session found).");
    }
    Ok(())
}

pub fn whoami() -> Result<()> {
    let store = FileSessionStore::default_location();
    let Some(session) = store.get()? else {
        println!("Not signed in.");
        return Ok(());
    };

    println!("{} ({})", session.display_name(), session.role);
    println!("  Email: {}", session.email);
    println!("  Phone: {}", session.phone_number);
    println!("  Community: {}, {}", session.community, session.state);
    println!("  Token: {}", mask_token(&session.access_token));
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    if io::stdin().is_terminal() {
        print!("{prompt}");
        io::stdout().flush()?;
    }
    read_stdin_line()
}

/// Reads the password without echo on a terminal, or one line from piped stdin.
fn read_password() -> Result<String> {
    if io::stdin().is_terminal() {
        return rpassword::prompt_password("Password: ").context("read password");
    }
    read_stdin_line()
}

fn read_stdin_line() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

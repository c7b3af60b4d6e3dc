//! Post-login navigation seam.

use anyhow::{Context, Result};
use url::Url;

/// Route of the authenticated area.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

/// Moves the user to another route of the dashboard.
///
/// Called from a scheduled task, so implementations must not block for long.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &str);
}

/// Resolves a route against the dashboard origin.
///
/// # Errors
/// Returns an error if `base` is not a valid URL.
pub fn resolve_route(base: &str, route: &str) -> Result<Url> {
    let base = Url::parse(base.trim()).with_context(|| format!("Invalid dashboard URL: {base}"))?;
    base.join(route)
        .with_context(|| format!("Invalid dashboard route: {route}"))
}

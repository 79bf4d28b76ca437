//! Shared User-Agent string for resolver and download HTTP clients.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/lap00zza/episode-dl";

/// Default User-Agent for every request the tool sends.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("episode-dl/{version} (+{PROJECT_UA_URL})")
}

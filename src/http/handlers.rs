//! Endpoint handlers.

use std::sync::OnceLock;

/// `GET /api/aloha`
pub async fn aloha() -> String {
    format!("Aloha mai {}", hostname())
}

/// `GET /api/health`
pub async fn health() -> &'static str {
    "I'm ok"
}

/// Host name of this machine, resolved once.
///
/// `HOSTNAME` first, then `/etc/hostname`, else `localhost`.
pub fn hostname() -> &'static str {
    static HOSTNAME: OnceLock<String> = OnceLock::new();
    HOSTNAME.get_or_init(|| {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "localhost".to_string())
    })
}

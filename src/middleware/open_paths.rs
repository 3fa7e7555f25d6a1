//! Open-path classification for the gateway
//!
//! A request path is either open (bypasses authentication entirely) or
//! protected. Both rule tables are static and loaded once; exact matches are
//! checked before prefixes and the first match wins. Prefixes are literal
//! strings, so no pattern compilation or backtracking is involved.

/// Paths that bypass authentication, matched exactly.
const OPEN_EXACT: &[&str] = &[
    "/api/v1/auth/sign-in",
    "/api/v1/auth/login",
    "/api/v1/auth/email-verification/send",
    "/api/v1/auth/email-verification/check",
    "/api/v1/auth/token/refresh",
    "/health",
    "/metrics",
    "/docs",
    "/api-docs/openapi.json",
];

/// Path prefixes that bypass authentication. These routes carry a dynamic
/// trailing segment (a share token, an import id), so only the literal prefix
/// can be matched safely.
const OPEN_PREFIXES: &[&str] = &[
    "/api/v1/auth/terms/accept/",
    "/api/v1/contacts/import/complete/",
    "/api/v1/share-links/",
    "/api/v1/beta-access/",
    "/docs/",
];

/// Returns `true` if the path bypasses authentication.
pub fn is_open(path: &str) -> bool {
    if OPEN_EXACT.contains(&path) {
        return true;
    }
    OPEN_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

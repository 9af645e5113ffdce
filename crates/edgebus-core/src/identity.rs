//! Visitor identity resolution from request or document cookies.

use edgebus_types::cookies::ReadonlyCookies;
use edgebus_types::visitor::Visitor;

/// Resolve the visitor id from a raw `Cookie` header.
///
/// Returns an empty string when the header is absent or empty, or when the
/// named cookie is not present. Missing identity is never an error.
pub fn resolve_visitor_id(cookie_header: Option<&str>, cookie_name: &str) -> String {
    match cookie_header {
        Some(header) if !header.is_empty() => {
            visitor_from_cookies(&ReadonlyCookies::parse(header), cookie_name).id
        }
        _ => String::new(),
    }
}

/// Build a [`Visitor`] from already-parsed cookies.
pub fn visitor_from_cookies(cookies: &ReadonlyCookies, cookie_name: &str) -> Visitor {
    Visitor::new(cookies.get(cookie_name).unwrap_or_default())
}

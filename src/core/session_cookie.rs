//! Session Cookie
//!
//! Extraction of the identity provider's session id from `Set-Cookie`
//! response headers.

use cookie::Cookie;
use std::collections::HashMap;

/// Name of the session cookie issued by the identity provider.
pub const SESSION_COOKIE_NAME: &str = "JSESSIONID";

/// Parse cookie header values into a name to value mapping.
///
/// Each value may hold several `name=value` pairs separated by `;`. Cookie
/// attributes without a value (`HttpOnly`, `Secure`) are skipped. When a name
/// repeats, the first occurrence wins.
pub fn parse_cookies<'a, I>(header_values: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cookies = HashMap::new();

    for header_value in header_values {
        for cookie in Cookie::split_parse(header_value).flatten() {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value().to_string());
        }
    }

    cookies
}

/// Find the non-empty `JSESSIONID` value among `Set-Cookie` header values.
pub fn extract_session_id<'a, I>(set_cookie_values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    parse_cookies(set_cookie_values)
        .remove(SESSION_COOKIE_NAME)
        .filter(|value| !value.is_empty())
}

/// Format the `Cookie` request header carrying a session id.
pub fn session_cookie_header(session_id: &str) -> String {
    format!("{}={}", SESSION_COOKIE_NAME, session_id)
}

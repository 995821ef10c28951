use axum::http::{header::COOKIE, HeaderMap};
use chrono::{DateTime, Duration, Utc};

use super::config::SESSION_COOKIE_NAME;

/// Finds a cookie value in the request's `Cookie` headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value carrying a session token.
///
/// `max_age` is only a hint to the browser; it is unrelated to the token's
/// own expiry.
pub fn build_session_cookie(token: &str, max_age: Duration, now: DateTime<Utc>) -> String {
    let expires = (now + max_age).format("%a, %d %b %Y %H:%M:%S GMT");
    format!(
        "{}={}; Path=/; Max-Age={}; Expires={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE_NAME,
        token,
        max_age.num_seconds(),
        expires
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn build_clear_cookie() -> String {
    format!(
        "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax",
        SESSION_COOKIE_NAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    #[test]
    fn test_extract_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session_token=abc.def.ghi; lang=en"),
        );

        assert_eq!(
            extract_cookie(&headers, "session_token"),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(extract_cookie(&headers, "lang"), Some("en".to_string()));
    }

    #[test]
    fn test_extract_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("session_token=xyz"));

        assert_eq!(
            extract_cookie(&headers, "session_token"),
            Some("xyz".to_string())
        );
    }

    #[test]
    fn test_extract_missing_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_cookie(&headers, "session_token"), None);

        headers.insert(COOKIE, HeaderValue::from_static("session_tokenx=1"));
        assert_eq!(extract_cookie(&headers, "session_token"), None);
    }

    #[test]
    fn test_build_session_cookie() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let cookie = build_session_cookie("abc", Duration::minutes(60), now);

        assert_eq!(
            cookie,
            "session_token=abc; Path=/; Max-Age=3600; Expires=Fri, 01 Mar 2024 13:00:00 GMT; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_build_clear_cookie() {
        let cookie = build_clear_cookie();
        assert!(cookie.starts_with("session_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}

//! Cookies: parsed from `Cookie` request headers, written as `Set-Cookie`.

use std::fmt;

use chrono::{DateTime, Utc};

/// A single cookie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    expires: Option<DateTime<Utc>>,
    path: Option<String>,
    http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            path: None,
            http_only: false,
        }
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn value(&self) -> &str { &self.value }
    pub fn expires_at(&self) -> Option<DateTime<Utc>> { self.expires }

    /// Parses one `Cookie` request header (`a=1; b=2`). Malformed pairs are skipped.
    pub fn parse_header(header: &str) -> Vec<Cookie> {
        header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim().trim_matches('"');
                Some(Cookie::new(name, value))
            })
            .collect()
    }
}

/// The `Set-Cookie` header value.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(at) = self.expires {
            write!(f, "; Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn renders_set_cookie_with_http_date() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let cookie = Cookie::new("username", "jon").path("/").expires(at).http_only(true);
        assert_eq!(
            cookie.to_string(),
            "username=jon; Path=/; Expires=Sun, 18 Oct 2026 09:30:00 GMT; HttpOnly",
        );
    }

    #[test]
    fn parses_request_header_pairs() {
        let cookies = Cookie::parse_header(r#"a=1; junk; b="two" ; =nameless"#);
        assert_eq!(cookies, vec![Cookie::new("a", "1"), Cookie::new("b", "two")]);
    }
}

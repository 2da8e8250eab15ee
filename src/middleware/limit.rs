//! Request body size limit.

use http::header::CONTENT_LENGTH;

use super::Middleware;
use crate::context::Context;
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::middleware::Next;

/// Rejects requests whose body is larger than the limit with `413`.
///
/// Both the declared `content-length` and the received body are checked, so
/// a lying client is caught too.
#[derive(Clone, Copy, Debug)]
pub struct BodyLimit {
    limit: usize,
}

impl BodyLimit {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// `BodyLimit::parse("2M")`, see [`parse_size`].
    pub fn parse(size: &str) -> Option<Self> {
        parse_size(size).map(Self::new)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Middleware for BodyLimit {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture {
        let limit = self.limit;
        let declared = ctx
            .header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let too_large = declared.is_some_and(|n| n > limit as u64) || ctx.body().len() > limit;
        if too_large {
            return Box::pin(async move { Err(Error::PayloadTooLarge { limit }) });
        }
        Box::pin(next.run(ctx))
    }
}

/// Parses a size such as `"2M"`, `"512K"`, `"1.5G"` or `"300"` into bytes.
///
/// Units are binary multiples (`K` = 1024) and case-insensitive; an optional
/// trailing `B` is accepted (`"2MB"`).
pub fn parse_size(size: &str) -> Option<usize> {
    let s = size.trim().to_ascii_uppercase();
    let s = s.strip_suffix('B').unwrap_or(&s);

    let split = s.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let number: f64 = number.parse().ok()?;

    let multiplier: u64 = match unit {
        ""  => 1,
        "K" => 1 << 10,
        "M" => 1 << 20,
        "G" => 1 << 30,
        "T" => 1 << 40,
        "P" => 1 << 50,
        _   => return None,
    };

    let bytes = number * multiplier as f64;
    (bytes.is_finite() && bytes >= 0.0 && bytes <= usize::MAX as f64).then_some(bytes as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_human_sizes() {
        assert_eq!(parse_size("2M"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size("512k"), Some(512 * 1024));
        assert_eq!(parse_size("1.5K"), Some(1536));
        assert_eq!(parse_size("300"), Some(300));
        assert_eq!(parse_size("10MB"), Some(10 * 1024 * 1024));
        assert_eq!(parse_size(" 1G "), Some(1 << 30));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "M", "2X", "two", "-1K", "1.2.3M"] {
            assert_eq!(parse_size(bad), None, "{bad}");
        }
    }
}

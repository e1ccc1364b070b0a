//! Request target parsing module
//!
//! Splits a raw request target (`/user-profile/42?tab=posts`) into ordered
//! path segments and a flat query map.

use std::collections::HashMap;
use url::form_urlencoded;

/// Segment injected when the path yields no segments at all
pub const DEFAULT_SEGMENT: &str = "default";

/// Flat query parameter map (no nested or array keys)
pub type QueryParams = HashMap<String, String>;

/// Parsed request target
///
/// Built once per dispatch and never mutated afterwards. `segments` always
/// holds at least one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    segments: Vec<String>,
    query: QueryParams,
}

impl ParsedRequest {
    /// Parse a raw request target
    ///
    /// Parsing never fails: a missing path maps to `["default"]` and a
    /// missing query string to an empty map. A `#fragment` is ignored.
    pub fn parse(target: &str) -> Self {
        let target = target.split_once('#').map_or(target, |(before, _)| before);
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        Self {
            segments: parse_segments(path),
            query: query.map(parse_query).unwrap_or_default(),
        }
    }

    /// All path segments, first one included
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First path segment, the one that names the handler
    pub fn namespace(&self) -> &str {
        self.segments.first().map_or(DEFAULT_SEGMENT, String::as_str)
    }

    /// Positional parameters: every segment after the first, in order
    pub fn params(&self) -> &[String] {
        self.segments.get(1..).unwrap_or_default()
    }

    pub const fn query(&self) -> &QueryParams {
        &self.query
    }
}

/// Split a path into segments
///
/// Leading slashes and surrounding whitespace are dropped. Collection stops
/// at the first empty segment, so `/a//b` and `/a/` both yield `["a"]`.
fn parse_segments(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = path
        .trim_start_matches('/')
        .trim()
        .split('/')
        .take_while(|segment| !segment.is_empty())
        .map(ToString::to_string)
        .collect();

    if segments.is_empty() {
        segments.push(DEFAULT_SEGMENT.to_string());
    }
    segments
}

/// Decode an `application/x-www-form-urlencoded` query string
///
/// Later duplicates overwrite earlier ones; pairs with an empty key are
/// skipped.
fn parse_query(query: &str) -> QueryParams {
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(target: &str) -> Vec<String> {
        ParsedRequest::parse(target).segments().to_vec()
    }

    #[test]
    fn test_parse_segments() {
        assert_eq!(segments("/user-profile/42"), ["user-profile", "42"]);
        assert_eq!(segments("blog/2024/05"), ["blog", "2024", "05"]);
    }

    #[test]
    fn test_empty_path_yields_default() {
        assert_eq!(segments(""), [DEFAULT_SEGMENT]);
        assert_eq!(segments("/"), [DEFAULT_SEGMENT]);
        assert_eq!(segments("///"), [DEFAULT_SEGMENT]);
        assert_eq!(segments("?tab=posts"), [DEFAULT_SEGMENT]);
        assert_eq!(segments("  "), [DEFAULT_SEGMENT]);
    }

    #[test]
    fn test_truncates_at_first_empty_segment() {
        assert_eq!(segments("/a//b"), ["a"]);
        assert_eq!(segments("/a/"), ["a"]);
        assert_eq!(segments("/a/b//c/d"), ["a", "b"]);
    }

    #[test]
    fn test_parse_query() {
        let request = ParsedRequest::parse("/list?tab=posts&sort=new");
        assert_eq!(request.query().len(), 2);
        assert_eq!(request.query()["tab"], "posts");
        assert_eq!(request.query()["sort"], "new");
    }

    #[test]
    fn test_absent_query_is_empty() {
        assert!(ParsedRequest::parse("/list").query().is_empty());
        assert!(ParsedRequest::parse("/list?").query().is_empty());
    }

    #[test]
    fn test_query_decoding() {
        let request = ParsedRequest::parse("/search?q=hello+world&name=J%C3%BCrgen&q2=&=orphan");
        assert_eq!(request.query()["q"], "hello world");
        assert_eq!(request.query()["name"], "Jürgen");
        assert_eq!(request.query()["q2"], "");
        assert!(!request.query().contains_key(""));
    }

    #[test]
    fn test_duplicate_query_keys_keep_last() {
        let request = ParsedRequest::parse("/?page=1&page=2");
        assert_eq!(request.query()["page"], "2");
    }

    #[test]
    fn test_fragment_is_ignored() {
        let request = ParsedRequest::parse("/docs/intro?lang=en#install");
        assert_eq!(request.segments(), ["docs", "intro"]);
        assert_eq!(request.query()["lang"], "en");
    }

    #[test]
    fn test_params_skip_namespace() {
        assert_eq!(ParsedRequest::parse("/user-profile/42/posts").params(), ["42", "posts"]);
        assert!(ParsedRequest::parse("/user-profile").params().is_empty());
        assert!(ParsedRequest::parse("/").params().is_empty());
    }

    #[test]
    fn test_namespace() {
        assert_eq!(ParsedRequest::parse("/error/500").namespace(), "error");
        assert_eq!(ParsedRequest::parse("/").namespace(), DEFAULT_SEGMENT);
    }
}

//! Pure response-header parsing used by the probe and the transfer engine.

use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap,
};

use fdl_core::DEFAULT_MIME_TYPE;

/// Name used when neither the headers nor the URL yield one.
pub const FALLBACK_FILE_NAME: &str = "download";

/// Parsed `Content-Range: bytes <start>-<end>/<total>` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: i64,
    pub end: i64,
    /// `None` for `/*`.
    pub total: Option<i64>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `Content-Length` as a signed byte count, 0 when absent or unparseable.
pub fn content_length(headers: &HeaderMap) -> i64 {
    header_str(headers, &CONTENT_LENGTH)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n >= 0)
        .unwrap_or(0)
}

/// Media type without parameters, lowercased; the generic binary type if absent.
pub fn mime_type(headers: &HeaderMap) -> String {
    header_str(headers, &CONTENT_TYPE)
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

/// Byte-range support: `206` with a `Content-Range`, or `Accept-Ranges: bytes`.
pub fn supports_resume(status: StatusCode, headers: &HeaderMap) -> bool {
    let partial = status == StatusCode::PARTIAL_CONTENT && headers.contains_key(CONTENT_RANGE);
    let advertised = header_str(headers, &ACCEPT_RANGES)
        .is_some_and(|v| v.split(',').any(|unit| unit.trim().eq_ignore_ascii_case("bytes")));
    partial || advertised
}

/// Parse the response's `Content-Range` header.
pub fn content_range(headers: &HeaderMap) -> Option<ContentRange> {
    header_str(headers, &CONTENT_RANGE).and_then(parse_content_range)
}

/// Parse a `bytes <start>-<end>/<total|*>` value.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    let start = start.trim().parse::<i64>().ok()?;
    let end = end.trim().parse::<i64>().ok()?;
    let total = match total.trim() {
        "*" => None,
        n => Some(n.parse::<i64>().ok()?),
    };
    (start <= end).then_some(ContentRange { start, end, total })
}

/// File name from `Content-Disposition`, preferring the RFC 5987 `filename*` form.
pub fn file_name_from_disposition(headers: &HeaderMap) -> Option<String> {
    let value = header_str(headers, &CONTENT_DISPOSITION)?;

    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'lang'percent-encoded
                let encoded = raw.trim().rsplit('\'').next().unwrap_or_default();
                if let Ok(decoded) = urlencoding::decode(encoded.trim_matches('"')) {
                    if let Some(name) = sanitize_file_name(&decoded) {
                        return Some(name);
                    }
                }
            }
            "filename" => plain = sanitize_file_name(raw.trim().trim_matches('"')),
            _ => {}
        }
    }
    plain
}

/// File name from the URL's last non-empty path segment, percent-decoded.
pub fn file_name_from_url(url: &reqwest::Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(segment).map_or_else(|_| segment.to_string(), |s| s.into_owned());
    sanitize_file_name(&decoded)
}

/// Reduce a server- or URL-supplied name to a single safe path component.
///
/// Returns `None` when nothing usable remains.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned.to_string())
    }
}

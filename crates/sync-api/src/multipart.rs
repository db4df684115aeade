//! A small streaming-free `multipart/mixed` reader, just enough to decode
//! `GET /v1/api/file/{id}`'s `metadata` + `file` parts. Deliberately hand
//! rolled rather than pulling in a full multipart crate: the response side
//! of this protocol only ever carries the two parts this module looks for,
//! never nested multipart, never more than a couple of kilobytes of headers.

use std::collections::HashMap;

use crate::to_api_err_msg;
use synctree_reconciler::{ReconcileError, Result};

pub struct MultipartPart {
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl MultipartPart {
    /// The `name="..."` parameter off this part's `Content-Disposition`.
    pub fn name(&self) -> Option<&str> {
        let disposition = self.headers.get("content-disposition")?;
        disposition
            .split(';')
            .map(str::trim)
            .find_map(|segment| segment.strip_prefix("name=").map(|v| v.trim_matches('"')))
    }

    pub fn is_base64(&self) -> bool {
        self.headers
            .get("content-transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("base64"))
    }
}

/// Extracts the `boundary=` parameter from a `Content-Type: multipart/mixed;
/// boundary="..."` header value.
pub fn parse_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|segment| segment.strip_prefix("boundary=").map(|v| v.trim_matches('"').to_string()))
}

/// Splits a multipart body into its constituent parts. `segments[0]` (the
/// preamble before the first boundary) and the final terminal `--` marker
/// plus any epilogue are discarded; everything between is one header block
/// plus a body, separated by a blank line per RFC 2046.
pub fn parse_parts(content_type: &str, body: &[u8]) -> Result<Vec<MultipartPart>> {
    let boundary = parse_boundary(content_type)
        .ok_or_else(|| ReconcileError::Api("multipart response missing boundary parameter".into()))?;
    let delimiter = format!("--{boundary}");
    let segments = split_by(body, delimiter.as_bytes());

    if segments.len() < 3 {
        return Err(ReconcileError::Api("malformed multipart/mixed body: no parts found".into()));
    }

    segments[1..segments.len() - 1].iter().map(|segment| parse_one_part(segment)).collect()
}

fn parse_one_part(segment: &[u8]) -> Result<MultipartPart> {
    let segment = strip_leading_crlf(segment);
    let segment = strip_trailing_crlf(segment);
    let header_end = find_subslice(segment, b"\r\n\r\n")
        .ok_or_else(|| ReconcileError::Api("multipart part missing header/body separator".into()))?;

    let header_bytes = &segment[..header_end];
    let body = &segment[header_end + 4..];

    let header_text = std::str::from_utf8(header_bytes).map_err(to_api_err_msg)?;
    let mut headers = HashMap::new();
    for line in header_text.split("\r\n") {
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    Ok(MultipartPart { headers, body: body.to_vec() })
}

fn strip_leading_crlf(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\r\n".as_slice()).unwrap_or(bytes)
}

fn strip_trailing_crlf(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(b"\r\n".as_slice()).unwrap_or(bytes)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn split_by<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    while let Some(offset) = find_subslice(&haystack[start..], needle) {
        parts.push(&haystack[start..start + offset]);
        start += offset + needle.len();
    }
    parts.push(&haystack[start..]);
    parts
}

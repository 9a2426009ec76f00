//! Codecs between the gateway's wire maps and the canonical containers.
//!
//! # Overview
//! Every gateway shape carries headers and query parameters either as a
//! single-valued map, a multi-valued map-of-lists, or both. The codecs in
//! this module fold that duality into [`MultiMap`] on the way in and produce
//! the shape-appropriate forms on the way out, so the rest of the crate only
//! ever sees one representation.
//!
//! The body codec handles the transfer encoding: incoming bodies may be
//! base64 when the event says so, and outgoing bodies must be base64 when
//! the payload is binary. What counts as binary is decided by a
//! [`BinaryDetector`], which callers can extend with their own content
//! types.

use std::collections::HashMap;

use crate::multimap::MultiMap;

/// Used for any single-valued key-value dict on the wire.
pub type Dict = HashMap<String, String>;

/// Used for any multi-valued key-value dict on the wire.
pub type MultiDict = HashMap<String, Vec<String>>;

/// Folds the dual header maps of an event into one canonical map.
///
/// The multi-valued form, when non-empty, is authoritative: the
/// single-valued form is usually a lossy derivative supplied by the gateway
/// for compatibility, so a disagreement between the two is resolved in favor
/// of the multi-valued form without raising an error. Keys that only appear
/// in the single-valued form are still included.
pub fn decode_headers(single: &Dict, multi: &MultiDict) -> MultiMap {
    let mut headers = MultiMap::case_insensitive();
    for (name, values) in multi {
        for value in values {
            headers.append(name, value.as_str());
        }
    }
    for (name, value) in single {
        if !headers.contains(name) {
            headers.append(name, value.as_str());
        }
    }
    headers
}

/// Produces both header forms for shapes that understand multi-valued
/// headers.
///
/// The single-valued form carries the first value per key so that it agrees
/// with what [`decode_headers`] would reconstruct; the multi-valued form
/// carries everything.
pub fn encode_headers_multi(headers: &MultiMap) -> (Dict, MultiDict) {
    let mut single = Dict::new();
    let mut multi = MultiDict::new();
    for (name, values) in headers.iter() {
        single.insert(name.to_string(), values[0].clone());
        multi.insert(name.to_string(), values.to_vec());
    }
    (single, multi)
}

/// Produces the single-valued header form for shapes without multi-value
/// support, keeping the last value per key per the common gateway
/// convention.
pub fn encode_headers_single(headers: &MultiMap) -> Dict {
    headers
        .iter()
        .filter_map(|(name, values)| {
            values
                .last()
                .map(|value| (name.to_string(), value.clone()))
        })
        .collect()
}

/// How a gateway shape delivers query parameter values.
///
/// Canonical query values must end up URL-decoded exactly once. Some
/// gateways hand the values over exactly as they appeared on the wire and
/// some decode them first, so each request builder states which treatment
/// its shape needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryEncoding {
    /// Values are exactly as received on the wire; apply one decode pass.
    Raw,
    /// Values were already decoded by the gateway; touching them again
    /// would corrupt payloads such as a literal `%2B`.
    Decoded,
}

/// Folds the dual query maps of an event into one canonical map, applying
/// the decode treatment the shape calls for.
///
/// Multi-valued entries win over single-valued ones exactly like
/// [`decode_headers`]. Query keys are case-sensitive.
pub fn decode_query(single: &Dict, multi: &MultiDict, encoding: QueryEncoding) -> MultiMap {
    let mut query = MultiMap::new();
    for (name, values) in multi {
        let name = decode_query_component(name, encoding);
        for value in values {
            query.append(&name, decode_query_component(value, encoding));
        }
    }
    for (name, value) in single {
        let name = decode_query_component(name, encoding);
        if !query.contains(&name) {
            query.append(&name, decode_query_component(value, encoding));
        }
    }
    query
}

/// One decode pass over a query key or value: `+` means space, then
/// percent-escapes. Malformed escapes are kept as-is instead of failing the
/// whole request.
fn decode_query_component(component: &str, encoding: QueryEncoding) -> String {
    match encoding {
        QueryEncoding::Decoded => component.to_string(),
        QueryEncoding::Raw => {
            let unplused = component.replace('+', " ");
            match urlencoding::decode(&unplused) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => unplused,
            }
        }
    }
}

/// Decodes an incoming event body into payload bytes.
///
/// A body marked base64 is decoded, anything else is taken verbatim as
/// UTF-8 text. A missing body is an empty payload.
pub fn decode_body(
    body: Option<&str>,
    is_base64_encoded: bool,
) -> Result<Vec<u8>, base64::DecodeError> {
    match body {
        None => Ok(Vec::new()),
        Some(body) if is_base64_encoded => base64::decode(body),
        Some(body) => Ok(body.as_bytes().to_vec()),
    }
}

/// Decides whether an outgoing body must be transferred as base64.
///
/// A body is binary when its declared content type matches one of the
/// registered entries, or, absent a match, when the bytes are not valid
/// UTF-8 text. Entries ending in `/` match a whole type family.
///
/// # Example
/// ```
/// use lambda_api_proxy::codec::BinaryDetector;
///
/// let mut detector = BinaryDetector::new();
/// detector.register("application/wasm");
/// assert!(detector.is_binary(Some("application/wasm"), b"\0asm"));
/// assert!(detector.is_binary(Some("image/png"), b"..."));
/// assert!(!detector.is_binary(Some("application/json"), b"{}"));
/// ```
#[derive(Debug, Clone)]
pub struct BinaryDetector {
    content_types: Vec<String>,
}

impl BinaryDetector {
    /// Creates a detector seeded with the common binary content types:
    /// octet-stream, pdf, zip, gzip, and the image/audio/video/font
    /// families.
    pub fn new() -> Self {
        Self {
            content_types: [
                "application/octet-stream",
                "application/pdf",
                "application/zip",
                "application/gzip",
                "image/",
                "audio/",
                "video/",
                "font/",
            ]
            .iter()
            .map(|content_type| content_type.to_string())
            .collect(),
        }
    }

    /// Creates a detector from an explicit list, replacing the default set.
    pub fn with_content_types<I, S>(content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content_types: content_types
                .into_iter()
                .map(|content_type| content_type.into().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Registers an additional content type (or type family ending in `/`).
    pub fn register(&mut self, content_type: impl Into<String>) {
        self.content_types
            .push(content_type.into().to_ascii_lowercase());
    }

    /// Whether a body with the given declared content type must be
    /// base64-encoded.
    pub fn is_binary(&self, content_type: Option<&str>, body: &[u8]) -> bool {
        if let Some(content_type) = content_type {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase();
            if self.content_types.iter().any(|registered| {
                if registered.ends_with('/') {
                    essence.starts_with(registered.as_str())
                } else {
                    essence == *registered
                }
            }) {
                return true;
            }
        }
        std::str::from_utf8(body).is_err()
    }
}

impl Default for BinaryDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes an outgoing body, returning the wire string and the base64 flag.
pub fn encode_body(
    body: &[u8],
    content_type: Option<&str>,
    binary: &BinaryDetector,
) -> (String, bool) {
    if binary.is_binary(content_type, body) {
        (base64::encode(body), true)
    } else {
        (String::from_utf8_lossy(body).into_owned(), false)
    }
}

/// Guesses a content type from the first bytes a handler writes, for
/// responses that never declared one.
pub(crate) fn sniff_content_type(body: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
    ];
    for (magic, content_type) in SIGNATURES {
        if body.starts_with(magic) {
            return content_type;
        }
    }
    if std::str::from_utf8(body).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

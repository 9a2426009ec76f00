//! The in-memory response writer and the serializers that turn it into the
//! document each gateway family expects.
//!
//! # Overview
//! A gateway invocation cannot stream: the whole response must be
//! materialized before it is returned as one structured document.
//! [`ResponseWriter`] therefore emulates the write-once-then-stream contract
//! of a conventional HTTP response writer over a buffer, as an explicit
//! state machine:
//!
//! ```text
//! Open --first write / flush--> Committed --handler returns--> Closed
//! ```
//!
//! Status and headers are mutable while `Open`; the first body write
//! commits them. Mutations after commit are silent no-ops, mirroring
//! permissive HTTP-library convention, but are counted so a misbehaving
//! handler can be diagnosed. [`ResponseSerializer`] then consumes the
//! writer exactly once and produces the document for the originating shape.

use http::StatusCode;
use serde::Serialize;

use crate::codec::{self, BinaryDetector, Dict, MultiDict};
use crate::event::RequestOrigin;
use crate::multimap::MultiMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    Closed,
}

/// An in-memory sink with the contract of a standard HTTP response writer.
///
/// One writer serves exactly one invocation, written by exactly one handler
/// and consumed exactly once by a serializer; it performs no
/// synchronization of its own.
///
/// # Example
/// ```
/// use http::StatusCode;
/// use lambda_api_proxy::response::ResponseWriter;
///
/// let mut writer = ResponseWriter::new();
/// writer.set_status(StatusCode::CREATED);
/// writer.set_header("Content-Type", "application/json");
/// writer.write(br#"{"id":1}"#);
/// // committed now, this does nothing
/// writer.set_header("X-Late", "ignored");
/// assert_eq!(writer.status(), StatusCode::CREATED);
/// assert!(!writer.headers().contains("x-late"));
/// assert_eq!(writer.discarded_mutations(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: MultiMap,
    body: Vec<u8>,
    state: State,
    discarded: usize,
}

impl ResponseWriter {
    /// Creates an open writer with status 200 and no headers.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: MultiMap::case_insensitive(),
            body: Vec::new(),
            state: State::Open,
            discarded: 0,
        }
    }

    /// The current status. Defaults to 200 until a handler says otherwise.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The headers accumulated so far.
    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    /// The body bytes accumulated so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether the status line and headers have been locked in.
    pub fn is_committed(&self) -> bool {
        self.state != State::Open
    }

    /// How many mutations arrived too late to take effect. Purely
    /// diagnostic.
    pub fn discarded_mutations(&self) -> usize {
        self.discarded
    }

    /// Sets the status. A no-op once the response is committed.
    pub fn set_status(&mut self, status: StatusCode) {
        if self.state == State::Open {
            self.status = status;
        } else {
            self.discarded += 1;
        }
    }

    /// Replaces all values of a header. A no-op once the response is
    /// committed.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        if self.state == State::Open {
            self.headers.set(name, value);
        } else {
            self.discarded += 1;
        }
    }

    /// Adds a value to a header, keeping existing ones. A no-op once the
    /// response is committed.
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        if self.state == State::Open {
            self.headers.append(name, value);
        } else {
            self.discarded += 1;
        }
    }

    /// Appends body bytes, committing the status and headers on the first
    /// call. Returns how many bytes were accepted: everything, or nothing
    /// once the writer is closed.
    pub fn write(&mut self, buf: &[u8]) -> usize {
        match self.state {
            State::Closed => {
                self.discarded += 1;
                0
            }
            State::Open => {
                if !self.headers.contains("content-type") {
                    self.headers
                        .append("Content-Type", codec::sniff_content_type(buf));
                }
                self.state = State::Committed;
                self.body.extend_from_slice(buf);
                buf.len()
            }
            State::Committed => {
                self.body.extend_from_slice(buf);
                buf.len()
            }
        }
    }

    /// Commits the status and headers without writing any body.
    pub fn flush(&mut self) {
        if self.state == State::Open {
            self.state = State::Committed;
        }
    }

    /// Ends the write phase. Called by the adapter when the handler
    /// returns; later writes are discarded.
    pub fn close(&mut self) {
        self.state = State::Closed;
    }

    fn into_parts(self) -> (StatusCode, MultiMap, Vec<u8>) {
        (self.status, self.headers, self.body)
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// The response document for the REST-style gateway.
#[derive(Debug, Clone, Serialize)]
pub struct RestApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Dict,
    #[serde(rename = "multiValueHeaders")]
    pub multi_value_headers: MultiDict,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

/// The response document for the HTTP-style gateway.
///
/// This family has no multi-value header field; `Set-Cookie` values travel
/// in the dedicated `cookies` array and every other repeated header
/// collapses to its last value.
#[derive(Debug, Clone, Serialize)]
pub struct HttpApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Dict,
    pub cookies: Vec<String>,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

/// The response document for the load balancer.
#[derive(Debug, Clone, Serialize)]
pub struct AlbResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "statusDescription")]
    pub status_description: String,
    pub headers: Dict,
    #[serde(rename = "multiValueHeaders")]
    pub multi_value_headers: MultiDict,
    pub body: String,
    #[serde(rename = "isBase64Encoded")]
    pub is_base64_encoded: bool,
}

/// A response document of any of the three families.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GatewayResponse {
    RestApi(RestApiResponse),
    HttpApi(HttpApiResponse),
    Alb(AlbResponse),
}

/// Turns a consumed [`ResponseWriter`] into the document for a shape.
///
/// A writer the handler never wrote to serializes as its status (200 by
/// default) with an empty body; that is a normal response, not an error.
#[derive(Debug, Clone, Default)]
pub struct ResponseSerializer {
    binary: BinaryDetector,
}

impl ResponseSerializer {
    /// Creates a serializer with the default binary-content detection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a serializer with a caller-supplied [`BinaryDetector`].
    pub fn with_binary_detector(binary: BinaryDetector) -> Self {
        Self { binary }
    }

    /// Serializes for whichever shape the request arrived as.
    pub fn serialize(&self, writer: ResponseWriter, origin: RequestOrigin) -> GatewayResponse {
        match origin {
            RequestOrigin::RestApi => GatewayResponse::RestApi(self.rest_api(writer)),
            RequestOrigin::HttpApi => GatewayResponse::HttpApi(self.http_api(writer)),
            RequestOrigin::Alb => GatewayResponse::Alb(self.alb(writer)),
        }
    }

    /// Serializes a REST-style document: both header forms populated, the
    /// single-valued one carrying the first value per key.
    pub fn rest_api(&self, writer: ResponseWriter) -> RestApiResponse {
        let (status, headers, body) = writer.into_parts();
        let (body, is_base64_encoded) =
            codec::encode_body(&body, headers.get("content-type"), &self.binary);
        let (single, multi) = codec::encode_headers_multi(&headers);
        RestApiResponse {
            status_code: status.as_u16(),
            headers: single,
            multi_value_headers: multi,
            body,
            is_base64_encoded,
        }
    }

    /// Serializes an HTTP-style document: `Set-Cookie` values move to the
    /// `cookies` array, remaining headers collapse to their last value.
    pub fn http_api(&self, writer: ResponseWriter) -> HttpApiResponse {
        let (status, mut headers, body) = writer.into_parts();
        let cookies = headers.remove("set-cookie").unwrap_or_default();
        let (body, is_base64_encoded) =
            codec::encode_body(&body, headers.get("content-type"), &self.binary);
        let single = codec::encode_headers_single(&headers);
        HttpApiResponse {
            status_code: status.as_u16(),
            headers: single,
            cookies,
            body,
            is_base64_encoded,
        }
    }

    /// Serializes a load balancer document, including the status
    /// description line the load balancer displays.
    pub fn alb(&self, writer: ResponseWriter) -> AlbResponse {
        let (status, headers, body) = writer.into_parts();
        let (body, is_base64_encoded) =
            codec::encode_body(&body, headers.get("content-type"), &self.binary);
        let (single, multi) = codec::encode_headers_multi(&headers);
        AlbResponse {
            status_code: status.as_u16(),
            status_description: format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            ),
            headers: single,
            multi_value_headers: multi,
            body,
            is_base64_encoded,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_defaults_to_200() {
        let mut writer = ResponseWriter::new();
        writer.write(b"ok");
        writer.close();
        let document = ResponseSerializer::new().rest_api(writer);
        assert_eq!(document.status_code, 200);
    }

    #[test]
    fn untouched_writer_serializes_as_empty_200() {
        let mut writer = ResponseWriter::new();
        writer.close();
        let document = ResponseSerializer::new().rest_api(writer);
        assert_eq!(document.status_code, 200);
        assert_eq!(document.body, "");
        assert!(!document.is_base64_encoded);
        assert!(document.headers.is_empty());
    }

    #[test]
    fn explicit_status_survives_an_empty_body() {
        let mut writer = ResponseWriter::new();
        writer.set_status(StatusCode::NO_CONTENT);
        writer.close();
        let document = ResponseSerializer::new().rest_api(writer);
        assert_eq!(document.status_code, 204);
    }

    #[test]
    fn writes_accumulate() {
        let mut writer = ResponseWriter::new();
        assert_eq!(writer.write(b"hello, "), 7);
        assert_eq!(writer.write(b"world"), 5);
        assert_eq!(writer.body(), b"hello, world");
    }

    #[test]
    fn first_write_commits_headers_and_status() {
        let mut writer = ResponseWriter::new();
        writer.set_header("X-Early", "kept");
        writer.write(b"body");
        writer.set_header("X-Late", "dropped");
        writer.set_status(StatusCode::IM_A_TEAPOT);
        writer.append_header("X-Late", "dropped");

        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.discarded_mutations(), 3);
        writer.close();
        let document = ResponseSerializer::new().rest_api(writer);
        assert_eq!(document.headers["X-Early"], "kept");
        assert!(!document.headers.contains_key("X-Late"));
        assert_eq!(document.status_code, 200);
    }

    #[test]
    fn flush_commits_without_body() {
        let mut writer = ResponseWriter::new();
        writer.flush();
        writer.set_status(StatusCode::NOT_FOUND);
        assert!(writer.is_committed());
        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.discarded_mutations(), 1);
    }

    #[test]
    fn writes_after_close_are_discarded() {
        let mut writer = ResponseWriter::new();
        writer.write(b"kept");
        writer.close();
        assert_eq!(writer.write(b"lost"), 0);
        assert_eq!(writer.body(), b"kept");
        assert_eq!(writer.discarded_mutations(), 1);
    }

    #[test]
    fn missing_content_type_is_sniffed_on_first_write() {
        let mut writer = ResponseWriter::new();
        writer.write(b"\x89PNG\r\n\x1a\nrest");
        assert_eq!(writer.headers().get("content-type"), Some("image/png"));

        let mut writer = ResponseWriter::new();
        writer.set_header("Content-Type", "application/json");
        writer.write(b"{}");
        assert_eq!(
            writer.headers().get("content-type"),
            Some("application/json")
        );
    }

    #[test]
    fn multi_value_headers_stay_consistent_with_single() {
        let mut writer = ResponseWriter::new();
        writer.append_header("X-Multi", "a");
        writer.append_header("X-Multi", "b");
        writer.close();
        let document = ResponseSerializer::new().rest_api(writer);
        assert_eq!(document.headers["X-Multi"], "a");
        assert_eq!(document.multi_value_headers["X-Multi"], vec!["a", "b"]);
    }

    #[test]
    fn binary_body_is_base64_with_flag() {
        let mut writer = ResponseWriter::new();
        writer.set_header("Content-Type", "application/octet-stream");
        writer.write(&[0u8, 1, 2, 3]);
        writer.close();
        let document = ResponseSerializer::new().rest_api(writer);
        assert!(document.is_base64_encoded);
        assert_eq!(document.body, base64::encode([0u8, 1, 2, 3]));
    }

    #[test]
    fn http_api_document_lifts_cookies_and_collapses_headers() {
        let mut writer = ResponseWriter::new();
        writer.append_header("Set-Cookie", "a=1");
        writer.append_header("Set-Cookie", "b=2");
        writer.append_header("X-Version", "1");
        writer.append_header("X-Version", "2");
        writer.close();
        let document = ResponseSerializer::new().http_api(writer);
        assert_eq!(document.cookies, ["a=1", "b=2"]);
        assert!(!document.headers.contains_key("Set-Cookie"));
        assert_eq!(document.headers["X-Version"], "2");
    }

    #[test]
    fn alb_document_carries_a_status_description() {
        let mut writer = ResponseWriter::new();
        writer.set_status(StatusCode::NOT_FOUND);
        writer.close();
        let document = ResponseSerializer::new().alb(writer);
        assert_eq!(document.status_code, 404);
        assert_eq!(document.status_description, "404 Not Found");
    }

    #[test]
    fn rest_api_document_serializes_with_wire_field_names() {
        let mut writer = ResponseWriter::new();
        writer.set_header("X-One", "1");
        writer.write(b"foo");
        writer.close();
        let document = ResponseSerializer::new().rest_api(writer);
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["headers"]["X-One"], "1");
        assert_eq!(json["multiValueHeaders"]["X-One"][0], "1");
        assert_eq!(json["body"], "foo");
        assert_eq!(json["isBase64Encoded"], false);
    }
}

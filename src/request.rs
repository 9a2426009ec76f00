//! The canonical in-process request and the builders that produce it from
//! each gateway shape.

use http::Method;

use crate::codec::{self, Dict, QueryEncoding};
use crate::event::{AlbEvent, GatewayEvent, HttpApiEvent, RequestOrigin, RestApiEvent};
use crate::multimap::MultiMap;

/// Possible errors when building a request from an incoming event.
#[derive(Debug, thiserror::Error)]
pub enum RequestBuildError {
    /// The event carries none of the fields that identify a gateway shape.
    /// Fatal: retrying an unparseable event cannot succeed.
    #[error("event does not match any recognized gateway request shape")]
    UnrecognizedEventShape,
    /// The event declared a base64 body that does not decode.
    #[error("fail to decode base64 body: {0}")]
    MalformedBody(#[from] base64::DecodeError),
    #[error("fail to deserialize event: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("invalid http method '{0}' in the event")]
    InvalidMethod(String),
}

/// The canonical, shape-agnostic request handed to a handler.
///
/// Every semantically significant detail of the incoming event survives
/// here: multi-valued headers and query parameters stay multi-valued, the
/// body is raw bytes regardless of how the gateway transferred it, and
/// [`origin`](ProxyRequest::origin) records which document family the
/// response must be serialized back into.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Uppercase HTTP verb.
    pub method: Method,
    /// URL-decoded path, always with a leading slash.
    pub path: String,
    /// The still-encoded path as it appeared on the wire, when the gateway
    /// supplies it separately.
    pub raw_path: Option<String>,
    /// Ordered multi-value headers, case-insensitive lookup.
    pub headers: MultiMap,
    /// Ordered multi-value query parameters, values decoded exactly once.
    pub query: MultiMap,
    /// Gateway-supplied path parameters, opaque to this crate.
    pub path_parameters: Dict,
    /// Gateway-supplied stage variables, opaque to this crate.
    pub stage_variables: Dict,
    /// Raw payload bytes, possibly empty.
    pub body: Vec<u8>,
    /// Source address reported by the gateway, when known.
    pub source_ip: Option<String>,
    /// Protocol string reported by the gateway, when known.
    pub protocol: Option<String>,
    /// The shape family the event arrived as.
    pub origin: RequestOrigin,
}

impl ProxyRequest {
    /// Builds the canonical request from an already-discriminated event.
    pub fn from_event(event: GatewayEvent) -> Result<Self, RequestBuildError> {
        match event {
            GatewayEvent::RestApi(event) => Self::from_rest_api(event),
            GatewayEvent::HttpApi(event) => Self::from_http_api(event),
            GatewayEvent::Alb(event) => Self::from_alb(event),
        }
    }

    /// Builds the canonical request from a REST-style event.
    ///
    /// The REST gateway decodes query values before delivering them, so
    /// they are taken as-is.
    pub fn from_rest_api(event: RestApiEvent) -> Result<Self, RequestBuildError> {
        let method = parse_method(&event.http_method)?;
        let headers = codec::decode_headers(&event.headers, &event.multi_value_headers);
        let query = codec::decode_query(
            &event.query_string_parameters,
            &event.multi_value_query_string_parameters,
            QueryEncoding::Decoded,
        );
        let body = codec::decode_body(event.body.as_deref(), event.is_base64_encoded)?;
        Ok(Self {
            method,
            path: normalize_path(event.path.as_deref()),
            raw_path: None,
            headers,
            query,
            path_parameters: event.path_parameters,
            stage_variables: event.stage_variables,
            body,
            source_ip: non_empty(event.request_context.identity.source_ip),
            protocol: non_empty(event.request_context.protocol),
            origin: RequestOrigin::RestApi,
        })
    }

    /// Builds the canonical request from an HTTP-style event.
    ///
    /// This shape only carries single-valued maps: a repeated header or
    /// query key arrives with its values joined by commas, so both are
    /// split back apart here. Request cookies arrive in their own array and
    /// are folded into a `Cookie` header so handlers see a conventional
    /// request.
    pub fn from_http_api(event: HttpApiEvent) -> Result<Self, RequestBuildError> {
        let method = parse_method(&event.request_context.http.method)?;

        let mut headers = MultiMap::case_insensitive();
        for (name, value) in &event.headers {
            for part in value.split(',') {
                headers.append(name, part.trim_start());
            }
        }
        if !event.cookies.is_empty() {
            headers.append("Cookie", event.cookies.join(";"));
        }

        let mut query = MultiMap::new();
        for (name, value) in &event.query_string_parameters {
            for part in value.split(',') {
                query.append(name, part);
            }
        }

        let body = codec::decode_body(event.body.as_deref(), event.is_base64_encoded)?;
        let path = if event.request_context.http.path.is_empty() {
            normalize_path(event.raw_path.as_deref())
        } else {
            normalize_path(Some(&event.request_context.http.path))
        };
        Ok(Self {
            method,
            path,
            raw_path: event.raw_path,
            headers,
            query,
            path_parameters: event.path_parameters,
            stage_variables: event.stage_variables,
            body,
            source_ip: non_empty(event.request_context.http.source_ip),
            protocol: non_empty(event.request_context.http.protocol),
            origin: RequestOrigin::HttpApi,
        })
    }

    /// Builds the canonical request from a load balancer event.
    ///
    /// The load balancer passes query values exactly as they appeared on
    /// the wire, so this is the one shape that gets a decode pass here.
    pub fn from_alb(event: AlbEvent) -> Result<Self, RequestBuildError> {
        let method = parse_method(&event.http_method)?;
        let headers = codec::decode_headers(&event.headers, &event.multi_value_headers);
        let query = codec::decode_query(
            &event.query_string_parameters,
            &event.multi_value_query_string_parameters,
            QueryEncoding::Raw,
        );
        let body = codec::decode_body(event.body.as_deref(), event.is_base64_encoded)?;
        Ok(Self {
            method,
            path: normalize_path(event.path.as_deref()),
            raw_path: None,
            headers,
            query,
            path_parameters: Dict::new(),
            stage_variables: Dict::new(),
            body,
            source_ip: None,
            protocol: None,
            origin: RequestOrigin::Alb,
        })
    }
}

fn parse_method(method: &str) -> Result<Method, RequestBuildError> {
    let method = method.to_ascii_uppercase();
    match Method::from_bytes(method.as_bytes()) {
        Ok(method) => Ok(method),
        Err(_) => Err(RequestBuildError::InvalidMethod(method)),
    }
}

fn normalize_path(path: Option<&str>) -> String {
    match path {
        None | Some("") => "/".to_string(),
        Some(path) if path.starts_with('/') => path.to_string(),
        Some(path) => format!("/{}", path),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

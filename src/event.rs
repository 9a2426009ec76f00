//! The raw event documents delivered by the upstream gateways.
//!
//! # Overview
//! Three structurally different JSON documents can carry one HTTP request:
//!
//! * [`RestApiEvent`]: the REST-style gateway, method and path at the top
//!   level, dual single/multi maps for headers and query parameters, a
//!   request context without a unified HTTP block.
//! * [`HttpApiEvent`]: the HTTP-style gateway, method and path inside a
//!   `requestContext.http` sub-object, only single-valued maps whose values
//!   are comma-joined when a key repeats.
//! * [`AlbEvent`]: the load balancer, looks a lot like the REST shape but
//!   carries a target group identifier in its request context.
//!
//! [`GatewayEvent`] is the tagged union over the three. Because a load
//! balancer event can structurally satisfy the REST shape, discrimination in
//! [`GatewayEvent::from_value`] always checks the target-group marker first;
//! an event matching none of the shapes is rejected outright rather than
//! guessed at.

use std::io::Read;

use serde::Deserialize;

use crate::codec::{Dict, MultiDict};
use crate::request::RequestBuildError;

/// Request context of a [`RestApiEvent`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestApiRequestContext {
    #[serde(default)]
    pub stage: String,
    #[serde(rename = "requestId", default)]
    pub request_id: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub identity: RequestIdentity,
}

/// Caller identity inside a REST-style request context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestIdentity {
    #[serde(rename = "sourceIp", default)]
    pub source_ip: String,
    #[serde(rename = "userAgent", default)]
    pub user_agent: String,
}

/// A REST-style gateway proxy event.
#[derive(Debug, Clone, Deserialize)]
pub struct RestApiEvent {
    #[serde(rename = "httpMethod")]
    pub http_method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub headers: Dict,
    #[serde(rename = "multiValueHeaders", default)]
    pub multi_value_headers: MultiDict,
    #[serde(rename = "queryStringParameters", default)]
    pub query_string_parameters: Dict,
    #[serde(rename = "multiValueQueryStringParameters", default)]
    pub multi_value_query_string_parameters: MultiDict,
    #[serde(rename = "pathParameters", default)]
    pub path_parameters: Dict,
    #[serde(rename = "stageVariables", default)]
    pub stage_variables: Dict,
    #[serde(rename = "requestContext", default)]
    pub request_context: RestApiRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "isBase64Encoded", default)]
    pub is_base64_encoded: bool,
}

/// The unified HTTP block of an [`HttpApiEvent`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpDescription {
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(rename = "sourceIp", default)]
    pub source_ip: String,
}

/// Request context of an [`HttpApiEvent`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpApiRequestContext {
    #[serde(default)]
    pub http: HttpDescription,
    #[serde(rename = "requestId", default)]
    pub request_id: String,
    #[serde(default)]
    pub stage: String,
}

/// An HTTP-style gateway proxy event.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpApiEvent {
    #[serde(rename = "rawPath", default)]
    pub raw_path: Option<String>,
    #[serde(default)]
    pub headers: Dict,
    #[serde(rename = "queryStringParameters", default)]
    pub query_string_parameters: Dict,
    #[serde(rename = "pathParameters", default)]
    pub path_parameters: Dict,
    #[serde(rename = "stageVariables", default)]
    pub stage_variables: Dict,
    #[serde(default)]
    pub cookies: Vec<String>,
    #[serde(rename = "requestContext")]
    pub request_context: HttpApiRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "isBase64Encoded", default)]
    pub is_base64_encoded: bool,
}

/// Target group metadata distinguishing a load balancer event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElbContext {
    #[serde(rename = "targetGroupArn", default)]
    pub target_group_arn: Option<String>,
}

/// Request context of an [`AlbEvent`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbRequestContext {
    pub elb: ElbContext,
}

/// A load-balancer target group event.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbEvent {
    #[serde(rename = "httpMethod")]
    pub http_method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub headers: Dict,
    #[serde(rename = "multiValueHeaders", default)]
    pub multi_value_headers: MultiDict,
    #[serde(rename = "queryStringParameters", default)]
    pub query_string_parameters: Dict,
    #[serde(rename = "multiValueQueryStringParameters", default)]
    pub multi_value_query_string_parameters: MultiDict,
    #[serde(rename = "requestContext")]
    pub request_context: AlbRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(rename = "isBase64Encoded", default)]
    pub is_base64_encoded: bool,
}

/// Which gateway family a request came from, so the response can be
/// serialized in the document format that family expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// REST-style gateway proxy integration.
    RestApi,
    /// HTTP-style gateway proxy integration.
    HttpApi,
    /// Load balancer target group integration.
    Alb,
}

/// An incoming event of any of the three recognized shapes.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    RestApi(RestApiEvent),
    HttpApi(HttpApiEvent),
    Alb(AlbEvent),
}

impl GatewayEvent {
    /// Discriminates and deserializes a raw event document.
    ///
    /// The load balancer marker (`requestContext.elb`) is checked before
    /// anything else: a load balancer event also carries the top-level
    /// `httpMethod` the REST shape is recognized by, and must not be
    /// mistaken for it. An event carrying none of the discriminating fields
    /// fails with [`RequestBuildError::UnrecognizedEventShape`]; there is no
    /// fallback shape.
    ///
    /// # Example
    /// ```
    /// use lambda_api_proxy::event::{GatewayEvent, RequestOrigin};
    /// use serde_json::json;
    ///
    /// let event = GatewayEvent::from_value(json!({
    ///     "httpMethod": "GET",
    ///     "path": "/ping",
    ///     "requestContext": { "elb": { "targetGroupArn": "arn:..." } },
    /// }))
    /// .unwrap();
    /// assert_eq!(event.origin(), RequestOrigin::Alb);
    /// ```
    pub fn from_value(value: serde_json::Value) -> Result<Self, RequestBuildError> {
        if value.pointer("/requestContext/elb").is_some() {
            Ok(GatewayEvent::Alb(serde_json::from_value(value)?))
        } else if value.pointer("/requestContext/http").is_some() {
            Ok(GatewayEvent::HttpApi(serde_json::from_value(value)?))
        } else if value.get("httpMethod").is_some() {
            Ok(GatewayEvent::RestApi(serde_json::from_value(value)?))
        } else {
            Err(RequestBuildError::UnrecognizedEventShape)
        }
    }

    /// Parses an event from JSON text.
    pub fn from_str(event: &str) -> Result<Self, RequestBuildError> {
        Self::from_value(serde_json::from_str(event)?)
    }

    /// Parses an event from a JSON byte reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RequestBuildError> {
        Self::from_value(serde_json::from_reader(reader)?)
    }

    /// The shape family this event belongs to.
    pub fn origin(&self) -> RequestOrigin {
        match self {
            GatewayEvent::RestApi(_) => RequestOrigin::RestApi,
            GatewayEvent::HttpApi(_) => RequestOrigin::HttpApi,
            GatewayEvent::Alb(_) => RequestOrigin::Alb,
        }
    }
}

//! Per-shape adapter facades tying the whole translation together.
//!
//! # Overview
//! An adapter is bound to exactly one gateway shape when it is constructed
//! and never guesses across calls: the caller knows which integration its
//! function is wired to, and picks [`RestApiAdapter`], [`HttpApiAdapter`],
//! or [`AlbAdapter`] accordingly. Each invocation builds the canonical
//! request, runs the handler against a fresh [`ResponseWriter`], and
//! serializes the writer back into the shape's document:
//!
//! ```text
//! event --build--> ProxyRequest --handler--> ResponseWriter --serialize--> document
//! ```
//!
//! Both a context-aware entry point (`proxy_with_context`) and a
//! context-free convenience (`proxy`, which supplies
//! [`Context::background`]) are exposed. The context is forwarded to the
//! handler untouched.
//!
//! # Example
//! ```
//! use std::convert::Infallible;
//!
//! use lambda_api_proxy::{
//!     make_handler, AlbAdapter, Context, GatewayEvent, ProxyRequest, ResponseWriter,
//! };
//!
//! let handler = make_handler(
//!     |_request: ProxyRequest,
//!      writer: &mut ResponseWriter,
//!      _context: Context|
//!      -> Result<(), Infallible> {
//!         writer.set_header("Content-Type", "application/json");
//!         writer.write(br#"{"message":"pong"}"#);
//!         Ok(())
//!     },
//! );
//! let adapter = AlbAdapter::new(handler);
//!
//! let event = GatewayEvent::from_str(
//!     r#"{
//!         "httpMethod": "GET",
//!         "path": "/ping",
//!         "requestContext": { "elb": { "targetGroupArn": "arn:..." } }
//!     }"#,
//! )
//! .unwrap();
//! let document = match event {
//!     GatewayEvent::Alb(event) => adapter.proxy(event).unwrap(),
//!     _ => unreachable!(),
//! };
//! assert_eq!(document.status_code, 200);
//! assert_eq!(document.body, r#"{"message":"pong"}"#);
//! ```

use crate::codec::BinaryDetector;
use crate::event::{AlbEvent, HttpApiEvent, RestApiEvent};
use crate::request::{ProxyRequest, RequestBuildError};
use crate::response::{
    AlbResponse, HttpApiResponse, ResponseSerializer, ResponseWriter, RestApiResponse,
};
use crate::{Context, Handler};

/// Possible errors when proxying one event through a handler.
///
/// Translation failures and handler failures are deliberately distinct: a
/// handler that wants to report an HTTP-level problem must write a normal
/// status and body to its writer, because the gateway protocol has no
/// transport-error channel separate from the response document.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError<E> {
    #[error("fail to build request from the incoming event: {0}")]
    Request(#[from] RequestBuildError),
    #[error("handler failed: {0}")]
    Handler(E),
}

/// Adapter for functions wired to the REST-style gateway.
pub struct RestApiAdapter<H> {
    handler: H,
    serializer: ResponseSerializer,
}

impl<H> RestApiAdapter<H>
where
    H: Handler,
{
    /// Creates an adapter around `handler` with default binary-content
    /// detection.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            serializer: ResponseSerializer::new(),
        }
    }

    /// Creates an adapter whose response bodies are classified by a
    /// caller-supplied [`BinaryDetector`].
    pub fn with_binary_detector(handler: H, binary: BinaryDetector) -> Self {
        Self {
            handler,
            serializer: ResponseSerializer::with_binary_detector(binary),
        }
    }

    /// Proxies one event with a background context.
    pub fn proxy(&self, event: RestApiEvent) -> Result<RestApiResponse, ProxyError<H::Error>> {
        self.proxy_with_context(Context::background(), event)
    }

    /// Proxies one event, forwarding `context` to the handler.
    pub fn proxy_with_context(
        &self,
        context: Context,
        event: RestApiEvent,
    ) -> Result<RestApiResponse, ProxyError<H::Error>> {
        let request = ProxyRequest::from_rest_api(event)?;
        let mut writer = ResponseWriter::new();
        self.handler
            .call(request, &mut writer, context)
            .map_err(ProxyError::Handler)?;
        writer.close();
        Ok(self.serializer.rest_api(writer))
    }
}

/// Adapter for functions wired to the HTTP-style gateway.
pub struct HttpApiAdapter<H> {
    handler: H,
    serializer: ResponseSerializer,
}

impl<H> HttpApiAdapter<H>
where
    H: Handler,
{
    /// Creates an adapter around `handler` with default binary-content
    /// detection.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            serializer: ResponseSerializer::new(),
        }
    }

    /// Creates an adapter whose response bodies are classified by a
    /// caller-supplied [`BinaryDetector`].
    pub fn with_binary_detector(handler: H, binary: BinaryDetector) -> Self {
        Self {
            handler,
            serializer: ResponseSerializer::with_binary_detector(binary),
        }
    }

    /// Proxies one event with a background context.
    pub fn proxy(&self, event: HttpApiEvent) -> Result<HttpApiResponse, ProxyError<H::Error>> {
        self.proxy_with_context(Context::background(), event)
    }

    /// Proxies one event, forwarding `context` to the handler.
    pub fn proxy_with_context(
        &self,
        context: Context,
        event: HttpApiEvent,
    ) -> Result<HttpApiResponse, ProxyError<H::Error>> {
        let request = ProxyRequest::from_http_api(event)?;
        let mut writer = ResponseWriter::new();
        self.handler
            .call(request, &mut writer, context)
            .map_err(ProxyError::Handler)?;
        writer.close();
        Ok(self.serializer.http_api(writer))
    }
}

/// Adapter for functions behind a load balancer target group.
pub struct AlbAdapter<H> {
    handler: H,
    serializer: ResponseSerializer,
}

impl<H> AlbAdapter<H>
where
    H: Handler,
{
    /// Creates an adapter around `handler` with default binary-content
    /// detection.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            serializer: ResponseSerializer::new(),
        }
    }

    /// Creates an adapter whose response bodies are classified by a
    /// caller-supplied [`BinaryDetector`].
    pub fn with_binary_detector(handler: H, binary: BinaryDetector) -> Self {
        Self {
            handler,
            serializer: ResponseSerializer::with_binary_detector(binary),
        }
    }

    /// Proxies one event with a background context.
    pub fn proxy(&self, event: AlbEvent) -> Result<AlbResponse, ProxyError<H::Error>> {
        self.proxy_with_context(Context::background(), event)
    }

    /// Proxies one event, forwarding `context` to the handler.
    pub fn proxy_with_context(
        &self,
        context: Context,
        event: AlbEvent,
    ) -> Result<AlbResponse, ProxyError<H::Error>> {
        let request = ProxyRequest::from_alb(event)?;
        let mut writer = ResponseWriter::new();
        self.handler
            .call(request, &mut writer, context)
            .map_err(ProxyError::Handler)?;
        writer.close();
        Ok(self.serializer.alb(writer))
    }
}

#[cfg(test)]
mod test {
    use std::convert::Infallible;
    use std::fmt;

    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::make_handler;

    fn ping_handler() -> impl Handler<Error = Infallible> {
        make_handler(
            |request: ProxyRequest,
             writer: &mut ResponseWriter,
             _context: Context|
             -> Result<(), Infallible> {
                assert_eq!(request.path, "/ping");
                writer.set_header("Content-Type", "application/json");
                writer.write(br#"{"message":"pong"}"#);
                Ok(())
            },
        )
    }

    #[test]
    fn rest_api_ping_round_trip() {
        let adapter = RestApiAdapter::new(ping_handler());
        let event: RestApiEvent = serde_json::from_value(json!({
            "httpMethod": "GET",
            "path": "/ping",
        }))
        .unwrap();

        let document = adapter.proxy(event.clone()).unwrap();
        assert_eq!(document.status_code, 200);
        assert!(!document.is_base64_encoded);
        assert_eq!(document.body, r#"{"message":"pong"}"#);

        // a second call must behave identically
        let document = adapter
            .proxy_with_context(Context::background(), event)
            .unwrap();
        assert_eq!(document.status_code, 200);
    }

    #[test]
    fn http_api_ping_round_trip() {
        let adapter = HttpApiAdapter::new(ping_handler());
        let event: HttpApiEvent = serde_json::from_value(json!({
            "requestContext": { "http": { "method": "GET", "path": "/ping" } },
        }))
        .unwrap();

        let document = adapter.proxy(event).unwrap();
        assert_eq!(document.status_code, 200);
        assert_eq!(document.body, r#"{"message":"pong"}"#);
        assert_eq!(document.headers["Content-Type"], "application/json");
    }

    #[test]
    fn alb_query_parameters_reach_the_handler_decoded() {
        let handler = make_handler(
            |request: ProxyRequest,
             writer: &mut ResponseWriter,
             _context: Context|
             -> Result<(), Infallible> {
                assert_eq!(request.query.get("email"), Some("some@site.com"));
                assert_eq!(request.query.get_all("email").len(), 1);
                writer.write(request.query.get("email").unwrap().as_bytes());
                Ok(())
            },
        );
        let adapter = AlbAdapter::new(handler);
        let event: AlbEvent = serde_json::from_value(json!({
            "httpMethod": "GET",
            "path": "/users",
            "queryStringParameters": { "email": "some%40site.com" },
            "requestContext": { "elb": { "targetGroupArn": " ad" } },
        }))
        .unwrap();

        let document = adapter.proxy(event).unwrap();
        assert_eq!(document.status_code, 200);
        assert_eq!(document.body, "some@site.com");
        assert_eq!(document.status_description, "200 OK");
    }

    #[test]
    fn malformed_body_fails_before_the_handler_runs() {
        let handler = make_handler(
            |_request: ProxyRequest,
             _writer: &mut ResponseWriter,
             _context: Context|
             -> Result<(), Infallible> {
                panic!("handler must not run");
            },
        );
        let adapter = RestApiAdapter::new(handler);
        let event: RestApiEvent = serde_json::from_value(json!({
            "httpMethod": "POST",
            "path": "/upload",
            "body": "this is not base64!!",
            "isBase64Encoded": true,
        }))
        .unwrap();

        let err = adapter.proxy(event).unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Request(RequestBuildError::MalformedBody(_))
        ));
    }

    #[derive(Debug)]
    struct Exploded;

    impl fmt::Display for Exploded {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "exploded")
        }
    }

    #[test]
    fn handler_errors_are_surfaced_distinctly() {
        let handler = make_handler(
            |_request: ProxyRequest,
             _writer: &mut ResponseWriter,
             _context: Context|
             -> Result<(), Exploded> { Err(Exploded) },
        );
        let adapter = RestApiAdapter::new(handler);
        let event: RestApiEvent = serde_json::from_value(json!({
            "httpMethod": "GET",
            "path": "/boom",
        }))
        .unwrap();

        let err = adapter.proxy(event).unwrap_err();
        assert!(matches!(err, ProxyError::Handler(Exploded)));
    }

    #[test]
    fn context_is_forwarded_untouched() {
        let handler = make_handler(
            |_request: ProxyRequest,
             writer: &mut ResponseWriter,
             context: Context|
             -> Result<(), Infallible> {
                writer.write(context.request_id.as_bytes());
                Ok(())
            },
        );
        let adapter = RestApiAdapter::new(handler);
        let event: RestApiEvent = serde_json::from_value(json!({
            "httpMethod": "GET",
            "path": "/whoami",
        }))
        .unwrap();

        let context = Context::with_request_id("req-42");
        let document = adapter.proxy_with_context(context, event).unwrap();
        assert_eq!(document.body, "req-42");
    }

    #[test]
    fn handler_that_only_sets_status_gets_an_empty_document() {
        let handler = make_handler(
            |_request: ProxyRequest,
             writer: &mut ResponseWriter,
             _context: Context|
             -> Result<(), Infallible> {
                writer.set_status(StatusCode::ACCEPTED);
                Ok(())
            },
        );
        let adapter = RestApiAdapter::new(handler);
        let event: RestApiEvent = serde_json::from_value(json!({
            "httpMethod": "DELETE",
            "path": "/jobs/7",
        }))
        .unwrap();

        let document = adapter.proxy(event).unwrap();
        assert_eq!(document.status_code, 202);
        assert_eq!(document.body, "");
        assert!(!document.is_base64_encoded);
    }
}

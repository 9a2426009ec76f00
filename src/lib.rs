//! Run http-style handlers unmodified behind cloud gateway proxy events.
//!
//! An event-driven gateway does not hand a function a raw HTTP byte stream:
//! it delivers a structured JSON event (one of three shapes, depending on
//! whether the request came through a REST-style gateway, an HTTP-style
//! gateway, or a load balancer target group) and expects a structured
//! response document back. This crate translates in both directions so that
//! handler code written against an ordinary request/response-writer
//! abstraction keeps working:
//!
//! * any of the three event shapes decodes into one canonical
//!   [`ProxyRequest`], with multi-valued headers and query parameters, path
//!   parameters, base64 or plain bodies, and source metadata all preserved;
//! * whatever the handler writes to a [`ResponseWriter`] (status, headers,
//!   any number of body writes) is captured and serialized back into the
//!   document format of the originating shape, base64-encoding binary
//!   payloads as needed.
//!
//! Each adapter is bound to one shape; pick the one matching the trigger
//! your function is deployed behind.
//!
//! # Example
//! ```
//! use std::convert::Infallible;
//!
//! use lambda_api_proxy::{
//!     make_handler, Context, ProxyRequest, ResponseWriter, RestApiAdapter, RestApiEvent,
//! };
//!
//! let handler = make_handler(
//!     |request: ProxyRequest,
//!      writer: &mut ResponseWriter,
//!      _context: Context|
//!      -> Result<(), Infallible> {
//!         writer.set_header("Content-Type", "text/plain");
//!         writer.write(format!("hello from {}", request.path).as_bytes());
//!         Ok(())
//!     },
//! );
//! let adapter = RestApiAdapter::new(handler);
//!
//! let event: RestApiEvent = serde_json::from_str(
//!     r#"{ "httpMethod": "GET", "path": "/greeting" }"#,
//! )
//! .unwrap();
//! let document = adapter.proxy(event).unwrap();
//! assert_eq!(document.status_code, 200);
//! assert_eq!(document.body, "hello from /greeting");
//! ```
//!
//! # Handlers
//! A [`Handler`] runs synchronously to completion against the writer. It
//! has no error channel to the gateway besides the response document
//! itself: to report an HTTP-level failure, write a status and body.
//! Returning `Err` from a handler aborts the invocation and surfaces the
//! error to whatever invoked the adapter.
//!
//! # What this crate does not do
//! The runtime loop polling the cloud for invocations, routing, TLS,
//! timeouts, and retries all belong to the surrounding runtime and the
//! gateway; this crate is the translation layer in between.

pub mod adapter;
pub mod codec;
pub mod event;
pub mod multimap;
pub mod request;
pub mod response;

use std::fmt::Display;
use std::marker::PhantomData;

pub use crate::adapter::{AlbAdapter, HttpApiAdapter, ProxyError, RestApiAdapter};
pub use crate::codec::BinaryDetector;
pub use crate::event::{AlbEvent, GatewayEvent, HttpApiEvent, RequestOrigin, RestApiEvent};
pub use crate::multimap::MultiMap;
pub use crate::request::{ProxyRequest, RequestBuildError};
pub use crate::response::{
    AlbResponse, GatewayResponse, HttpApiResponse, ResponseSerializer, ResponseWriter,
    RestApiResponse,
};

/// The invocation context forwarded to a handler.
///
/// The adapter neither inspects nor acts on it; it exists so callers that
/// have gateway-supplied metadata can pass it through. The context-free
/// adapter entry points supply [`Context::background`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    /// Correlation id assigned by the gateway, empty when unknown.
    pub request_id: String,
}

impl Context {
    /// An empty default context.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context carrying a request correlation id.
    pub fn with_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

/// Main trait for a proxied HTTP handler.
///
/// # Implement the Trait
/// Using a closure through [`make_handler`] covers most cases. A
/// struct/enum implements it as:
/// ```
/// use std::convert::Infallible;
///
/// use lambda_api_proxy::{Context, Handler, ProxyRequest, ResponseWriter};
///
/// struct Static {
///     page: String,
/// }
///
/// impl Handler for Static {
///     type Error = Infallible;
///
///     fn call(
///         &self,
///         _request: ProxyRequest,
///         writer: &mut ResponseWriter,
///         _context: Context,
///     ) -> Result<(), Self::Error> {
///         writer.set_header("Content-Type", "text/html");
///         writer.write(self.page.as_bytes());
///         Ok(())
///     }
/// }
/// ```
pub trait Handler {
    /// The type for error(s) during the execution of the handler.
    type Error: Display;

    /// Handles one request, producing the response by side effects on
    /// `writer`.
    fn call(
        &self,
        request: ProxyRequest,
        writer: &mut ResponseWriter,
        context: Context,
    ) -> Result<(), Self::Error>;
}

/// A wrapper struct to convert a closure into a [`Handler`].
///
/// The main reason we need this is to make sure we can use the associated
/// error type in [`Handler`].
#[doc(hidden)]
pub struct Closure<Error, Function> {
    f: Function,
    phantom: PhantomData<fn() -> Error>,
}

#[doc(hidden)]
impl<Error, Function> Handler for Closure<Error, Function>
where
    Error: Display,
    Function: Fn(ProxyRequest, &mut ResponseWriter, Context) -> Result<(), Error>,
{
    type Error = Error;

    fn call(
        &self,
        request: ProxyRequest,
        writer: &mut ResponseWriter,
        context: Context,
    ) -> Result<(), Self::Error> {
        (self.f)(request, writer, context)
    }
}

/// Creates a [`Handler`] from a closure.
///
/// # Example
/// ```
/// use std::convert::Infallible;
///
/// use lambda_api_proxy::{make_handler, Context, ProxyRequest, ResponseWriter};
///
/// let handler = make_handler(
///     |_request: ProxyRequest,
///      writer: &mut ResponseWriter,
///      _context: Context|
///      -> Result<(), Infallible> {
///         writer.write(b"Hello World");
///         Ok(())
///     },
/// );
/// ```
pub fn make_handler<Error, Function>(f: Function) -> Closure<Error, Function>
where
    Error: Display,
    Function: Fn(ProxyRequest, &mut ResponseWriter, Context) -> Result<(), Error> + 'static,
{
    Closure {
        f,
        phantom: PhantomData,
    }
}

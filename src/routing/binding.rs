use http::Method;

use crate::backend::{self, KeyService, RequestContext, ServiceError};
use crate::error::ApiError;
use crate::message::{RequestMessage, ResponseMessage};
use crate::params::BindParams;
use crate::rewrite::rewrite_timestamp_fields;
use crate::routing::template::{PathTemplate, RouteMatch, TemplateError};

/// One (method, path template) pair and everything needed to serve it.
///
/// Bindings are built once at startup. Per request only the message is
/// allocated, cloned from the prototype.
#[derive(Debug, Clone)]
pub struct RouteBinding {
    method: Method,
    template: PathTemplate,
    prototype: RequestMessage,
    timestamp_fields: &'static [&'static str],
}

impl RouteBinding {
    /// # Errors
    ///
    /// Returns [`TemplateError`] when `template` does not compile.
    pub fn new(
        method: Method,
        template: &str,
        prototype: RequestMessage,
        timestamp_fields: &'static [&'static str],
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            method,
            template: PathTemplate::parse(template)?,
            prototype,
            timestamp_fields,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// RPC name of the bound handler.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.prototype.name()
    }

    /// Fresh zero-valued request message for this route.
    #[must_use]
    pub fn new_message(&self) -> RequestMessage {
        self.prototype.clone()
    }

    /// JSON fields whose RFC3339 string values are rewritten before decoding.
    #[must_use]
    pub fn timestamp_fields(&self) -> &'static [&'static str] {
        self.timestamp_fields
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] when a path variable is missing or a query
    /// parameter is malformed.
    pub fn parse_params(&self, m: &RouteMatch<'_>, message: &mut RequestMessage) -> Result<(), ApiError> {
        message.bind_params(m)
    }

    /// Build the request message: parameters, then the timestamp-rewritten
    /// body merged on top.
    ///
    /// # Errors
    ///
    /// Returns the first parameter, timestamp or decode error. Nothing is
    /// decoded from a body whose timestamps failed to rewrite.
    pub fn decode(&self, m: &RouteMatch<'_>, body: &[u8]) -> Result<RequestMessage, ApiError> {
        let mut message = self.new_message();
        self.parse_params(m, &mut message)?;
        let body = rewrite_timestamp_fields(body, self.timestamp_fields)?;
        message.merge_body(&body)?;
        Ok(message)
    }

    /// Run the bound handler.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`ServiceError`] unchanged.
    pub async fn handle(
        &self,
        service: &dyn KeyService,
        ctx: &RequestContext,
        message: RequestMessage,
    ) -> Result<ResponseMessage, ServiceError> {
        backend::invoke(service, ctx, message).await
    }
}

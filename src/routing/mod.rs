pub mod binding;
pub mod dispatch;
pub mod template;

use http::Method;

use crate::message::{
    CreateKeyRequest, GetEntryRequest, HkpLookupRequest, ListEntryHistoryRequest, ListSehRequest,
    ListStepsRequest, ListUpdateRequest, RequestMessage, UpdateEntryRequest, UpdateKeyRequest,
};
use crate::rewrite::CREATION_TIME_FIELD;

pub use binding::RouteBinding;
pub use template::{PathTemplate, RouteMatch, TemplateError};

/// Fields rewritten in bodies that may carry a key.
const KEY_TIMESTAMP_FIELDS: &[&str] = &[CREATION_TIME_FIELD];

#[derive(Debug, thiserror::Error)]
pub enum RouteTableError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("duplicate route {method} {template}")]
    Duplicate { method: Method, template: String },
    #[error("route {template} does not declare variable '{name}' required by {rpc}")]
    MissingVariable {
        template: String,
        name: &'static str,
        rpc: &'static str,
    },
}

/// Outcome of a route lookup.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    Matched {
        binding: &'a RouteBinding,
        params: RouteMatch<'a>,
    },
    /// Some template matched the path, but not for this method.
    MethodNotAllowed,
    NotFound,
}

/// Immutable set of route bindings, built once before serving.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    bindings: Vec<RouteBinding>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `binding`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteTableError::Duplicate`] when the (method, template)
    /// pair is already registered, or [`RouteTableError::MissingVariable`]
    /// when the template lacks a path variable the message needs.
    pub fn register(&mut self, binding: RouteBinding) -> Result<(), RouteTableError> {
        let template = binding.template();
        for &name in binding.new_message().required_path_vars() {
            if !template.variables().any(|declared| declared == name) {
                return Err(RouteTableError::MissingVariable {
                    template: template.to_string(),
                    name,
                    rpc: binding.name(),
                });
            }
        }
        if self.bindings.iter().any(|existing| {
            existing.method() == binding.method() && existing.template() == template
        }) {
            return Err(RouteTableError::Duplicate {
                method: binding.method().clone(),
                template: template.to_string(),
            });
        }
        self.bindings.push(binding);
        Ok(())
    }

    /// Register a binding built from parts.
    ///
    /// # Errors
    ///
    /// See [`RouteTable::register`] and [`PathTemplate::parse`].
    pub fn route(
        &mut self,
        method: Method,
        template: &str,
        prototype: RequestMessage,
        timestamp_fields: &'static [&'static str],
    ) -> Result<&mut Self, RouteTableError> {
        self.register(RouteBinding::new(method, template, prototype, timestamp_fields)?)?;
        Ok(self)
    }

    /// The key server's REST surface.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in table itself is inconsistent.
    pub fn standard() -> Result<Self, RouteTableError> {
        let mut table = Self::new();
        table
            .route(
                Method::GET,
                "/v1/users/{user_id}",
                RequestMessage::GetEntry(GetEntryRequest::default()),
                &[],
            )?
            .route(
                Method::POST,
                "/v1/users/{user_id}/keys",
                RequestMessage::CreateKey(CreateKeyRequest::default()),
                KEY_TIMESTAMP_FIELDS,
            )?
            .route(
                Method::PUT,
                "/v1/users/{user_id}/keys/{key_id}",
                RequestMessage::UpdateKey(UpdateKeyRequest::default()),
                KEY_TIMESTAMP_FIELDS,
            )?
            .route(
                Method::GET,
                "/v1/hkp/lookup",
                RequestMessage::HkpLookup(HkpLookupRequest::default()),
                &[],
            )?
            .route(
                Method::GET,
                "/v2/users/{user_id}",
                RequestMessage::GetEntry(GetEntryRequest::default()),
                &[],
            )?
            .route(
                Method::GET,
                "/v2/users/{user_id}/history",
                RequestMessage::ListEntryHistory(ListEntryHistoryRequest::default()),
                &[],
            )?
            .route(
                Method::PUT,
                "/v2/users/{user_id}",
                RequestMessage::UpdateEntry(UpdateEntryRequest::default()),
                KEY_TIMESTAMP_FIELDS,
            )?
            .route(
                Method::GET,
                "/v2/seh",
                RequestMessage::ListSeh(ListSehRequest::default()),
                &[],
            )?
            .route(
                Method::GET,
                "/v2/update",
                RequestMessage::ListUpdate(ListUpdateRequest::default()),
                &[],
            )?
            .route(
                Method::GET,
                "/v2/step",
                RequestMessage::ListSteps(ListStepsRequest::default()),
                &[],
            )?;
        Ok(table)
    }

    /// Find the binding for `method` and `path`.
    #[must_use]
    pub fn lookup<'a>(
        &'a self,
        method: &Method,
        path: &'a str,
        query: Option<&'a str>,
    ) -> RouteLookup<'a> {
        let mut path_matched = false;
        for binding in &self.bindings {
            let Some(params) = binding.template().matches(path, query) else {
                continue;
            };
            if binding.method() == method {
                return RouteLookup::Matched { binding, params };
            }
            path_matched = true;
        }
        if path_matched {
            RouteLookup::MethodNotAllowed
        } else {
            RouteLookup::NotFound
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteBinding> {
        self.bindings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

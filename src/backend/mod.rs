//! Backend collaborator the route handlers call into.
//!
//! The REST layer only knows the [`KeyService`] signatures: a request
//! context plus a fully populated message in, a reply or a [`ServiceError`]
//! out. Implementations are injected into [`crate::state::AppState`].

pub mod memory;

use std::fmt;

use futures_util::future::{self, BoxFuture, FutureExt};
use uuid::Uuid;

use crate::message::{
    CreateKeyRequest, GetEntryRequest, GetEntryResponse, HkpLookupRequest, HttpBody,
    ListEntryHistoryRequest, ListEntryHistoryResponse, ListSehRequest, ListSehResponse,
    ListStepsRequest, ListStepsResponse, ListUpdateRequest, ListUpdateResponse, RequestMessage,
    ResponseMessage, SignedKey, UpdateEntryRequest, UpdateEntryResponse, UpdateKeyRequest,
};

pub use memory::MemoryDirectory;

/// Boxed reply future returned by every [`KeyService`] method.
pub type ServiceFuture<'a, T> = BoxFuture<'a, Result<T, ServiceError>>;

/// Status codes a backend may report, named after their RPC equivalents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    InvalidArgument,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Unauthenticated,
    FailedPrecondition,
    Unimplemented,
    Unavailable,
    Internal,
}

impl Code {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::Unauthenticated => "UNAUTHENTICATED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Unavailable => "UNAVAILABLE",
            Code::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by a backend handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: Code,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(Code::AlreadyExists, message)
    }

    pub fn unimplemented(method: &str) -> Self {
        Self::new(Code::Unimplemented, format!("{method} is not implemented"))
    }
}

/// Per-request metadata handed to every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub request_seq: u64,
    pub request_id: Uuid,
}

fn unimplemented_rpc<'a, T: Send + 'a>(method: &'static str) -> ServiceFuture<'a, T> {
    future::ready(Err(ServiceError::unimplemented(method))).boxed()
}

/// The key directory operations exposed over REST.
///
/// Every method defaults to `UNIMPLEMENTED`, so a backend only overrides
/// what it serves.
pub trait KeyService: Send + Sync {
    fn get_entry<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: GetEntryRequest,
    ) -> ServiceFuture<'a, GetEntryResponse> {
        unimplemented_rpc("GetEntry")
    }

    fn hkp_lookup<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: HkpLookupRequest,
    ) -> ServiceFuture<'a, HttpBody> {
        unimplemented_rpc("HkpLookup")
    }

    fn list_entry_history<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: ListEntryHistoryRequest,
    ) -> ServiceFuture<'a, ListEntryHistoryResponse> {
        unimplemented_rpc("ListEntryHistory")
    }

    fn update_entry<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: UpdateEntryRequest,
    ) -> ServiceFuture<'a, UpdateEntryResponse> {
        unimplemented_rpc("UpdateEntry")
    }

    fn list_seh<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: ListSehRequest,
    ) -> ServiceFuture<'a, ListSehResponse> {
        unimplemented_rpc("ListSEH")
    }

    fn list_update<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: ListUpdateRequest,
    ) -> ServiceFuture<'a, ListUpdateResponse> {
        unimplemented_rpc("ListUpdate")
    }

    fn list_steps<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: ListStepsRequest,
    ) -> ServiceFuture<'a, ListStepsResponse> {
        unimplemented_rpc("ListSteps")
    }

    fn create_key<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: CreateKeyRequest,
    ) -> ServiceFuture<'a, SignedKey> {
        unimplemented_rpc("CreateKey")
    }

    fn update_key<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        _req: UpdateKeyRequest,
    ) -> ServiceFuture<'a, SignedKey> {
        unimplemented_rpc("UpdateKey")
    }
}

/// Call the `service` method that serves `request`.
///
/// # Errors
///
/// Returns whatever [`ServiceError`] the backend reports, unchanged.
pub async fn invoke(
    service: &dyn KeyService,
    ctx: &RequestContext,
    request: RequestMessage,
) -> Result<ResponseMessage, ServiceError> {
    Ok(match request {
        RequestMessage::GetEntry(req) => ResponseMessage::GetEntry(service.get_entry(ctx, req).await?),
        RequestMessage::HkpLookup(req) => {
            ResponseMessage::HkpLookup(service.hkp_lookup(ctx, req).await?)
        }
        RequestMessage::ListEntryHistory(req) => {
            ResponseMessage::ListEntryHistory(service.list_entry_history(ctx, req).await?)
        }
        RequestMessage::UpdateEntry(req) => {
            ResponseMessage::UpdateEntry(service.update_entry(ctx, req).await?)
        }
        RequestMessage::ListSeh(req) => ResponseMessage::ListSeh(service.list_seh(ctx, req).await?),
        RequestMessage::ListUpdate(req) => {
            ResponseMessage::ListUpdate(service.list_update(ctx, req).await?)
        }
        RequestMessage::ListSteps(req) => {
            ResponseMessage::ListSteps(service.list_steps(ctx, req).await?)
        }
        RequestMessage::CreateKey(req) => {
            ResponseMessage::SignedKey(service.create_key(ctx, req).await?)
        }
        RequestMessage::UpdateKey(req) => {
            ResponseMessage::SignedKey(service.update_key(ctx, req).await?)
        }
    })
}

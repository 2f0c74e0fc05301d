mod request_id;

use std::sync::Arc;

use crate::backend::{KeyService, RequestContext};
use crate::config::AppConfig;
use crate::routing::RouteTable;

use request_id::RequestIdGenerator;

/// Shared application state accessible to all handlers.
///
/// Built once before serving; nothing in it is mutated per request except
/// the request-id counter.
pub struct AppState {
    pub config: AppConfig,
    pub routes: RouteTable,
    pub backend: Arc<dyn KeyService>,
    request_ids: RequestIdGenerator,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, routes: RouteTable, backend: Arc<dyn KeyService>) -> Self {
        Self {
            config,
            routes,
            backend,
            request_ids: RequestIdGenerator::new(),
        }
    }

    pub fn next_request_seq(&self) -> u64 {
        self.request_ids.next_seq()
    }

    #[must_use]
    pub fn request_uuid(&self, request_seq: u64) -> uuid::Uuid {
        self.request_ids.request_uuid(request_seq)
    }

    /// Allocate the context for a new request.
    pub fn request_context(&self) -> RequestContext {
        let request_seq = self.next_request_seq();
        RequestContext {
            request_seq,
            request_id: self.request_uuid(request_seq),
        }
    }
}

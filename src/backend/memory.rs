//! In-memory key directory.
//!
//! Every accepted key write publishes a new epoch: the user's entry is
//! snapshotted, an update with a fresh commitment timestamp is appended and a
//! signed epoch head is issued. Reads never block writers for longer than a
//! map lookup.

use std::hash::{Hash, Hasher};

use futures_util::future::{self, FutureExt};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use time::OffsetDateTime;

use super::{KeyService, RequestContext, ServiceError, ServiceFuture};
use crate::message::{
    CreateKeyRequest, Entry, EntryUpdate, GetEntryRequest, GetEntryResponse, HkpLookupRequest,
    HttpBody, Key, ListEntryHistoryRequest, ListEntryHistoryResponse, ListSehRequest,
    ListSehResponse, ListStepsRequest, ListStepsResponse, ListUpdateRequest, ListUpdateResponse,
    SignedEpochHead, SignedKey, Step, Timestamp, UpdateEntryRequest, UpdateEntryResponse,
    UpdateKeyRequest,
};

const DEFAULT_PAGE_SIZE: usize = 16;
const MAX_PAGE_SIZE: usize = 256;

#[derive(Default)]
struct DirectoryState {
    epoch: u64,
    commitment_seq: u64,
    // Snapshots ordered by epoch; the last one is current.
    history: FxHashMap<String, Vec<GetEntryResponse>>,
    heads: Vec<SignedEpochHead>,
    updates: Vec<EntryUpdate>,
    steps: Vec<Step>,
}

/// Process-local [`KeyService`] implementation.
#[derive(Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

#[derive(Clone, Copy)]
enum WriteMode {
    Upsert,
    CreateOnly,
    ReplaceOnly,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory pre-populated with `users`, one epoch per key.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGUMENT` when a seed user or key is malformed.
    pub fn with_users<I>(users: I) -> Result<Self, ServiceError>
    where
        I: IntoIterator<Item = (String, Vec<Key>)>,
    {
        let directory = Self::new();
        for (user_id, keys) in users {
            for key in keys {
                let signed_key = SignedKey {
                    key: Some(key),
                    signature: String::new(),
                };
                directory.write_key(&user_id, Some(signed_key), WriteMode::Upsert)?;
            }
        }
        Ok(directory)
    }

    /// Current published epoch; `0` until the first write.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    fn write_key(
        &self,
        user_id: &str,
        signed_key: Option<SignedKey>,
        mode: WriteMode,
    ) -> Result<(SignedKey, GetEntryResponse), ServiceError> {
        if user_id.is_empty() {
            return Err(ServiceError::invalid_argument("user_id is required"));
        }
        let Some(signed_key) = signed_key else {
            return Err(ServiceError::invalid_argument("signed_key is required"));
        };
        let Some(key) = signed_key.key.clone() else {
            return Err(ServiceError::invalid_argument("signed_key.key is required"));
        };
        if key.app_id.is_empty() {
            return Err(ServiceError::invalid_argument("key.app_id is required"));
        }

        let mut state = self.state.write();
        let mut keys = state
            .history
            .get(user_id)
            .and_then(|snapshots| snapshots.last())
            .and_then(|snapshot| snapshot.entry.as_ref())
            .map(|entry| entry.keys.clone())
            .unwrap_or_default();

        let existing = keys.iter().position(|k| k.app_id == key.app_id);
        match (mode, existing) {
            (WriteMode::CreateOnly, Some(_)) => {
                return Err(ServiceError::already_exists(format!(
                    "user '{user_id}' already has a key for app '{}'",
                    key.app_id
                )));
            }
            (WriteMode::ReplaceOnly, None) => {
                return Err(ServiceError::not_found(format!(
                    "user '{user_id}' has no key for app '{}'",
                    key.app_id
                )));
            }
            (_, Some(index)) => keys[index] = key,
            (_, None) => keys.push(key),
        }

        state.epoch += 1;
        state.commitment_seq += 1;
        let epoch = state.epoch;
        let commitment_timestamp = state.commitment_seq;

        let snapshot = GetEntryResponse {
            epoch,
            entry: Some(Entry {
                user_id: user_id.to_string(),
                keys,
            }),
        };
        let root = epoch_root(epoch, &snapshot);
        state
            .history
            .entry(user_id.to_string())
            .or_default()
            .push(snapshot.clone());
        state.updates.push(EntryUpdate {
            user_id: user_id.to_string(),
            commitment_timestamp,
            signed_key: Some(signed_key.clone()),
        });
        state.steps.push(Step {
            epoch,
            commitment_timestamp,
        });
        state.heads.push(SignedEpochHead {
            epoch,
            issue_time: Some(now_timestamp()),
            root,
        });

        tracing::debug!(user_id, epoch, commitment_timestamp, "published directory epoch");
        Ok((signed_key, snapshot))
    }

    fn get_entry_sync(&self, req: &GetEntryRequest) -> Result<GetEntryResponse, ServiceError> {
        if req.user_id.is_empty() {
            return Err(ServiceError::invalid_argument("user_id is required"));
        }
        let state = self.state.read();
        if req.epoch > state.epoch {
            return Err(ServiceError::not_found(format!(
                "epoch {} has not been published",
                req.epoch
            )));
        }
        let target_epoch = if req.epoch == 0 { state.epoch } else { req.epoch };
        let snapshot = state
            .history
            .get(&req.user_id)
            .and_then(|snapshots| snapshots.iter().rev().find(|s| s.epoch <= target_epoch))
            .ok_or_else(|| ServiceError::not_found(format!("user '{}' not found", req.user_id)))?;

        let entry = snapshot.entry.as_ref().map(|entry| Entry {
            user_id: entry.user_id.clone(),
            keys: entry
                .keys
                .iter()
                .filter(|key| req.app_id.is_empty() || key.app_id == req.app_id)
                .cloned()
                .collect(),
        });
        Ok(GetEntryResponse {
            epoch: target_epoch,
            entry,
        })
    }

    fn hkp_lookup_sync(&self, req: &HkpLookupRequest) -> Result<HttpBody, ServiceError> {
        match req.op.as_str() {
            "get" => {}
            "" => return Err(ServiceError::invalid_argument("op is required")),
            other => return Err(ServiceError::unimplemented(&format!("HKP op '{other}'"))),
        }
        if req.search.is_empty() {
            return Err(ServiceError::invalid_argument("search is required"));
        }
        let current = self.get_entry_sync(&GetEntryRequest {
            user_id: req.search.clone(),
            ..GetEntryRequest::default()
        })?;
        let keys: Vec<&str> = current
            .entry
            .iter()
            .flat_map(|entry| entry.keys.iter())
            .map(|key| key.key.as_str())
            .collect();
        if keys.is_empty() {
            return Err(ServiceError::not_found(format!("no keys for '{}'", req.search)));
        }

        let machine_readable = req.options.split(',').any(|option| option.trim() == "mr");
        Ok(HttpBody {
            content_type: if machine_readable {
                "application/pgp-keys".to_string()
            } else {
                "text/plain".to_string()
            },
            body: keys.join("\n"),
        })
    }

    fn list_entry_history_sync(
        &self,
        req: &ListEntryHistoryRequest,
    ) -> Result<ListEntryHistoryResponse, ServiceError> {
        if req.user_id.is_empty() {
            return Err(ServiceError::invalid_argument("user_id is required"));
        }
        let state = self.state.read();
        let snapshots = state
            .history
            .get(&req.user_id)
            .ok_or_else(|| ServiceError::not_found(format!("user '{}' not found", req.user_id)))?;
        let (values, next) = paginate(snapshots, req.page_size, |s| s.epoch >= req.start_epoch);
        Ok(ListEntryHistoryResponse {
            values,
            next_epoch: next.map_or(0, |s| s.epoch),
        })
    }

    fn list_seh_sync(&self, req: &ListSehRequest) -> ListSehResponse {
        let state = self.state.read();
        let (heads, _) = paginate(&state.heads, req.page_size, |h| h.epoch >= req.start_epoch);
        ListSehResponse { heads }
    }

    fn list_update_sync(&self, req: &ListUpdateRequest) -> ListUpdateResponse {
        let state = self.state.read();
        let (updates, _) = paginate(&state.updates, req.page_size, |u| {
            u.commitment_timestamp >= req.start_commitment_timestamp
        });
        ListUpdateResponse { updates }
    }

    fn list_steps_sync(&self, req: &ListStepsRequest) -> ListStepsResponse {
        let state = self.state.read();
        let (steps, _) = paginate(&state.steps, req.page_size, |s| {
            s.commitment_timestamp >= req.start_commitment_timestamp
        });
        ListStepsResponse { steps }
    }
}

impl KeyService for MemoryDirectory {
    fn get_entry<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: GetEntryRequest,
    ) -> ServiceFuture<'a, GetEntryResponse> {
        future::ready(self.get_entry_sync(&req)).boxed()
    }

    fn hkp_lookup<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: HkpLookupRequest,
    ) -> ServiceFuture<'a, HttpBody> {
        future::ready(self.hkp_lookup_sync(&req)).boxed()
    }

    fn list_entry_history<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: ListEntryHistoryRequest,
    ) -> ServiceFuture<'a, ListEntryHistoryResponse> {
        future::ready(self.list_entry_history_sync(&req)).boxed()
    }

    fn update_entry<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: UpdateEntryRequest,
    ) -> ServiceFuture<'a, UpdateEntryResponse> {
        let result = self
            .write_key(&req.user_id, req.signed_key, WriteMode::Upsert)
            .map(|(_, snapshot)| UpdateEntryResponse {
                proof: Some(snapshot),
            });
        future::ready(result).boxed()
    }

    fn list_seh<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: ListSehRequest,
    ) -> ServiceFuture<'a, ListSehResponse> {
        future::ready(Ok(self.list_seh_sync(&req))).boxed()
    }

    fn list_update<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: ListUpdateRequest,
    ) -> ServiceFuture<'a, ListUpdateResponse> {
        future::ready(Ok(self.list_update_sync(&req))).boxed()
    }

    fn list_steps<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: ListStepsRequest,
    ) -> ServiceFuture<'a, ListStepsResponse> {
        future::ready(Ok(self.list_steps_sync(&req))).boxed()
    }

    fn create_key<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: CreateKeyRequest,
    ) -> ServiceFuture<'a, SignedKey> {
        let result = self
            .write_key(&req.user_id, req.signed_key, WriteMode::CreateOnly)
            .map(|(signed_key, _)| signed_key);
        future::ready(result).boxed()
    }

    fn update_key<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        req: UpdateKeyRequest,
    ) -> ServiceFuture<'a, SignedKey> {
        let result = bind_key_id(&req.key_id, req.signed_key).and_then(|signed_key| {
            self.write_key(&req.user_id, Some(signed_key), WriteMode::ReplaceOnly)
                .map(|(signed_key, _)| signed_key)
        });
        future::ready(result).boxed()
    }
}

/// Key ids are the app id the key belongs to.
fn bind_key_id(key_id: &str, signed_key: Option<SignedKey>) -> Result<SignedKey, ServiceError> {
    if key_id.is_empty() {
        return Err(ServiceError::invalid_argument("key_id is required"));
    }
    let mut signed_key =
        signed_key.ok_or_else(|| ServiceError::invalid_argument("signed_key is required"))?;
    let key = signed_key
        .key
        .as_mut()
        .ok_or_else(|| ServiceError::invalid_argument("signed_key.key is required"))?;
    if key.app_id.is_empty() {
        key.app_id = key_id.to_string();
    } else if key.app_id != key_id {
        return Err(ServiceError::invalid_argument(format!(
            "key.app_id '{}' does not match key id '{key_id}'",
            key.app_id
        )));
    }
    Ok(signed_key)
}

fn paginate<'a, T: Clone>(
    items: &'a [T],
    page_size: i32,
    keep: impl Fn(&T) -> bool,
) -> (Vec<T>, Option<&'a T>) {
    let limit = match usize::try_from(page_size) {
        Ok(0) | Err(_) => DEFAULT_PAGE_SIZE,
        Ok(n) => n.min(MAX_PAGE_SIZE),
    };
    let mut matching = items.iter().filter(|item| keep(item));
    let page: Vec<T> = matching.by_ref().take(limit).cloned().collect();
    (page, matching.next())
}

fn epoch_root(epoch: u64, snapshot: &GetEntryResponse) -> String {
    let mut hasher = FxHasher::default();
    epoch.hash(&mut hasher);
    if let Some(entry) = &snapshot.entry {
        entry.user_id.hash(&mut hasher);
        for key in &entry.keys {
            key.app_id.hash(&mut hasher);
            key.key.hash(&mut hasher);
        }
    }
    format!("{:016x}", hasher.finish())
}

fn now_timestamp() -> Timestamp {
    let now = OffsetDateTime::now_utc();
    Timestamp {
        seconds: now.unix_timestamp(),
        nanos: i32::try_from(now.nanosecond()).unwrap_or_default(),
    }
}

/// Room session lifecycle.
///
/// One `RoomSession` per joined room: it owns the root board store, the
/// sub-document registry, and the readiness state, and it is the single
/// place the transport binding feeds connection and sync events into.
/// Dropping the session releases everything at once — the state channel
/// closes and event receivers detach, so no listener can act on a released
/// document.
use loro::{LoroText, VersionVector};
use tokio::sync::{broadcast, watch};

use crate::fragment::FragmentScope;
use crate::registry::SubdocRegistry;
use crate::store::{BoardError, BoardStore};
use crate::sync::DocTarget;
use crate::types::BoardTree;

/// Two-stage readiness gate: consumers render nothing until `Connected`,
/// and nothing list-scoped until `Synced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
    Synced,
}

/// Events re-published to rendering surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The board tree changed (local mutation or remote import).
    TreeChanged,
    /// Full synchronization achieved; fires once per session.
    SyncCompleted,
}

pub struct RoomSession {
    room_id: String,
    store: BoardStore,
    registry: SubdocRegistry,
    state_tx: watch::Sender<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
    sync_completed: bool,
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("room_id", &self.room_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RoomSession {
    /// Enter a room: construct the root document (with its two root-level
    /// fragments) and an empty registry. The session starts in
    /// `Connecting`; the transport binding drives it forward.
    pub fn new(room_id: &str) -> Self {
        let store = BoardStore::new();
        let (state_tx, _) = watch::channel(SessionState::Connecting);
        let (event_tx, _) = broadcast::channel(64);
        log::info!("[pinboard.session.open] room {}", room_id);
        RoomSession {
            room_id: room_id.to_string(),
            store,
            registry: SubdocRegistry::new(),
            state_tx,
            event_tx,
            sync_completed: false,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    pub fn registry(&self) -> &SubdocRegistry {
        &self.registry
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Watch readiness transitions. The channel closes when the session is
    /// dropped, so a watcher can never outlive the documents.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to tree-change and sync events. Receivers detach by
    /// dropping.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn is_synced(&self) -> bool {
        self.sync_completed
    }

    // ── Transport-driven lifecycle ───────────────────────────────────────

    /// The transport established its connection.
    pub fn mark_connected(&self) {
        if *self.state_tx.borrow() == SessionState::Connecting {
            // send() drops the value when no receiver is subscribed;
            // send_replace publishes regardless.
            self.state_tx.send_replace(SessionState::Connected);
            log::info!("[pinboard.session.connected] room {}", self.room_id);
        }
    }

    /// Full synchronization achieved: all pre-existing remote state has
    /// been delivered. Fires the one-time registry rescan so every known
    /// list gains its sub-document before list surfaces first render.
    pub fn mark_sync_complete(&mut self) -> Result<(), BoardError> {
        if self.sync_completed {
            return Ok(());
        }
        // Latch only after the rescan succeeds, so a failed rescan can be
        // retried instead of leaving the session stuck short of Synced.
        self.refresh_subdocs()?;
        self.sync_completed = true;
        self.state_tx.send_replace(SessionState::Synced);
        let _ = self.event_tx.send(SessionEvent::SyncCompleted);
        log::info!("[pinboard.session.synced] room {}", self.room_id);
        Ok(())
    }

    /// Rescan the tree and ensure a sub-document per list. Invoked by
    /// `mark_sync_complete` and after every root import, so lists created
    /// after the initial sync reliably get their sub-document too. Returns
    /// how many were newly created.
    pub fn refresh_subdocs(&mut self) -> Result<usize, BoardError> {
        let tree = self.store.tree();
        self.registry.ensure_all(&self.store, &tree)
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Seed the board if no remote state exists yet.
    pub fn seed_if_empty(&self, seed: &BoardTree) -> Result<bool, BoardError> {
        let seeded = self.store.seed_if_empty(seed)?;
        if seeded {
            let _ = self.event_tx.send(SessionEvent::TreeChanged);
        }
        Ok(seeded)
    }

    pub fn add_list(&mut self) -> Result<String, BoardError> {
        let id = self.store.add_list()?;
        if self.sync_completed {
            self.registry.ensure(&self.store, &id)?;
        }
        let _ = self.event_tx.send(SessionEvent::TreeChanged);
        Ok(id)
    }

    /// Delete a list. Its sub-document is retained (documented policy —
    /// remote peers may still hold fragment references); callers wanting
    /// the memory back run `registry` pruning explicitly.
    pub fn delete_list(&mut self, list_id: &str) -> Result<bool, BoardError> {
        let removed = self.store.delete_list(list_id)?;
        if removed {
            let _ = self.event_tx.send(SessionEvent::TreeChanged);
        }
        Ok(removed)
    }

    pub fn add_card(&mut self, list_id: &str) -> Result<Option<String>, BoardError> {
        let added = self.store.add_card(list_id)?;
        if added.is_some() {
            let _ = self.event_tx.send(SessionEvent::TreeChanged);
        }
        Ok(added)
    }

    pub fn delete_card(&mut self, list_id: &str, card_id: &str) -> Result<bool, BoardError> {
        let removed = self.store.delete_card(list_id, card_id)?;
        if removed {
            let _ = self.event_tx.send(SessionEvent::TreeChanged);
        }
        Ok(removed)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub fn tree(&self) -> BoardTree {
        self.store.tree()
    }

    /// The board's root-level fragments, available as soon as the session
    /// exists.
    pub fn board_title_fragment(&self) -> LoroText {
        self.store.title_fragment()
    }

    pub fn board_description_fragment(&self) -> LoroText {
        self.store.description_fragment()
    }

    /// Resolve a list- or card-scoped fragment handle. Per-list data is
    /// unavailable until full synchronization, so this yields nothing
    /// before the sync signal has fired.
    pub fn fragment(
        &self,
        list_id: &str,
        scope: FragmentScope,
        owner_card_id: Option<&str>,
    ) -> Option<LoroText> {
        if !self.sync_completed {
            return None;
        }
        self.registry.fragment(list_id, scope, owner_card_id)
    }

    // ── Update routing ───────────────────────────────────────────────────

    /// Current version vector of one document of the family. `None` when a
    /// list target has no sub-document yet.
    pub fn version_of(&self, target: &DocTarget) -> Option<VersionVector> {
        match target {
            DocTarget::Root => Some(self.store.oplog_vv()),
            DocTarget::List { list_id } => self.registry.get(list_id).map(|doc| doc.oplog_vv()),
        }
    }

    /// Export updates for one document since a version vector. `None` when
    /// a list target has no sub-document yet.
    pub fn export_updates(
        &self,
        target: &DocTarget,
        since: &VersionVector,
    ) -> Result<Option<Vec<u8>>, BoardError> {
        match target {
            DocTarget::Root => self.store.export_updates_since(since).map(Some),
            DocTarget::List { list_id } => match self.registry.get(list_id) {
                Some(doc) => doc
                    .export(loro::ExportMode::updates(since))
                    .map(Some)
                    .map_err(|e| BoardError::Crdt(e.to_string())),
                None => Ok(None),
            },
        }
    }

    /// Import remote updates into one document of the family. Returns
    /// whether a document accepted them (a list target whose sub-document
    /// is unknown is skipped). A root import re-runs the registry rescan
    /// once synced, so remotely created lists gain sub-documents.
    pub fn import_updates(&mut self, target: &DocTarget, bytes: &[u8]) -> Result<bool, BoardError> {
        match target {
            DocTarget::Root => {
                self.store.import_updates(bytes)?;
                if self.sync_completed {
                    self.refresh_subdocs()?;
                }
                let _ = self.event_tx.send(SessionEvent::TreeChanged);
                Ok(true)
            }
            DocTarget::List { list_id } => match self.registry.get(list_id) {
                Some(doc) => {
                    doc.import(bytes)
                        .map_err(|e| BoardError::InvalidUpdate(e.to_string()))?;
                    Ok(true)
                }
                None => {
                    log::debug!(
                        "[pinboard.session.import] no subdoc for {}, dropping update",
                        list_id
                    );
                    Ok(false)
                }
            },
        }
    }

    /// Leave the room. Consuming the session drops the documents, closes
    /// the state channel, and detaches every event receiver.
    pub fn close(self) {
        log::info!("[pinboard.session.close] room {}", self.room_id);
    }
}

/// Awareness state and presence-scoped cursor filtering.
///
/// Awareness is ephemeral per-participant state (name, color, focused
/// fragment) carried by the transport's presence channel — it never enters
/// the CRDT documents and dies with the connection. Cursor and selection
/// decorations are derived from it, filtered to the fragment currently
/// bound to a rendering surface so cursors never leak across fields.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// One participant's ephemeral state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwarenessRecord {
    pub client_id: u64,
    pub name: String,
    pub color: String,
    /// Fragment key of the field this participant is editing.
    pub editor_id: String,
}

/// Cursor decoration for one participant on one rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorDecoration {
    /// Participant is focused on a different fragment — render nothing.
    Hidden,
    Caret { name: String, color: String },
}

/// Selection decoration for one participant on one rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionDecoration {
    Hidden,
    Highlight { color: String },
}

/// Derive the cursor decoration for a participant on the surface bound to
/// `surface_fragment`. Mismatching fragments produce an empty decoration.
pub fn cursor_decoration(record: &AwarenessRecord, surface_fragment: &str) -> CursorDecoration {
    if record.editor_id != surface_fragment {
        return CursorDecoration::Hidden;
    }
    CursorDecoration::Caret {
        name: record.name.clone(),
        color: record.color.clone(),
    }
}

/// Derive the selection decoration, with the same fragment filter as
/// [`cursor_decoration`].
pub fn selection_decoration(
    record: &AwarenessRecord,
    surface_fragment: &str,
) -> SelectionDecoration {
    if record.editor_id != surface_fragment {
        return SelectionDecoration::Hidden;
    }
    SelectionDecoration::Highlight {
        color: record.color.clone(),
    }
}

/// Local view of the shared awareness table.
///
/// The transport layer feeds remote records in via [`apply_remote`] /
/// [`remove`]; the local participant's record is written through
/// [`set_local`] whenever the bound user or focused fragment changes. Every
/// change re-publishes the flattened participant list on a broadcast
/// channel so rendering surfaces can recompute.
///
/// [`apply_remote`]: AwarenessTable::apply_remote
/// [`remove`]: AwarenessTable::remove
/// [`set_local`]: AwarenessTable::set_local
pub struct AwarenessTable {
    local_id: u64,
    states: HashMap<u64, AwarenessRecord>,
    update_tx: broadcast::Sender<Vec<AwarenessRecord>>,
}

impl std::fmt::Debug for AwarenessTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwarenessTable")
            .field("local_id", &self.local_id)
            .field("participants", &self.states.len())
            .finish()
    }
}

impl AwarenessTable {
    pub fn new(local_id: u64) -> Self {
        let (update_tx, _) = broadcast::channel(64);
        AwarenessTable {
            local_id,
            states: HashMap::new(),
            update_tx,
        }
    }

    pub fn local_id(&self) -> u64 {
        self.local_id
    }

    /// Write the local participant's record into the table.
    pub fn set_local(&mut self, name: &str, color: &str, editor_id: &str) {
        self.states.insert(
            self.local_id,
            AwarenessRecord {
                client_id: self.local_id,
                name: name.to_string(),
                color: color.to_string(),
                editor_id: editor_id.to_string(),
            },
        );
        self.publish();
    }

    /// Apply a remote participant's record (insert or overwrite).
    pub fn apply_remote(&mut self, record: AwarenessRecord) {
        self.states.insert(record.client_id, record);
        self.publish();
    }

    /// Drop a participant whose connection ended.
    pub fn remove(&mut self, client_id: u64) {
        if self.states.remove(&client_id).is_some() {
            self.publish();
        }
    }

    pub fn get(&self, client_id: u64) -> Option<&AwarenessRecord> {
        self.states.get(&client_id)
    }

    /// Flattened participant list, ordered by client id for stable
    /// rendering.
    pub fn participants(&self) -> Vec<AwarenessRecord> {
        let mut all: Vec<AwarenessRecord> = self.states.values().cloned().collect();
        all.sort_by_key(|r| r.client_id);
        all
    }

    /// Subscribe to re-published participant lists. Receivers detach by
    /// dropping, so an unmounted surface stops observing automatically.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<AwarenessRecord>> {
        self.update_tx.subscribe()
    }

    /// Cursor decorations for every remote participant, filtered to the
    /// given surface fragment.
    pub fn cursor_decorations(&self, surface_fragment: &str) -> Vec<(u64, CursorDecoration)> {
        self.participants()
            .iter()
            .filter(|r| r.client_id != self.local_id)
            .map(|r| (r.client_id, cursor_decoration(r, surface_fragment)))
            .collect()
    }

    fn publish(&self) {
        // No receivers just means no mounted surface is listening.
        let _ = self.update_tx.send(self.participants());
    }
}

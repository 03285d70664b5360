//! pinboard-core — collaborative kanban board core.
//!
//! Maps a tree-shaped board document (board → lists → cards, each with
//! rich-text title/description fields) onto a flat family of independently
//! syncable CRDT documents. The board structure lives in one root Loro
//! document; each list additionally owns a lazily created sub-document that
//! holds the list's and its cards' text fragments, addressed by a
//! deterministic key scheme.
//!
//! Conflict resolution, wire transport, and rich-text editing are supplied
//! by external collaborators; this crate owns the fragment naming scheme,
//! the structured mutations, the sub-document lifecycle, the session
//! readiness gates, and presence-scoped cursor filtering.

pub mod fragment;
pub mod identity;
pub mod presence;
pub mod registry;
pub mod session;
pub mod store;
pub mod sync;
pub mod types;

pub use fragment::{fragment_key, FragmentScope};
pub use presence::{
    cursor_decoration, selection_decoration, AwarenessRecord, AwarenessTable, CursorDecoration,
    SelectionDecoration,
};
pub use registry::SubdocRegistry;
pub use session::{RoomSession, SessionEvent, SessionState};
pub use store::{BoardError, BoardStore};
pub use sync::{ClientMessage, DocTarget, ServerMessage};
pub use types::{BoardTree, Card, List};

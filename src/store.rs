/// Structured board store on a Loro document.
///
/// Holds the shared board tree (ordered lists of lists of cards) plus the
/// board's two root-level text fragments and the shared sub-document
/// announcement map. All mutations are committed per logical operation so
/// the CRDT layer can merge them deterministically with concurrent edits
/// from other participants.
use loro::{
    Container, ExportMode, ImportStatus, LoroDoc, LoroMap, LoroMovableList, LoroText,
    ValueOrContainer, VersionVector,
};

use crate::fragment::{fragment_key, FragmentScope};
use crate::identity;
use crate::types::{BoardTree, Card, List};

/// Top-level container holding the ordered list sequence.
const LISTS_KEY: &str = "lists";
/// Top-level map announcing created sub-documents (list id → doc id).
const SUBDOCS_KEY: &str = "subdocs";

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("CRDT operation failed: {0}")]
    Crdt(String),

    #[error("Invalid update payload: {0}")]
    InvalidUpdate(String),
}

/// Convert any Display-able Loro error into a BoardError.
fn crdt_err(e: impl std::fmt::Display) -> BoardError {
    BoardError::Crdt(e.to_string())
}

// ── Helpers for reading Loro values ──────────────────────────────────────────

fn read_string(voc: &ValueOrContainer) -> Option<String> {
    voc.as_value()
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_string(map: &LoroMap, key: &str) -> String {
    map.get(key)
        .and_then(|v| read_string(&v))
        .unwrap_or_default()
}

fn get_movable_list(map: &LoroMap, key: &str) -> Option<LoroMovableList> {
    match map.get(key)? {
        ValueOrContainer::Container(Container::MovableList(ml)) => Some(ml),
        _ => None,
    }
}

fn get_map_at(list: &LoroMovableList, index: usize) -> Option<LoroMap> {
    match list.get(index)? {
        ValueOrContainer::Container(Container::Map(m)) => Some(m),
        _ => None,
    }
}

/// Shared board state backed by one root Loro document.
pub struct BoardStore {
    doc: LoroDoc,
}

impl std::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore").finish_non_exhaustive()
    }
}

impl Default for BoardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardStore {
    /// Create an empty store. The two root-level fragments are materialized
    /// eagerly so they exist before first render.
    pub fn new() -> Self {
        let doc = LoroDoc::new();
        let _ = doc.get_text(fragment_key(FragmentScope::Title, None).as_str());
        let _ = doc.get_text(fragment_key(FragmentScope::Description, None).as_str());
        BoardStore { doc }
    }

    pub fn set_peer_id(&self, peer_id: u64) -> Result<(), BoardError> {
        self.doc.set_peer_id(peer_id).map_err(crdt_err)
    }

    fn lists(&self) -> LoroMovableList {
        self.doc.get_movable_list(LISTS_KEY)
    }

    /// Apply a seed tree if the board holds no lists yet. Returns whether
    /// seeding happened. A board that already received remote state is left
    /// untouched.
    pub fn seed_if_empty(&self, seed: &BoardTree) -> Result<bool, BoardError> {
        let lists = self.lists();
        if !lists.is_empty() {
            return Ok(false);
        }
        for list in &seed.lists {
            let list_map: LoroMap = lists.push_container(LoroMap::new()).map_err(crdt_err)?;
            list_map.insert("id", list.id.as_str()).map_err(crdt_err)?;
            let cards: LoroMovableList = list_map
                .insert_container("cards", LoroMovableList::new())
                .map_err(crdt_err)?;
            for card in &list.cards {
                let card_map: LoroMap = cards.push_container(LoroMap::new()).map_err(crdt_err)?;
                card_map.insert("id", card.id.as_str()).map_err(crdt_err)?;
            }
        }
        self.doc.commit();
        log::info!("[pinboard.store.seed] seeded {} lists", seed.lists.len());
        Ok(true)
    }

    /// Locate a list by id with a fresh linear scan. Indices shift after
    /// any prior mutation, so the result must be used within the same
    /// logical operation and never cached.
    fn locate_list(&self, list_id: &str) -> Option<(usize, LoroMap)> {
        let lists = self.lists();
        for i in 0..lists.len() {
            if let Some(m) = get_map_at(&lists, i) {
                if get_string(&m, "id") == list_id {
                    return Some((i, m));
                }
            }
        }
        None
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Append a new empty list with a fresh id. Append is conflict-free on
    /// an ordered CRDT sequence, so this always succeeds.
    pub fn add_list(&self) -> Result<String, BoardError> {
        let id = identity::new_list_id();
        let lists = self.lists();
        let list_map: LoroMap = lists.push_container(LoroMap::new()).map_err(crdt_err)?;
        list_map.insert("id", id.as_str()).map_err(crdt_err)?;
        let _: LoroMovableList = list_map
            .insert_container("cards", LoroMovableList::new())
            .map_err(crdt_err)?;
        self.doc.commit();
        log::debug!("[pinboard.store.add_list] {}", id);
        Ok(id)
    }

    /// Delete a list by id. Returns whether a list was removed. A missing
    /// id never reaches the underlying sequence delete — calling it with a
    /// not-found sentinel is undefined behavior in the sequence primitive
    /// and must be guarded here.
    pub fn delete_list(&self, list_id: &str) -> Result<bool, BoardError> {
        let Some((index, _)) = self.locate_list(list_id) else {
            log::debug!("[pinboard.store.delete_list] {} not found, skipping", list_id);
            return Ok(false);
        };
        self.lists().delete(index, 1).map_err(crdt_err)?;
        self.doc.commit();
        log::debug!("[pinboard.store.delete_list] {}", list_id);
        Ok(true)
    }

    /// Append a new card to a list. Returns the fresh card id, or `None`
    /// when the list does not exist (silent no-op).
    pub fn add_card(&self, list_id: &str) -> Result<Option<String>, BoardError> {
        let Some((_, list_map)) = self.locate_list(list_id) else {
            return Ok(None);
        };
        let Some(cards) = get_movable_list(&list_map, "cards") else {
            return Ok(None);
        };
        let id = identity::new_card_id();
        let card_map: LoroMap = cards.push_container(LoroMap::new()).map_err(crdt_err)?;
        card_map.insert("id", id.as_str()).map_err(crdt_err)?;
        self.doc.commit();
        log::debug!("[pinboard.store.add_card] {} in {}", id, list_id);
        Ok(Some(id))
    }

    /// Delete a card by id within a list. No-op when either lookup misses.
    pub fn delete_card(&self, list_id: &str, card_id: &str) -> Result<bool, BoardError> {
        let Some((_, list_map)) = self.locate_list(list_id) else {
            return Ok(false);
        };
        let Some(cards) = get_movable_list(&list_map, "cards") else {
            return Ok(false);
        };
        let mut index = None;
        for i in 0..cards.len() {
            if let Some(card_map) = get_map_at(&cards, i) {
                if get_string(&card_map, "id") == card_id {
                    index = Some(i);
                    break;
                }
            }
        }
        let Some(index) = index else {
            return Ok(false);
        };
        cards.delete(index, 1).map_err(crdt_err)?;
        self.doc.commit();
        log::debug!("[pinboard.store.delete_card] {} in {}", card_id, list_id);
        Ok(true)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Snapshot the current board tree.
    pub fn tree(&self) -> BoardTree {
        let lists_container = self.lists();
        let mut lists = Vec::new();
        for i in 0..lists_container.len() {
            if let Some(list_map) = get_map_at(&lists_container, i) {
                let cards = if let Some(cl) = get_movable_list(&list_map, "cards") {
                    (0..cl.len())
                        .filter_map(|j| {
                            get_map_at(&cl, j).map(|cm| Card {
                                id: get_string(&cm, "id"),
                            })
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                lists.push(List {
                    id: get_string(&list_map, "id"),
                    cards,
                });
            }
        }
        BoardTree { lists }
    }

    /// The board's root title fragment.
    pub fn title_fragment(&self) -> LoroText {
        self.doc
            .get_text(fragment_key(FragmentScope::Title, None).as_str())
    }

    /// The board's root description fragment.
    pub fn description_fragment(&self) -> LoroText {
        self.doc
            .get_text(fragment_key(FragmentScope::Description, None).as_str())
    }

    // ── Sub-document announcements ───────────────────────────────────────

    /// Record a list's sub-document in the shared announcement map, unless
    /// an entry already exists. Concurrent announcements resolve
    /// last-write-wins at the map layer; the existence check here keeps
    /// double-creation rare, not impossible.
    pub fn announce_subdoc(&self, list_id: &str, doc_id: &str) -> Result<bool, BoardError> {
        let map = self.doc.get_map(SUBDOCS_KEY);
        if map.get(list_id).is_some() {
            return Ok(false);
        }
        map.insert(list_id, doc_id).map_err(crdt_err)?;
        self.doc.commit();
        Ok(true)
    }

    /// Read the announced sub-document id for a list, if any participant
    /// has created one.
    pub fn announced_subdoc(&self, list_id: &str) -> Option<String> {
        self.doc
            .get_map(SUBDOCS_KEY)
            .get(list_id)
            .and_then(|v| read_string(&v))
    }

    // ── Sync primitives ──────────────────────────────────────────────────

    /// Return the current operation-log version vector.
    pub fn oplog_vv(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    /// Export CRDT updates since a given version vector.
    pub fn export_updates_since(&self, vv: &VersionVector) -> Result<Vec<u8>, BoardError> {
        self.doc.export(ExportMode::updates(vv)).map_err(crdt_err)
    }

    /// Import remote CRDT updates into the root document.
    pub fn import_updates(&self, bytes: &[u8]) -> Result<ImportStatus, BoardError> {
        self.doc
            .import(bytes)
            .map_err(|e| BoardError::InvalidUpdate(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> BoardStore {
        let store = BoardStore::new();
        store.seed_if_empty(&BoardTree::starter()).unwrap();
        store
    }

    #[test]
    fn test_seed_applies_once() {
        let store = BoardStore::new();
        assert!(store.seed_if_empty(&BoardTree::starter()).unwrap());
        assert!(!store.seed_if_empty(&BoardTree::starter()).unwrap());
        assert_eq!(store.tree(), BoardTree::starter());
    }

    #[test]
    fn test_add_list_yields_distinct_empty_lists() {
        let store = BoardStore::new();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..5 {
            assert!(ids.insert(store.add_list().unwrap()));
        }
        let tree = store.tree();
        assert_eq!(tree.lists.len(), 5);
        for list in &tree.lists {
            assert!(list.cards.is_empty());
            assert!(ids.contains(&list.id));
        }
    }

    #[test]
    fn test_add_then_delete_card_round_trips() {
        let store = seeded_store();
        let before = store.tree().lists[0].cards.clone();

        let new_id = store.add_card("list-1").unwrap().unwrap();
        assert_eq!(store.tree().lists[0].cards.len(), before.len() + 1);

        assert!(store.delete_card("list-1", &new_id).unwrap());
        assert_eq!(store.tree().lists[0].cards, before);
    }

    #[test]
    fn test_add_card_to_missing_list_is_noop() {
        let store = seeded_store();
        assert_eq!(store.add_card("list-404").unwrap(), None);
        assert_eq!(store.tree(), BoardTree::starter());
    }

    #[test]
    fn test_delete_list_missing_id_is_noop() {
        let store = seeded_store();
        assert!(!store.delete_list("list-404").unwrap());
        assert_eq!(store.tree(), BoardTree::starter());
    }

    #[test]
    fn test_delete_card_missing_either_id_is_noop() {
        let store = seeded_store();
        assert!(!store.delete_card("list-404", "card-1").unwrap());
        assert!(!store.delete_card("list-1", "card-404").unwrap());
        assert_eq!(store.tree(), BoardTree::starter());
    }

    #[test]
    fn test_board_lifecycle_scenario() {
        // Start: [{id:"list-1", cards:[{id:"card-1"}]}]
        let store = seeded_store();

        let new_card = store.add_card("list-1").unwrap().unwrap();
        let cards: Vec<String> = store.tree().lists[0]
            .cards
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(cards, vec!["card-1".to_string(), new_card.clone()]);

        assert!(store.delete_card("list-1", "card-1").unwrap());
        let cards: Vec<String> = store.tree().lists[0]
            .cards
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(cards, vec![new_card]);

        assert!(store.delete_list("list-1").unwrap());
        assert!(store.tree().lists.is_empty());

        let new_list = store.add_list().unwrap();
        let tree = store.tree();
        assert_eq!(tree.lists.len(), 1);
        assert_eq!(tree.lists[0].id, new_list);
        assert!(tree.lists[0].cards.is_empty());
    }

    #[test]
    fn test_delete_uses_fresh_index() {
        let store = BoardStore::new();
        let a = store.add_list().unwrap();
        let b = store.add_list().unwrap();
        let c = store.add_list().unwrap();

        // Deleting the first list shifts the others; b must still be found
        // by id afterwards.
        assert!(store.delete_list(&a).unwrap());
        assert!(store.delete_list(&b).unwrap());
        let tree = store.tree();
        assert_eq!(tree.lists.len(), 1);
        assert_eq!(tree.lists[0].id, c);
    }

    #[test]
    fn test_root_fragments_exist_and_are_distinct() {
        let store = BoardStore::new();
        store.title_fragment().insert(0, "My board").unwrap();
        store
            .description_fragment()
            .insert(0, "What this board is for")
            .unwrap();
        assert_eq!(store.title_fragment().to_string(), "My board");
        assert_eq!(
            store.description_fragment().to_string(),
            "What this board is for"
        );
    }

    #[test]
    fn test_announce_subdoc_first_write_wins_locally() {
        let store = seeded_store();
        assert!(store.announce_subdoc("list-1", "doc-aaa").unwrap());
        assert!(!store.announce_subdoc("list-1", "doc-bbb").unwrap());
        assert_eq!(store.announced_subdoc("list-1"), Some("doc-aaa".into()));
        assert_eq!(store.announced_subdoc("list-404"), None);
    }

    #[test]
    fn test_update_exchange_between_peers() {
        let local = BoardStore::new();
        local.set_peer_id(1).unwrap();
        local.seed_if_empty(&BoardTree::starter()).unwrap();
        let new_card = local.add_card("list-1").unwrap().unwrap();

        let remote = BoardStore::new();
        remote.set_peer_id(2).unwrap();
        let delta = local
            .export_updates_since(&VersionVector::default())
            .unwrap();
        remote.import_updates(&delta).unwrap();

        assert_eq!(remote.tree(), local.tree());
        assert!(remote.tree().lists[0]
            .cards
            .iter()
            .any(|c| c.id == new_card));
    }

    #[test]
    fn test_concurrent_mutations_converge() {
        let a = BoardStore::new();
        a.set_peer_id(1).unwrap();
        a.seed_if_empty(&BoardTree::starter()).unwrap();

        let b = BoardStore::new();
        b.set_peer_id(2).unwrap();
        b.import_updates(&a.export_updates_since(&VersionVector::default()).unwrap())
            .unwrap();

        // Divergent edits
        let vv_a = a.oplog_vv();
        let vv_b = b.oplog_vv();
        a.add_card("list-1").unwrap().unwrap();
        b.add_list().unwrap();

        // Cross-import
        b.import_updates(&a.export_updates_since(&vv_a).unwrap())
            .unwrap();
        a.import_updates(&b.export_updates_since(&vv_b).unwrap())
            .unwrap();

        assert_eq!(a.tree(), b.tree());
        assert_eq!(a.tree().lists.len(), 2);
        assert_eq!(a.tree().lists[0].cards.len(), 2);
    }
}

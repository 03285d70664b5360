/// Lazy per-list sub-document registry.
///
/// Each list owns one independent collaborative document holding its own
/// title/description fragments plus one fragment pair per card. Documents
/// are created on first sighting of a list id, announced in the shared
/// `subdocs` map of the root store, and never recreated or reset on
/// re-observation.
///
/// The registry is an explicit service object owned by the session — sub-
/// documents are looked up through it, never through ambient state.
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use loro::{LoroDoc, LoroText};

use crate::fragment::{fragment_key, FragmentScope};
use crate::identity;
use crate::store::{BoardError, BoardStore};
use crate::types::BoardTree;

pub struct SubdocRegistry {
    docs: HashMap<String, LoroDoc>,
}

impl std::fmt::Debug for SubdocRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubdocRegistry")
            .field("lists", &self.docs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for SubdocRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubdocRegistry {
    pub fn new() -> Self {
        SubdocRegistry {
            docs: HashMap::new(),
        }
    }

    /// Ensure a sub-document exists for a list. Idempotent: an existing
    /// entry is returned untouched, so a racing second sighting can never
    /// reset a document. A concurrent remote creation is tolerated — the
    /// shared announcement map resolves last-write-wins while the local
    /// handle stays stable.
    pub fn ensure(&mut self, store: &BoardStore, list_id: &str) -> Result<&LoroDoc, BoardError> {
        match self.docs.entry(list_id.to_string()) {
            Entry::Occupied(existing) => {
                log::debug!("[pinboard.registry.ensure] subdoc exists for {}", list_id);
                Ok(existing.into_mut())
            }
            Entry::Vacant(slot) => {
                let doc = LoroDoc::new();
                // Materialize the list's own fragments eagerly, like the
                // root document does for the board fields.
                let _ = doc.get_text(fragment_key(FragmentScope::Title, None).as_str());
                let _ = doc.get_text(fragment_key(FragmentScope::Description, None).as_str());

                let doc_id = identity::new_doc_id();
                store.announce_subdoc(list_id, &doc_id)?;
                log::debug!(
                    "[pinboard.registry.create] subdoc {} for {}",
                    doc_id,
                    list_id
                );
                Ok(slot.insert(doc))
            }
        }
    }

    /// Look up a list's sub-document. Callers must query fresh on every
    /// render — another participant's create can land between observations.
    pub fn get(&self, list_id: &str) -> Option<&LoroDoc> {
        self.docs.get(list_id)
    }

    pub fn contains(&self, list_id: &str) -> bool {
        self.docs.contains_key(list_id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Full rescan: ensure a sub-document for every list in the tree.
    /// Returns how many were newly created. Run once when full
    /// synchronization is achieved, and again on any later tree change —
    /// idempotence makes the repeated rescan free.
    pub fn ensure_all(&mut self, store: &BoardStore, tree: &BoardTree) -> Result<usize, BoardError> {
        let mut created = 0;
        for list in &tree.lists {
            if !self.contains(&list.id) {
                self.ensure(store, &list.id)?;
                created += 1;
            }
        }
        if created > 0 {
            log::info!("[pinboard.registry.rescan] created {} subdocs", created);
        }
        Ok(created)
    }

    /// Resolve a text fragment inside a list's sub-document: the list's own
    /// field when `owner_card_id` is `None`, a card's field otherwise.
    pub fn fragment(
        &self,
        list_id: &str,
        scope: FragmentScope,
        owner_card_id: Option<&str>,
    ) -> Option<LoroText> {
        self.docs
            .get(list_id)
            .map(|doc| doc.get_text(fragment_key(scope, owner_card_id).as_str()))
    }

    /// Drop sub-documents whose list no longer exists in the tree. The
    /// default policy is to retain them forever (deleted lists keep their
    /// text history); this opt-in pass is for callers that want the memory
    /// back. Returns the pruned list ids.
    pub fn prune_orphans(&mut self, tree: &BoardTree) -> Vec<String> {
        let live: std::collections::HashSet<&str> = tree.list_ids().collect();
        let orphans: Vec<String> = self
            .docs
            .keys()
            .filter(|id| !live.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &orphans {
            self.docs.remove(id);
            log::debug!("[pinboard.registry.prune] dropped subdoc for {}", id);
        }
        orphans
    }
}

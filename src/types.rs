use serde::{Deserialize, Serialize};

/// A card in a list. Cards carry no inline content — their title and
/// description live as text fragments inside the owning list's sub-document,
/// addressed via [`crate::fragment::fragment_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
}

/// A list of cards. The id is immutable once created; board membership is
/// positional, identity is always by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub cards: Vec<Card>,
}

/// Plain snapshot of the board tree, read out of the synchronized store.
/// This is the read surface handed to the UI layer; it never aliases live
/// CRDT containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardTree {
    pub lists: Vec<List>,
}

impl BoardTree {
    /// The seed state applied to a freshly created room when no remote
    /// state exists yet: one list with one card.
    pub fn starter() -> Self {
        BoardTree {
            lists: vec![List {
                id: "list-1".to_string(),
                cards: vec![Card {
                    id: "card-1".to_string(),
                }],
            }],
        }
    }

    /// Locate a list by id (linear scan — position shifts on deletion, so
    /// indices are never part of identity).
    pub fn find_list(&self, list_id: &str) -> Option<&List> {
        self.lists.iter().find(|l| l.id == list_id)
    }

    pub fn list_ids(&self) -> impl Iterator<Item = &str> {
        self.lists.iter().map(|l| l.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_tree_shape() {
        let tree = BoardTree::starter();
        assert_eq!(tree.lists.len(), 1);
        assert_eq!(tree.lists[0].id, "list-1");
        assert_eq!(tree.lists[0].cards.len(), 1);
        assert_eq!(tree.lists[0].cards[0].id, "card-1");
    }

    #[test]
    fn test_find_list() {
        let tree = BoardTree::starter();
        assert!(tree.find_list("list-1").is_some());
        assert!(tree.find_list("list-404").is_none());
    }

    #[test]
    fn test_serde_shape() {
        let tree = BoardTree::starter();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["lists"][0]["id"], "list-1");
        assert_eq!(json["lists"][0]["cards"][0]["id"], "card-1");
    }
}

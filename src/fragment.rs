/// Fragment key derivation.
///
/// Every list and card carries two collaboratively edited text fragments
/// (title, description). Fragments are not attributes on the structured
/// records — they live in a side document and are looked up by exact string
/// match, so writer and reader must derive keys through this one scheme.

/// The two text fields every board, list, and card exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentScope {
    Title,
    Description,
}

impl FragmentScope {
    pub fn as_str(self) -> &'static str {
        match self {
            FragmentScope::Title => "title",
            FragmentScope::Description => "description",
        }
    }
}

/// Derive the canonical fragment key for a field.
///
/// Without an owner card the scope name is used verbatim (board root fields
/// and a list's own fields). With an owner card the key is suffixed with the
/// card id, which keeps card-scoped keys collision-free against list-scoped
/// ones inside the same sub-document.
pub fn fragment_key(scope: FragmentScope, owner_card_id: Option<&str>) -> String {
    match owner_card_id {
        Some(card_id) => format!("{}_{}", scope.as_str(), card_id),
        None => scope.as_str().to_string(),
    }
}

//! Concept resolution: mapping entity identifiers to language coverage.

use std::{
    borrow::Cow,
    collections::{BTreeSet, HashMap},
};

use crate::{EntityId, Language, LanguageSet};

/// An encyclopedia concept and the languages that hold an article for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    /// Entity the concept describes.
    pub entity: EntityId,
    /// Languages with a local article for the concept.
    pub languages: BTreeSet<Language>,
}

impl Concept {
    /// Construct a concept from its entity and article languages.
    pub fn new<I>(entity: EntityId, languages: I) -> Self
    where
        I: IntoIterator<Item = Language>,
    {
        Self {
            entity,
            languages: languages.into_iter().collect(),
        }
    }

    /// Report whether any of the concept's languages falls inside `scope`.
    ///
    /// # Examples
    /// ```
    /// use wikigeo_core::{Concept, EntityId, Language, LanguageSet};
    ///
    /// let concept = Concept::new(EntityId::new(64), [Language::new("de")?]);
    /// assert!(concept.in_language_scope(&"en,de".parse()?));
    /// assert!(!concept.in_language_scope(&"fr".parse()?));
    /// # Ok::<(), wikigeo_core::LanguageError>(())
    /// ```
    #[must_use]
    pub fn in_language_scope(&self, scope: &LanguageSet) -> bool {
        self.languages.iter().any(|language| scope.contains(language))
    }
}

/// Resolves entities to concepts.
///
/// Implementations are shared by every ingestion worker, so they must be
/// cheap to call concurrently.
pub trait ConceptResolver {
    /// Look up the concept for `entity`, returning `None` when unknown.
    fn resolve(&self, entity: &EntityId) -> Option<Cow<'_, Concept>>;

    /// Report whether `concept` is visible in `scope`.
    fn in_language_scope(&self, concept: &Concept, scope: &LanguageSet) -> bool {
        concept.in_language_scope(scope)
    }
}

/// In-memory [`ConceptResolver`] keyed by entity.
///
/// # Examples
/// ```
/// use wikigeo_core::{Concept, ConceptIndex, ConceptResolver, EntityId, Language};
///
/// let index: ConceptIndex = [Concept::new(EntityId::new(64), [Language::new("en")?])]
///     .into_iter()
///     .collect();
/// assert!(index.resolve(&EntityId::new(64)).is_some());
/// assert!(index.resolve(&EntityId::new(65)).is_none());
/// # Ok::<(), wikigeo_core::LanguageError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConceptIndex {
    concepts: HashMap<EntityId, Concept>,
}

impl ConceptIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a concept; languages accumulate across inserts.
    pub fn insert(&mut self, concept: Concept) {
        match self.concepts.get_mut(&concept.entity) {
            Some(existing) => existing.languages.extend(concept.languages),
            None => {
                self.concepts.insert(concept.entity, concept);
            }
        }
    }

    /// Number of indexed concepts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    /// Return whether the index holds no concepts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

impl FromIterator<Concept> for ConceptIndex {
    fn from_iter<T: IntoIterator<Item = Concept>>(iter: T) -> Self {
        let mut index = Self::new();
        for concept in iter {
            index.insert(concept);
        }
        index
    }
}

impl ConceptResolver for ConceptIndex {
    fn resolve(&self, entity: &EntityId) -> Option<Cow<'_, Concept>> {
        self.concepts.get(entity).map(Cow::Borrowed)
    }
}

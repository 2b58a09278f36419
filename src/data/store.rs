//! Per-entity document accumulator reset at every shard boundary.

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::Result,
    nlp::{model::EmbeddingModel, text::tokenize_all, vocab::VocabularySet},
};

/// Integer key of one application.
pub type EntityId = i64;

/// Raw claim text; `None` when the source cell was empty or null.
pub type Fragment = Option<String>;

/// Everything held for one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub fragments: Vec<Fragment>,
    pub vector: Option<Vec<f32>>,
    /// Tokens kept after model-vocabulary filtering, set by inference.
    pub word_count: Option<usize>,
    /// Tokens after punctuation stripping only, set without a model.
    pub token_count: Option<usize>,
}

/// Documents keyed by entity id, iterated in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: IndexMap<EntityId, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every document. The vocabulary lives elsewhere and is untouched.
    pub fn reset(&mut self) {
        self.documents = IndexMap::new();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.documents.keys().copied().collect()
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&Document> {
        self.documents.get(&entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Document)> {
        self.documents.iter().map(|(id, doc)| (*id, doc))
    }

    /// Append fragments to an entity, creating it if needed.
    ///
    /// A `sample` returning `false` skips the entity entirely. With a `vocab`,
    /// the entity's whole accumulated fragment list is re-tokenized and merged.
    pub fn add(
        &mut self,
        entity_id: EntityId,
        fragments: Vec<Fragment>,
        vocab: Option<&mut VocabularySet>,
        sample: Option<&mut dyn FnMut() -> bool>,
    ) {
        if let Some(sample) = sample {
            if !sample() {
                return;
            }
        }
        let document = self.documents.entry(entity_id).or_default();
        document.fragments.extend(fragments);
        if let Some(vocab) = vocab {
            vocab.add(tokenize_all(&document.fragments));
        }
    }

    /// Replace whatever is held for `entity_id`.
    pub fn insert(&mut self, entity_id: EntityId, document: Document) {
        self.documents.insert(entity_id, document);
    }

    /// Fold a document read from another shard into the store: fragments are
    /// appended, assigned values from `document` win when present.
    pub fn merge(&mut self, entity_id: EntityId, document: Document) {
        let existing = self.documents.entry(entity_id).or_default();
        existing.fragments.extend(document.fragments);
        if document.vector.is_some() {
            existing.vector = document.vector;
        }
        if document.word_count.is_some() {
            existing.word_count = document.word_count;
        }
        if document.token_count.is_some() {
            existing.token_count = document.token_count;
        }
    }

    /// Tokens of every fragment in order; empty for unknown ids.
    pub fn tokens_for(&self, entity_id: EntityId) -> Vec<String> {
        self.documents
            .get(&entity_id)
            .map(|doc| tokenize_all(&doc.fragments))
            .unwrap_or_default()
    }

    /// The entity's corpus line: all fragment tokens joined by single spaces.
    pub fn sentence_for(&self, entity_id: EntityId) -> String {
        self.tokens_for(entity_id).join(" ")
    }

    /// Infer a vector from the tokens the model knows and record how many there were.
    pub fn assign_vector<M>(&mut self, entity_id: EntityId, model: &M) -> Result<()>
    where
        M: EmbeddingModel + ?Sized,
    {
        if !self.documents.contains_key(&entity_id) {
            return Ok(());
        }
        let vocabulary = model.vocabulary();
        let tokens: Vec<String> = self
            .tokens_for(entity_id)
            .into_iter()
            .filter(|token| vocabulary.contains(token))
            .collect();
        let vector = model.infer(&tokens)?;
        if let Some(doc) = self.documents.get_mut(&entity_id) {
            doc.word_count = Some(tokens.len());
            doc.vector = Some(vector);
        }
        Ok(())
    }

    /// Record the unfiltered token count.
    pub fn compute_word_count(&mut self, entity_id: EntityId) {
        let count = self.tokens_for(entity_id).len();
        if let Some(doc) = self.documents.get_mut(&entity_id) {
            doc.token_count = Some(count);
        }
    }

    pub fn assign_all_vectors<M>(&mut self, model: &M) -> Result<()>
    where
        M: EmbeddingModel + ?Sized,
    {
        for entity_id in self.entity_ids() {
            self.assign_vector(entity_id, model)?;
        }
        debug!(entities = self.documents.len(), "assigned vectors");
        Ok(())
    }

    pub fn compute_all_word_counts(&mut self) {
        for entity_id in self.entity_ids() {
            self.compute_word_count(entity_id);
        }
    }

    /// Sum of unfiltered token counts computed so far.
    pub fn total_tokens(&self) -> usize {
        self.documents
            .values()
            .filter_map(|doc| doc.token_count)
            .sum()
    }
}

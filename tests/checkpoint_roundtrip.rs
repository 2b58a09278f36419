use claim_vectors::{
    data::{
        checkpoint::{read_checkpoint, read_checkpoint_file, write_checkpoint},
        CheckpointForm, Document, DocumentStore, ShardLayout,
    },
    nlp::HashedMeanModel,
};
use tempfile::tempdir;

fn awkward_store() -> DocumentStore {
    let mut store = DocumentStore::new();
    store.add(
        101,
        vec![
            Some("1. A valve, wherein the 'seat' is conical.".into()),
            None,
            Some("2. The valve of claim 1,\nfurther comprising a spring''s end".into()),
            Some(String::new()),
        ],
        None,
        None,
    );
    store.add(102, vec![Some("[bracketed], nan".into())], None, None);
    store.add(103, vec![], None, None);
    store
}

#[test]
fn full_checkpoint_round_trips_claims_and_counts() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("claims_000.csv");
    let model = HashedMeanModel::new(6, 9, ["valve", "spring''s", "nan"].into_iter().collect())
        .expect("model");
    let mut store = awkward_store();
    store.assign_vector(101, &model).expect("assign");
    store.compute_all_word_counts();

    write_checkpoint(&store, &path, CheckpointForm::Full).expect("write");
    let restored = read_checkpoint_file(&path).expect("read");

    assert_eq!(restored.entity_ids(), store.entity_ids());
    for (id, original) in store.iter() {
        assert_eq!(restored.get(id), Some(original), "entity {id}");
    }
    let header = std::fs::read_to_string(&path).unwrap();
    assert!(header.starts_with("id,claims,vector,word_count,token_count\n"));
}

#[test]
fn double_quotes_become_single_quotes() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("claims_000.csv");
    let mut store = DocumentStore::new();
    store.add(1, vec![Some(r#"a "so-called" hinge"#.into())], None, None);

    write_checkpoint(&store, &path, CheckpointForm::Full).expect("write");
    let restored = read_checkpoint_file(&path).expect("read");
    assert_eq!(
        restored.get(1).unwrap().fragments,
        vec![Some("a 'so-called' hinge".to_string())]
    );
}

#[test]
fn vector_checkpoints_merge_across_shards() {
    let dir = tempdir().expect("tempdir");
    let layout = ShardLayout::new(dir.path(), "vectors_", 3, "csv");
    for (index, ids) in [(0usize, [1i64, 2]), (1, [3, 4])] {
        let mut store = DocumentStore::new();
        for id in ids {
            store.insert(
                id,
                Document {
                    vector: Some(vec![id as f32 * 0.1, -0.5]),
                    word_count: Some(id as usize),
                    ..Document::default()
                },
            );
        }
        write_checkpoint(&store, &layout.path(index), CheckpointForm::Vectors).expect("write");
    }

    let merged = read_checkpoint(&layout, 2).expect("read");
    assert_eq!(merged.entity_ids(), vec![1, 2, 3, 4]);
    let third = merged.get(3).unwrap();
    assert_eq!(third.vector, Some(vec![3.0f32 * 0.1, -0.5]));
    assert_eq!(third.word_count, Some(3));
    assert!(third.fragments.is_empty());
    let text = std::fs::read_to_string(layout.path(0)).unwrap();
    assert!(text.starts_with("id,word_count,vector\n"));
}

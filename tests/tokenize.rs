use claim_vectors::{
    data::DocumentStore,
    nlp::{strip_punctuation, tokenize},
};

#[test]
fn punctuation_example_tokenizes() {
    assert_eq!(
        tokenize("A widget (Model: 7), cost: $5/unit."),
        vec!["A", "widget", "Model", "7", "cost", "$5", "unit"]
    );
}

#[test]
fn stripping_deletes_rather_than_spaces() {
    assert_eq!(strip_punctuation("end.Start"), "endStart");
    assert_eq!(strip_punctuation("[1]"), "1");
}

#[test]
fn tokens_after_reset_match_joined_fragments() {
    let fragments = vec![
        "1. A hinge, comprising:".to_string(),
        "a pin/axle; and".to_string(),
        "a leaf (optional)!".to_string(),
    ];
    let mut store = DocumentStore::new();
    store.add(11, vec![Some("stale text".into())], None, None);
    store.reset();
    store.add(11, fragments.iter().cloned().map(Some).collect(), None, None);

    assert_eq!(store.tokens_for(11), tokenize(fragments.join(" ").as_str()));
}

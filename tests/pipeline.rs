use std::path::Path;

use claim_vectors::{
    config::Settings,
    data::{checkpoint::read_checkpoint_file, ShardColumns},
    nlp::{EmbeddingModel, HashedMeanTrainer, VocabularySet},
    pipeline::{
        self, collect_results, run_corpus, run_inference, training::CorpusOptions, Mode,
        RunManifest, ShardRange,
    },
};
use tempfile::{tempdir, TempDir};

const SHARDS: usize = 8;

fn write_shards(settings: &Settings) {
    let layout = settings.shard_layout();
    std::fs::create_dir_all(&layout.dir).expect("shard dir");
    for index in 0..SHARDS {
        let base = (index as i64) * 10;
        let body = format!(
            "app_id,claim_no,text\n\
             {a},2,\"The gear of claim 1, wherein the shaft rotates.\"\n\
             {a},1,1. A gear assembly comprising a shaft.\n\
             {b},1,A rotor/stator pair; and a housing (sealed).\n\
             {c},1,\n",
            a = base + 1,
            b = base + 2,
            c = base + 3,
        );
        std::fs::write(layout.path(index), body).expect("write shard");
    }
}

fn setup() -> (TempDir, Settings) {
    let dir = tempdir().expect("tempdir");
    let mut settings = Settings::rooted(dir.path().join("data"), dir.path().join("outputs"));
    settings.vector_dim = 8;
    settings.min_count = 1;
    std::fs::create_dir_all(&settings.outputs_dir).expect("outputs");
    write_shards(&settings);
    (dir, settings)
}

fn corpus_options(range: ShardRange, sample_rate: f64) -> CorpusOptions {
    CorpusOptions {
        range,
        sample_rate,
        seed: 5,
        columns: ShardColumns::default(),
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read")
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn corpus_pass_writes_corpus_index_and_vocabulary() {
    let (_dir, settings) = setup();
    let range = ShardRange::new(0, 2).expect("range");
    let summary = run_corpus(&settings, &corpus_options(range, 1.0)).expect("corpus");

    assert_eq!(summary.shards, 2);
    assert_eq!(summary.lines, 6);
    let lines = read_lines(&settings.corpus_path());
    assert_eq!(
        lines[0],
        "1 A gear assembly comprising a shaft The gear of claim 1 wherein the shaft rotates"
    );
    assert_eq!(lines[1], "A rotor stator pair and a housing sealed");
    assert_eq!(lines[2], "");

    let index = read_lines(&settings.corpus_index_path());
    assert_eq!(index[0], "line,entity_id,shard");
    assert_eq!(index[4], "3,11,1");

    let vocab = VocabularySet::from_file(&settings.vocab_path()).expect("vocab");
    assert!(vocab.contains("rotor"));
    assert!(vocab.contains("stator"));
    assert!(!vocab.contains("stator;"));
    assert_eq!(vocab.len(), summary.vocabulary);
}

#[test]
fn resumed_corpus_pass_drops_half_written_shard() {
    let (_dir, settings) = setup();
    run_corpus(&settings, &corpus_options(ShardRange::new(0, 2).unwrap(), 1.0)).expect("first");
    std::fs::OpenOptions::new()
        .append(true)
        .open(settings.corpus_path())
        .and_then(|mut f| std::io::Write::write_all(&mut f, b"partial line\n"))
        .expect("simulate crash");

    let summary =
        run_corpus(&settings, &corpus_options(ShardRange::new(2, 3).unwrap(), 1.0)).expect("resume");
    assert_eq!(summary.lines, 9);
    let lines = read_lines(&settings.corpus_path());
    assert_eq!(lines.len(), 9);
    assert!(!lines.iter().any(|l| l == "partial line"));
}

#[test]
fn resumed_corpus_pass_keeps_earlier_vocabulary() {
    let (_dir, settings) = setup();
    let layout = settings.shard_layout();
    std::fs::write(layout.path(0), "app_id,claim_no,text\n1,1,A flywheel.\n").expect("shard 0");
    std::fs::write(layout.path(1), "app_id,claim_no,text\n11,1,A camshaft.\n").expect("shard 1");
    run_corpus(&settings, &corpus_options(ShardRange::new(0, 2).unwrap(), 1.0)).expect("first");

    // An interrupted replacing save leaves only its temp file behind.
    let tmp = settings.vocab_path().with_extension("txt.tmp");
    std::fs::write(&tmp, "").expect("stale tmp");

    let summary =
        run_corpus(&settings, &corpus_options(ShardRange::new(2, 3).unwrap(), 1.0)).expect("resume");
    let vocab = VocabularySet::from_file(&settings.vocab_path()).expect("vocab");
    for word in ["flywheel", "camshaft", "rotor"] {
        assert!(vocab.contains(word), "{word} missing after resume");
    }
    assert_eq!(vocab.len(), summary.vocabulary);
    assert!(!tmp.exists());
}

#[test]
fn zero_sample_rate_writes_nothing() {
    let (_dir, settings) = setup();
    let summary =
        run_corpus(&settings, &corpus_options(ShardRange::new(0, 3).unwrap(), 0.0)).expect("corpus");
    assert_eq!(summary.entities, 0);
    assert_eq!(summary.vocabulary, 0);
    assert_eq!(std::fs::read_to_string(settings.corpus_path()).unwrap(), "");
}

#[test]
fn inference_resume_leaves_earlier_results_alone() {
    let (_dir, settings) = setup();
    run_corpus(&settings, &corpus_options(ShardRange::new(0, SHARDS).unwrap(), 1.0)).expect("corpus");
    let trainer = HashedMeanTrainer {
        dimension: settings.vector_dim,
        min_count: 2,
        seed: settings.seed,
    };
    let model = pipeline::train_model(&settings, &trainer).expect("train");
    assert!(model.vocabulary().contains("gear"));

    let layout = settings.vector_layout();
    std::fs::create_dir_all(&layout.dir).expect("vector dir");
    for index in 0..5 {
        std::fs::write(layout.path(index), "sentinel").expect("sentinel");
    }

    let range = ShardRange::resolve(5, None, &settings.shard_layout()).expect("range");
    assert_eq!(range, ShardRange::new(5, SHARDS).unwrap());
    let summary =
        run_inference(&settings, &model, range, &ShardColumns::default()).expect("inference");
    assert_eq!(summary.shards, 3);
    assert_eq!(summary.entities, 9);
    assert_eq!(summary.empty_documents, 3);

    for index in 0..5 {
        assert_eq!(std::fs::read_to_string(layout.path(index)).unwrap(), "sentinel");
    }
    for index in 5..SHARDS {
        let store = read_checkpoint_file(&layout.path(index)).expect("result");
        assert_eq!(store.len(), 3);
        let first = store.get(index as i64 * 10 + 1).expect("first entity");
        assert_eq!(first.vector.as_ref().map(Vec::len), Some(settings.vector_dim));
        assert!(first.word_count.unwrap_or_default() > 0);
        let empty = store.get(index as i64 * 10 + 3).expect("empty entity");
        assert_eq!(empty.word_count, Some(0));
        assert_eq!(empty.vector, Some(vec![0.0; settings.vector_dim]));
    }

    let manifest = RunManifest::load_or_default(&settings.manifest_path()).expect("manifest");
    assert_eq!(manifest.next_shard(Mode::Inference), SHARDS);
}

#[test]
fn collect_merges_all_result_shards() {
    let (dir, settings) = setup();
    run_corpus(&settings, &corpus_options(ShardRange::new(0, SHARDS).unwrap(), 1.0)).expect("corpus");
    let trainer = HashedMeanTrainer {
        dimension: settings.vector_dim,
        min_count: 1,
        seed: settings.seed,
    };
    let model = pipeline::train_model(&settings, &trainer).expect("train");
    run_inference(
        &settings,
        &model,
        ShardRange::new(0, SHARDS).unwrap(),
        &ShardColumns::default(),
    )
    .expect("inference");

    let output = dir.path().join("all_vectors.csv");
    let entities = collect_results(&settings, SHARDS, &output).expect("collect");
    assert_eq!(entities, SHARDS * 3);
    let merged = read_checkpoint_file(&output).expect("read merged");
    assert_eq!(merged.len(), SHARDS * 3);
}

#[test]
fn snapshot_keeps_raw_claims_and_token_counts() {
    let (_dir, settings) = setup();
    pipeline::run_snapshot(
        &settings,
        ShardRange::new(0, 1).unwrap(),
        &ShardColumns::default(),
    )
    .expect("snapshot");

    let store = read_checkpoint_file(&settings.checkpoint_layout().path(0)).expect("read");
    let first = store.get(1).expect("entity 1");
    assert_eq!(
        first.fragments,
        vec![
            Some("1. A gear assembly comprising a shaft.".to_string()),
            Some("The gear of claim 1, wherein the shaft rotates.".to_string()),
        ]
    );
    assert_eq!(first.token_count, Some(16));
    assert_eq!(first.word_count, None);
    assert_eq!(store.get(3).unwrap().fragments, vec![None]);
}

#[test]
fn missing_shard_in_range_is_fatal() {
    let (_dir, settings) = setup();
    let err = run_corpus(
        &settings,
        &corpus_options(ShardRange::new(0, SHARDS + 1).unwrap(), 1.0),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        claim_vectors::PipelineError::MissingShard { index, .. } if index == SHARDS
    ));
}

//! End-to-end grounding against on-disk reference files.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Instant;

use proptest::prelude::*;
use tempfile::NamedTempFile;
use umls_core::{
    GroundingBatch, GroundingEngine, GroundingError, collect_mentions, coverage_rows,
    enrich_documents,
};
use umls_ingest::{ReferenceScanner, ScanControl, ScanOptions};
use umls_model::{
    ExtractedDocument, ExtractedEntity, GroundingOptions, KeyKind, Mention, SemanticTypeOptions,
};

fn conso(cui: &str, lat: &str, ispref: bool, sab: &str, tty: &str, surface: &str) -> String {
    let ispref = if ispref { "Y" } else { "N" };
    format!("{cui}|{lat}|P|L1|PF|S1|{ispref}|A1||||{sab}|{tty}|CODE|{surface}|0|N||")
}

fn reference(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    for line in lines {
        writeln!(file, "{line}").expect("write");
    }
    file.flush().expect("flush");
    file
}

fn ground_with(
    options: GroundingOptions,
    mentions: Vec<Mention>,
    lines: &[String],
    shards: usize,
) -> GroundingBatch {
    let file = reference(lines);
    let scanner = ReferenceScanner::open(file.path()).expect("open reference");
    GroundingEngine::new(options)
        .expect("engine")
        .ground(mentions, &scanner, &ScanOptions::default().with_shards(shards))
        .expect("ground")
}

fn ground(mentions: Vec<Mention>, lines: &[String]) -> GroundingBatch {
    ground_with(GroundingOptions::default(), mentions, lines, 1)
}

fn pneumonia_rows() -> Vec<String> {
    vec![
        conso("C0032286", "ENG", false, "MSH", "ET", "pneumonia"),
        conso("C0032285", "ENG", true, "SNOMEDCT_US", "PT", "pneumonia"),
    ]
}

#[test]
fn pneumonia_resolves_to_preferred_snomed_concept() {
    let batch = ground(vec![Mention::untyped("Pneumonia")], &pneumonia_rows());
    let result = batch.lookup("Pneumonia").expect("result");
    assert_eq!(result.best_cui.as_deref(), Some("C0032285"));
    assert_eq!(result.candidates.len(), 2);
    assert_eq!(result.candidates[1].cui, "C0032286");
    assert_eq!(result.excluded_reason, None);
    assert_eq!(batch.stats.mapped, 1);
    assert_eq!(batch.stats.index.scan.admissible, 2);
}

#[test]
fn measurements_are_excluded_even_with_matches() {
    let lines = vec![
        conso("C1", "ENG", true, "MSH", "MH", "3.5 cm"),
        conso("C2", "ENG", true, "MSH", "MH", "cm"),
        conso("C3", "ENG", true, "MSH", "MH", "10mm"),
    ];
    let batch = ground(
        vec![
            Mention::untyped("3.5 cm"),
            Mention::untyped("10mm"),
            Mention::untyped("2 m"),
        ],
        &lines,
    );
    assert_eq!(batch.len(), 3);
    for grounded in batch.mentions.values() {
        assert!(grounded.keys.is_measurement);
        assert_eq!(grounded.result.best_cui, None);
        assert!(grounded.result.candidates.is_empty());
        assert_eq!(
            grounded.result.excluded_reason.map(|r| r.as_str()),
            Some("measurement_like")
        );
    }
    assert_eq!(batch.stats.excluded, 3);
}

#[test]
fn earlier_source_preference_ranks_first() {
    let lines = vec![
        conso("C_MSH", "ENG", true, "MSH", "MH", "Atelectasis"),
        conso("C_SCT", "ENG", true, "SNOMEDCT_US", "PT", "Atelectasis"),
    ];
    let batch = ground(vec![Mention::untyped("atelectasis")], &lines);
    let result = batch.lookup("atelectasis").expect("result");
    assert_eq!(result.best_cui.as_deref(), Some("C_SCT"));

    let reversed = ground_with(
        GroundingOptions::default().with_source_preference(["MSH", "SNOMEDCT_US"]),
        vec![Mention::untyped("atelectasis")],
        &lines,
        1,
    );
    assert_eq!(
        reversed.lookup("atelectasis").and_then(|r| r.best_cui.as_deref()),
        Some("C_MSH")
    );
}

#[test]
fn candidates_are_truncated_to_top_k() {
    let lines: Vec<String> = (0..8)
        .map(|i| conso(&format!("C{i}"), "ENG", true, "MSH", "MH", "Opacity"))
        .collect();
    let batch = ground_with(
        GroundingOptions::default().with_top_k(3),
        vec![Mention::untyped("opacity")],
        &lines,
        1,
    );
    let result = batch.lookup("opacity").expect("result");
    let cuis: Vec<&str> = result.candidates.iter().map(|c| c.cui.as_str()).collect();
    assert_eq!(cuis, vec!["C0", "C1", "C2"]);
    assert_eq!(result.best_cui.as_deref(), Some("C0"));
}

#[test]
fn head_candidates_match_when_full_text_does_not() {
    let lines = vec![
        conso("C0032227", "ENG", true, "SNOMEDCT_US", "PT", "Pleural effusion"),
        conso("C0013687", "ENG", false, "SNOMEDCT_US", "PT", "Effusion"),
    ];
    let batch = ground(vec![Mention::untyped("small left pleural effusion")], &lines);
    let result = batch.lookup("small left pleural effusion").expect("result");
    assert_eq!(result.best_cui.as_deref(), Some("C0032227"));
    assert_eq!(result.candidates[0].matched_key, "pleural effusion");
    assert_eq!(result.candidates[0].matched_key_kind, KeyKind::Head);
    assert_eq!(result.candidates.len(), 2);
}

#[test]
fn non_english_and_malformed_rows_never_match() {
    let lines = vec![
        conso("C_FR", "FRE", true, "MSHFRE", "MH", "Pneumonia"),
        "C_SHORT|ENG|P|pneumonia".to_string(),
    ];
    let batch = ground(vec![Mention::untyped("pneumonia")], &lines);
    let result = batch.lookup("pneumonia").expect("result");
    assert_eq!(result.best_cui, None);
    assert_eq!(result.excluded_reason, None);
    assert_eq!(batch.stats.index.scan.non_english, 1);
    assert_eq!(batch.stats.index.scan.malformed, 1);
    assert_eq!(batch.stats.unmapped, 1);
}

#[test]
fn empty_mention_resolves_to_nothing() {
    let lines = vec![conso("C1", "ENG", true, "MSH", "MH", "???")];
    let batch = ground(vec![Mention::untyped("???")], &lines);
    let grounded = &batch.mentions[""];
    assert!(grounded.keys.keys.is_empty());
    assert_eq!(grounded.result.best_cui, None);
    assert_eq!(grounded.result.excluded_reason, None);
    assert!(grounded.result.candidates.is_empty());
}

#[test]
fn semantic_filter_restricts_typed_mentions() {
    let lines = vec![
        conso("C_ORGAN", "ENG", true, "SNOMEDCT_US", "PT", "Heart"),
        conso("C_FINDING", "ENG", true, "MSH", "MH", "Heart"),
    ];
    let mapping = BTreeMap::from([
        ("C_ORGAN".to_string(), ["T023".to_string()].into()),
        ("C_FINDING".to_string(), ["T033".to_string()].into()),
    ]);
    let options = GroundingOptions::default().with_semantic_types(
        SemanticTypeOptions::default()
            .enabled(true)
            .with_mapping(mapping)
            .with_anatomy_codes(["T023"])
            .with_observation_codes(["T033"]),
    );

    let batch = ground_with(
        options.clone(),
        vec![Mention::new("heart", ["OBSERVATION"])],
        &lines,
        1,
    );
    let result = batch.lookup("heart").expect("result");
    assert_eq!(result.best_cui.as_deref(), Some("C_FINDING"));
    assert_eq!(result.candidates.len(), 1);

    let labelled = ground_with(
        options.clone(),
        vec![Mention::new("heart", ["OBS-DP"])],
        &lines,
        1,
    );
    let cuis: Vec<&str> = labelled
        .lookup("heart")
        .expect("result")
        .candidates
        .iter()
        .map(|c| c.cui.as_str())
        .collect();
    assert_eq!(cuis.len(), 2);
    assert!(cuis.contains(&"C_ORGAN") && cuis.contains(&"C_FINDING"));

    let untyped = ground_with(options, vec![Mention::untyped("heart")], &lines, 1);
    assert_eq!(untyped.lookup("heart").map(|r| r.candidates.len()), Some(2));
}

#[test]
fn shared_mention_across_documents_is_grounded_once() {
    let entity = |text: &str| ExtractedEntity {
        text: text.to_string(),
        entity_type: "OBS-DP".to_string(),
        start: Some(0),
        end: Some(1),
    };
    let documents: Vec<ExtractedDocument> = ["r1", "r2"]
        .into_iter()
        .map(|id| ExtractedDocument {
            id: id.to_string(),
            entities: BTreeMap::from([("1".to_string(), entity("consolidation"))]),
            relations: Vec::new(),
        })
        .collect();
    let mentions = collect_mentions(&documents);
    assert_eq!(mentions.len(), 1);

    let lines = vec![conso("C0521530", "ENG", true, "SNOMEDCT_US", "PT", "Consolidation")];
    let batch = ground(mentions, &lines);
    assert_eq!(batch.stats.mentions, 1);

    let (enriched, stats) = enrich_documents(&documents, &batch);
    assert_eq!(stats.grounded_entities, 2);
    for document in &enriched {
        assert_eq!(document.entities["1"].cui.as_deref(), Some("C0521530"));
        assert_eq!(document.entities["1"].candidates.len(), 1);
    }

    let rows = coverage_rows(&batch);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mention, "consolidation");
    assert_eq!(rows[0].types_seen, "OBS-DP");
    assert_eq!(rows[0].top_match_kind.as_deref(), Some("full_norm"));
}

#[test]
fn missing_reference_file_is_fatal_before_grounding() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = ReferenceScanner::open(dir.path().join("MRCONSO.RRF")).unwrap_err();
    assert!(matches!(err, umls_ingest::IngestError::FileNotFound { .. }));
}

#[test]
fn cancelled_scan_returns_no_results() {
    let file = reference(&pneumonia_rows());
    let scanner = ReferenceScanner::open(file.path()).expect("open");
    let control = ScanControl::new();
    control.cancel();
    let engine = GroundingEngine::new(GroundingOptions::default()).expect("engine");
    let err = engine
        .ground(
            [Mention::untyped("pneumonia")],
            &scanner,
            &ScanOptions::default().with_control(control),
        )
        .unwrap_err();
    assert!(err.is_cancellation());

    let expired = ScanControl::new().with_deadline(Instant::now());
    let err = engine
        .ground(
            [Mention::untyped("pneumonia")],
            &scanner,
            &ScanOptions::default().with_control(expired),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GroundingError::Ingest(umls_ingest::IngestError::DeadlineExceeded { .. })
    ));
}

fn determinism_rows() -> Vec<String> {
    vec![
        conso("C0032227", "ENG", true, "SNOMEDCT_US", "PT", "Pleural effusion"),
        conso("C0032227", "ENG", false, "SNOMEDCT_US", "PT", "Pleural-effusion"),
        conso("C0032227", "ENG", true, "MSH", "MH", "Effusion, Pleural"),
        conso("C0013687", "ENG", true, "SNOMEDCT_US", "PT", "Effusion"),
        conso("C0013687", "ENG", false, "NCI", "SY", "effusion"),
        conso("C0032285", "ENG", true, "SNOMEDCT_US", "PT", "Pneumonia"),
        conso("C0032286", "ENG", false, "MSH", "ET", "pneumonia"),
        conso("C0521530", "ENG", true, "SNOMEDCT_US", "PT", "Consolidation"),
        conso("C0521530", "ENG", true, "RXNORM", "PT", "consolidation"),
        conso("C0024109", "ENG", true, "SNOMEDCT_US", "PT", "Lung"),
        conso("C0024109", "ENG", true, "MSH", "MH", "Lungs"),
        conso("C0024109", "SPA", true, "MSHSPA", "MH", "Pulmon"),
        conso("C0004144", "ENG", true, "SNOMEDCT_US", "PT", "Atelectasis"),
        conso("C0004144", "ENG", false, "CHV", "SY", "lung collapse"),
        conso("C9", "ENG", true, "MSH", "MH", "3.5 cm"),
        "broken|row".to_string(),
    ]
}

fn determinism_mentions() -> Vec<Mention> {
    vec![
        Mention::new("small left pleural effusion", ["OBS-DP"]),
        Mention::new("Pleural effusion", ["OBS-DP"]),
        Mention::new("pneumonia", ["OBS-DA"]),
        Mention::new("Consolidation", ["OBS-DP"]),
        Mention::new("consolidation", ["OBS-U"]),
        Mention::new("lungs", ["ANAT-DP"]),
        Mention::new("right lung", ["ANAT-DP"]),
        Mention::new("mild bibasilar atelectasis", ["OBS-DP"]),
        Mention::new("3.5 cm", ["OBS-DP"]),
        Mention::untyped("effusion"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn grounding_ignores_mention_order_row_order_and_shards(
        mentions in Just(determinism_mentions()).prop_shuffle(),
        rows in Just(determinism_rows()).prop_shuffle(),
        shards in 1usize..6,
    ) {
        let baseline = ground(determinism_mentions(), &determinism_rows());
        let batch = ground_with(GroundingOptions::default(), mentions, &rows, shards);
        prop_assert_eq!(&batch.mentions, &baseline.mentions);
        prop_assert_eq!(batch.stats.index.candidates, baseline.stats.index.candidates);
    }
}

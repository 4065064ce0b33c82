use phenosift_common::{PhenosiftError, SNOMED_ROOT};
use phenosift_graph::testutil::StaticOntology;
use phenosift_graph::{ClusteringParams, CohortEvents, DifferenceClustering};

const DISORDER: u64 = 10;
const FINDING: u64 = 20;
const ASTHMA: u64 = 11;

/// root -> {DISORDER, FINDING}; DISORDER -> ASTHMA.
fn ontology() -> StaticOntology {
    StaticOntology::new()
        .with_edge(DISORDER, SNOMED_ROOT, "SNOMED CT Concept")
        .with_edge(FINDING, SNOMED_ROOT, "SNOMED CT Concept")
        .with_edge(ASTHMA, DISORDER, "Disorder")
        .with_label(FINDING, "Finding")
        .with_label(ASTHMA, "Asthma")
}

fn events(rows: &[(&str, u64)]) -> CohortEvents {
    CohortEvents::from_events(
        rows.iter()
            .map(|(patient, code)| (patient.to_string(), *code))
            .collect(),
    )
}

#[tokio::test]
async fn worked_scenario_end_to_end() {
    let pipeline = DifferenceClustering::new(ontology());
    let cohort_a = events(&[("p1", ASTHMA), ("p2", ASTHMA)]);
    let cohort_b = events(&[("p3", FINDING)]);

    let outcome = pipeline.run(&cohort_a, &cohort_b).await.unwrap();

    assert_eq!(outcome.group_a_size, 2);
    assert_eq!(outcome.group_b_size, 1);
    assert_eq!(outcome.missing_codes, 0);
    // root + DISORDER + FINDING + ASTHMA
    assert_eq!(outcome.graph_size, 4);
    assert_eq!(outcome.candidate_count, 4);

    assert_eq!(outcome.entries.len(), 2);

    // Positive pass: FINDING covers the whole of cohort B, depth 1.
    let positive = &outcome.entries[0];
    assert_eq!(positive.code, FINDING);
    assert!((positive.raw_difference - 1.0).abs() < 1e-12);
    assert!((positive.boosted_difference - 1.1).abs() < 1e-12);
    assert_eq!(positive.depth, 1);

    // Negative pass: the minimum boosted score is ASTHMA at depth 2
    // (-1.2), undercutting its ancestor DISORDER (-1.1).
    let negative = &outcome.entries[1];
    assert_eq!(negative.code, ASTHMA);
    assert!((negative.raw_difference - -1.0).abs() < 1e-12);
    assert!((negative.boosted_difference - -1.2).abs() < 1e-12);
    assert_eq!(negative.depth, 2);
}

#[tokio::test]
async fn labels_are_resolved_for_selected_entries() {
    let pipeline = DifferenceClustering::new(ontology());
    let cohort_a = events(&[("p1", ASTHMA), ("p2", ASTHMA)]);
    let cohort_b = events(&[("p3", FINDING)]);

    let outcome = pipeline.run(&cohort_a, &cohort_b).await.unwrap();

    for entry in &outcome.entries {
        assert!(!entry.label.is_empty(), "entry {} has no label", entry.code);
    }
    assert_eq!(outcome.entries[0].label, "Finding");
    assert_eq!(outcome.entries[1].label, "Asthma");
}

#[tokio::test]
async fn empty_cohort_is_a_configuration_error() {
    let pipeline = DifferenceClustering::new(ontology());
    let cohort_a = events(&[("p1", ASTHMA)]);
    let cohort_b = events(&[]);

    let err = pipeline.run(&cohort_a, &cohort_b).await.unwrap_err();
    assert!(matches!(err, PhenosiftError::Config(_)));
}

#[tokio::test]
async fn unknown_codes_are_counted_and_excluded_not_fatal() {
    let pipeline = DifferenceClustering::new(ontology());
    // 999 is unknown to the terminology: no parents, no replacements.
    let cohort_a = events(&[("p1", ASTHMA), ("p1", 999)]);
    let cohort_b = events(&[("p3", FINDING)]);

    let outcome = pipeline.run(&cohort_a, &cohort_b).await.unwrap();

    assert_eq!(outcome.missing_codes, 1);
    assert!(outcome.entries.iter().all(|e| e.code != 999));
}

#[tokio::test]
async fn terminology_failure_aborts_the_run() {
    let tx = ontology().failing_on(ASTHMA);
    let pipeline = DifferenceClustering::new(tx);
    let cohort_a = events(&[("p1", ASTHMA)]);
    let cohort_b = events(&[("p3", FINDING)]);

    let err = pipeline.run(&cohort_a, &cohort_b).await.unwrap_err();
    assert!(matches!(err, PhenosiftError::Terminology(_)));
}

#[tokio::test]
async fn retired_observed_code_joins_through_its_replacement() {
    const RETIRED: u64 = 99;
    let tx = ontology().with_replacement(
        RETIRED,
        phenosift_common::ConceptRef::new(DISORDER, "Disorder"),
    );
    let pipeline = DifferenceClustering::new(tx);
    let cohort_a = events(&[("p1", RETIRED), ("p2", RETIRED)]);
    let cohort_b = events(&[("p3", FINDING)]);

    let outcome = pipeline.run(&cohort_a, &cohort_b).await.unwrap();

    assert_eq!(outcome.missing_codes, 0);
    // The retired code hangs under DISORDER at depth 2 and carries the
    // whole of cohort A, so the negative pass reports it.
    let negative = outcome
        .entries
        .iter()
        .find(|e| e.boosted_difference < 0.0)
        .unwrap();
    assert_eq!(negative.code, RETIRED);
    assert_eq!(negative.depth, 2);
}

#[tokio::test]
async fn output_is_bounded_by_twice_max_clusters() {
    // Ten independent siblings with strong signal in each direction.
    let mut tx = StaticOntology::new();
    for code in 1..=10u64 {
        tx = tx.with_edge(code, SNOMED_ROOT, "SNOMED CT Concept");
    }
    let mut rows_a = Vec::new();
    let mut rows_b = Vec::new();
    for code in 1..=5u64 {
        rows_a.push((format!("a{code}"), code));
    }
    for code in 6..=10u64 {
        rows_b.push((format!("b{code}"), code));
    }

    let params = ClusteringParams {
        max_clusters: 3,
        ..ClusteringParams::default()
    };
    let pipeline = DifferenceClustering::new(tx).with_params(params);
    let outcome = pipeline
        .run(
            &CohortEvents::from_events(rows_a),
            &CohortEvents::from_events(rows_b),
        )
        .await
        .unwrap();

    assert!(outcome.entries.len() <= 6);
    let positive = outcome
        .entries
        .iter()
        .filter(|e| e.boosted_difference >= 0.05)
        .count();
    let negative = outcome
        .entries
        .iter()
        .filter(|e| e.boosted_difference <= -0.05)
        .count();
    assert_eq!(positive + negative, outcome.entries.len());
    assert!(positive <= 3);
    assert!(negative <= 3);
}

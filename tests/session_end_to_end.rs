//! Session End-to-End Tests
//!
//! Drives full sessions through load → decide → confirm → export for both
//! target columns, then checks the rewritten dataset and the mapping file.

use polars::prelude::*;
use value_standardizer::data::{load_dataset, write_dataset};
use value_standardizer::resolution::Prompt;
use value_standardizer::{
    Coverage, MappingStore, PendingItem, Session, SessionState, StandardizeError, StandardizerConfig,
    TargetColumn,
};

fn dataset(clinics: &[&str], organisms: &[&str]) -> DataFrame {
    let patients: Vec<String> = (0..clinics.len()).map(|i| format!("p{}", i)).collect();
    df![
        "Patient" => patients,
        "Clinic Name" => clinics,
        "Isolated Organisms" => organisms,
    ]
    .unwrap()
}

fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn current_batch(session: &Session) -> (String, Vec<Prompt>) {
    match session.current_item() {
        Some(PendingItem::Batch(batch)) => (batch.genus.clone(), batch.prompts.clone()),
        other => panic!("expected a batch, got {:?}", other),
    }
}

fn current_token(session: &Session) -> Prompt {
    match session.current_item() {
        Some(PendingItem::Token(prompt)) => prompt.clone(),
        other => panic!("expected a token prompt, got {:?}", other),
    }
}

#[test]
fn test_organisms_resolved_batch_by_batch() {
    let df = dataset(&["A", "B"], &["E coli & Klebsiella pneum", "klebsiella  PNEUM"]);
    let mut session = Session::new(TargetColumn::IsolatedOrganisms, StandardizerConfig::default()).unwrap();

    let coverage = session.load(df, None).unwrap();
    assert_eq!(coverage, Coverage::Partial { pending: 2 });

    let (genus, prompts) = current_batch(&session);
    assert_eq!(genus, "e");
    assert_eq!(prompts.len(), 1);
    session.decide(prompts[0].free_text("Escherichia coli").unwrap()).unwrap();
    let changed = session.confirm().unwrap();
    assert!(changed.contains("e coli"));

    let (genus, prompts) = current_batch(&session);
    assert_eq!(genus, "klebsiella");
    assert_eq!(prompts[0].token.key, "klebsiella pneum");
    session.decide(prompts[0].free_text("Klebsiella pneumoniae").unwrap()).unwrap();
    session.confirm().unwrap();

    assert_eq!(*session.state(), SessionState::AllResolved);
    session.confirm().unwrap();
    let output = session.export().unwrap();

    assert_eq!(
        strings(&output.dataset, "Isolated Organisms"),
        vec![
            Some("Escherichia coli & Klebsiella pneumoniae".to_string()),
            Some("Klebsiella pneumoniae".to_string()),
        ]
    );
    assert_eq!(
        strings(&output.dataset, "Patient"),
        vec![Some("p0".to_string()), Some("p1".to_string())]
    );
    assert_eq!(
        String::from_utf8(output.mapping_file).unwrap(),
        "e coli\tEscherichia coli\n\
         escherichia coli\tEscherichia coli\n\
         klebsiella pneum\tKlebsiella pneumoniae\n\
         klebsiella pneumoniae\tKlebsiella pneumoniae\n"
    );
    assert_eq!(output.summary.batches, 2);
    assert_eq!(output.summary.prompted, 2);
    assert_eq!(output.summary.occurrences, 3);
}

#[test]
fn test_clinic_names_reuse_and_prompt() {
    let df = dataset(
        &["SG Clinic", "sg  clinic", "Singapore Clinic", "North Wing"],
        &["x", "x", "x", "x"],
    );
    let mut session = Session::new(TargetColumn::ClinicName, StandardizerConfig::default()).unwrap();

    let coverage = session
        .load_with_mapping_file(df, b"sg clinic\tSingapore Clinic\n")
        .unwrap();
    assert_eq!(coverage, Coverage::Partial { pending: 2 });

    let prompt = current_token(&session);
    assert_eq!(prompt.token.key, "singapore clinic");
    let rank = prompt
        .candidates
        .iter()
        .position(|c| c.canonical.as_str() == "Singapore Clinic")
        .expect("stored canonical offered as a candidate");
    session.decide(prompt.choose(rank).unwrap()).unwrap();

    let prompt = current_token(&session);
    assert_eq!(prompt.token.key, "north wing");
    session.decide(prompt.keep_as_is().unwrap()).unwrap();

    assert_eq!(*session.state(), SessionState::AllResolved);
    assert_eq!(session.review().len(), 2);
    session.confirm().unwrap();
    let output = session.export().unwrap();

    assert_eq!(
        strings(&output.dataset, "Clinic Name"),
        vec![
            Some("Singapore Clinic".to_string()),
            Some("Singapore Clinic".to_string()),
            Some("Singapore Clinic".to_string()),
            Some("North Wing".to_string()),
        ]
    );
    assert_eq!(strings(&output.dataset, "Isolated Organisms"), vec![Some("x".to_string()); 4]);
    assert_eq!(output.summary.reused, 1);
    assert_eq!(output.summary.prompted, 2);
    assert_eq!(output.store.lookup("north wing").map(|c| c.as_str()), Some("North Wing"));
}

#[test]
fn test_exported_mapping_is_a_fixed_point() {
    let organisms = ["Staph aureus & E coli", "E coli", "pseudomonas"];
    let mut first = Session::new(TargetColumn::IsolatedOrganisms, StandardizerConfig::default()).unwrap();
    first.load(dataset(&["A", "B", "C"], &organisms), None).unwrap();

    while let Some(PendingItem::Batch(batch)) = first.current_item().cloned() {
        for prompt in &batch.prompts {
            first.decide(prompt.keep_as_is().unwrap()).unwrap();
        }
        first.confirm().unwrap();
    }
    first.confirm().unwrap();
    let exported = first.export().unwrap();

    let mut second = Session::new(TargetColumn::IsolatedOrganisms, StandardizerConfig::default()).unwrap();
    let coverage = second
        .load_with_mapping_file(dataset(&["A", "B", "C"], &organisms), &exported.mapping_file)
        .unwrap();
    assert_eq!(coverage, Coverage::Complete);
    assert_eq!(*second.state(), SessionState::AllResolved);

    let changed = second.confirm().unwrap();
    assert!(changed.is_empty());
    let again = second.export().unwrap();

    assert_eq!(again.mapping_file, exported.mapping_file);
    assert_eq!(
        strings(&again.dataset, "Isolated Organisms"),
        strings(&exported.dataset, "Isolated Organisms")
    );
    assert_eq!(again.summary.prompted, 0);
}

#[test]
fn test_batches_follow_genus_order() {
    let organisms = ["Staphylococcus aureus", "Escherichia coli & Klebsiella oxytoca", "Enterococcus faecalis"];
    let mut session = Session::new(TargetColumn::IsolatedOrganisms, StandardizerConfig::default()).unwrap();
    session.load(dataset(&["A", "B", "C"], &organisms), None).unwrap();

    let mut order = Vec::new();
    while let Some(PendingItem::Batch(batch)) = session.current_item().cloned() {
        order.push(batch.genus.clone());
        for prompt in &batch.prompts {
            session.decide(prompt.keep_as_is().unwrap()).unwrap();
        }
        session.confirm().unwrap();
    }

    assert_eq!(order, vec!["enterococcus", "escherichia", "klebsiella", "staphylococcus"]);
}

#[test]
fn test_abandon_returns_loaded_store() {
    let mapping = b"e coli\tEscherichia coli\n";
    let (loaded, _) = MappingStore::load(mapping, '\t');
    let mut session = Session::new(TargetColumn::IsolatedOrganisms, StandardizerConfig::default()).unwrap();
    session
        .load_with_mapping_file(dataset(&["A", "B"], &["E coli", "Klebsiella"]), mapping)
        .unwrap();

    let (_, prompts) = current_batch(&session);
    session.decide(prompts[0].free_text("Klebsiella pneumoniae").unwrap()).unwrap();
    session.confirm().unwrap();

    assert_eq!(session.abandon(), loaded);
}

#[test]
fn test_missing_column_rejected_before_processing() {
    let df = df![
        "Clinic Name" => &["A"],
        "Organisms" => &["E coli"],
    ]
    .unwrap();
    let mut session = Session::new(TargetColumn::ClinicName, StandardizerConfig::default()).unwrap();

    let err = session.load(df, None).unwrap_err();
    assert!(matches!(err, StandardizeError::ColumnNotFound(ref c) if c == "Isolated Organisms"));
    assert_eq!(*session.state(), SessionState::AwaitingUpload);
}

#[test]
fn test_csv_round_trip_keeps_text_columns() {
    let dir = std::env::temp_dir().join(format!("value_standardizer_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("records.csv");

    let df = dataset(&["SG Clinic", "North, Wing"], &["E coli & Klebsiella", "007"]);
    write_dataset(&df, &path).unwrap();
    let loaded = load_dataset(&path).unwrap();

    assert_eq!(loaded.get_column_names(), df.get_column_names());
    for name in ["Patient", "Clinic Name", "Isolated Organisms"] {
        assert_eq!(strings(&loaded, name), strings(&df, name));
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

// End-to-end runs over the CSV fixtures

use std::fs;
use std::path::PathBuf;

use statement_normalizer::{
    detect, parse, standardize, BankFormat, Currency, NormalizeError, Normalizer, NormalizerConfig,
    Scope,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn output_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn hdfc_fixture_yields_one_row() {
    let input = fixture("foo_HDFC_statement.csv");
    assert_eq!(detect(&input).unwrap(), BankFormat::Hdfc);

    let txs = parse(&input).unwrap();
    assert_eq!(txs.len(), 1);

    let tx = &txs[0];
    assert_eq!(tx.date, "15-07-2023");
    assert_eq!(tx.description, "SWIGGY MUMBAI");
    assert_eq!(tx.debit, 450.0);
    assert_eq!(tx.credit, 0.0);
    assert_eq!(tx.currency, Currency::Inr);
    assert_eq!(tx.card_name, "Rahul");
    assert_eq!(tx.scope, Scope::Domestic);
    assert_eq!(tx.location, "mumbai");
}

#[test]
fn hdfc_fixture_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("HdfcStatement1.csv");

    let rows = standardize(&fixture("foo_HDFC_statement.csv"), &output).unwrap();
    assert_eq!(rows, 1);
    assert_eq!(
        output_lines(&output),
        vec![
            "Date,Transaction Description,Debit,Credit,Currency,CardName,Transaction,Location",
            "15-07-2023,SWIGGY MUMBAI,450.0,0.0,INR,Rahul,Domestic,mumbai",
        ]
    );
}

#[test]
fn axis_detected_from_content_with_sections() {
    let input = fixture("card_export.csv");
    assert_eq!(detect(&input).unwrap(), BankFormat::Axis);

    let txs = parse(&input).unwrap();
    assert_eq!(txs.len(), 3);

    assert_eq!(txs[0].description, "AMAZON HYDERABAD");
    assert_eq!(txs[0].debit, 1500.0);
    assert_eq!(txs[0].card_name, "Ritu");
    assert_eq!(txs[0].scope, Scope::Domestic);
    assert_eq!(txs[0].location, "hyderabad");

    assert_eq!(txs[1].credit, 250.0);
    assert_eq!(txs[1].debit, 0.0);
    assert_eq!(txs[1].card_name, "Ritu");

    assert_eq!(txs[2].card_name, "Rajat");
    assert_eq!(txs[2].scope, Scope::International);
    assert_eq!(txs[2].currency, Currency::Usd);
    assert_eq!(txs[2].debit, 80.0);
    assert_eq!(txs[2].location, "newyork");

    for tx in &txs {
        assert!(tx.debit == 0.0 || tx.credit == 0.0);
        assert_eq!(tx.date.len(), 10);
    }
}

#[test]
fn generic_file_falls_back_to_idfc_layout() {
    let input = fixture("unbranded.csv");
    assert_eq!(detect(&input).unwrap(), BankFormat::Generic);

    let txs = parse(&input).unwrap();
    assert_eq!(txs.len(), 2);

    assert_eq!(txs[0].date, "10-09-2023");
    assert_eq!(txs[0].description, "UBER TRIP DELHI");
    assert_eq!(txs[0].debit, 310.5);
    assert_eq!(txs[0].card_name, "Raj");
    assert_eq!(txs[0].location, "delhi");

    assert_eq!(txs[1].credit, 99.0);
    assert_eq!(txs[1].debit, 0.0);
}

#[test]
fn unrecognised_file_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    assert_eq!(standardize(&fixture("notes.csv"), &output).unwrap(), 0);
    assert_eq!(output_lines(&output).len(), 1);
}

#[test]
fn missing_file_is_an_error() {
    let err = parse(&fixture("does_not_exist.csv")).unwrap_err();
    assert!(matches!(err, NormalizeError::Io { .. }));

    // the file name alone decides, so detection still succeeds
    assert_eq!(
        detect(&fixture("missing_icici.csv")).unwrap(),
        BankFormat::Icici
    );
    assert!(detect(&fixture("missing.csv")).is_err());
}

#[test]
fn config_file_adds_cardholders() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("normalizer.toml");
    fs::write(&config_path, "known_names = [\"Meera\"]\n").unwrap();

    let input = dir.path().join("hdfc_meera.csv");
    fs::write(
        &input,
        "Date,Transaction Description,Amount\nMeera,,\n07-15-2023,SWIGGY MUMBAI,450.00\n",
    )
    .unwrap();

    let normalizer = Normalizer::new(NormalizerConfig::load(&config_path).unwrap());
    let txs = normalizer.parse(&input).unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].card_name, "Meera");

    // the default config does not know Meera
    let txs = parse(&input).unwrap();
    assert_eq!(txs[0].card_name, "Unknown");
}

use std::fs;
use std::io::Write;

use oolong_compiler::{
    OracleSnapshot, Signature, SignatureFact, SnapshotOracle, SourceSpan, Type, TypeFact,
    TypeOracle, UnderlyingFact,
};

fn sample_snapshot() -> OracleSnapshot {
    OracleSnapshot {
        types: vec![TypeFact {
            line: 3,
            column: 1,
            end_line: 3,
            end_column: 3,
            ty: Type::Named("Result_int_error".to_string()),
        }],
        signatures: vec![SignatureFact {
            line: 6,
            column: 4,
            end_line: 6,
            end_column: 8,
            signature: Signature {
                params: vec![Type::String, Type::Slice(Box::new(Type::Int))],
                variadic: true,
                results: vec![Type::String],
            },
        }],
        underlying: vec![UnderlyingFact {
            name: "Flag".to_string(),
            ty: Type::Bool,
        }],
    }
}

#[test]
fn a_snapshot_round_trips_through_a_sidecar_file() {
    let encoded = serde_json::to_string_pretty(&sample_snapshot()).expect("snapshot encodes");

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(encoded.as_bytes()).expect("write sidecar");

    let read_back = fs::read_to_string(file.path()).expect("read sidecar");
    let oracle = SnapshotOracle::from_json(&read_back).expect("decode sidecar");

    assert_eq!(
        oracle.type_of(SourceSpan::new(3, 1, 3, 3)),
        Some(Type::Named("Result_int_error".to_string()))
    );
    let signature = oracle
        .signature_of(SourceSpan::new(6, 4, 6, 8))
        .expect("signature fact present");
    assert!(signature.variadic);
    assert_eq!(signature.params.len(), 2);

    assert_eq!(oracle.underlying_of("Flag"), Some(Type::Bool));
    assert!(
        oracle.is_boolean(&Type::Named("Flag".to_string())),
        "a named type with boolean underlying counts as boolean"
    );
    assert!(!oracle.is_boolean(&Type::Int));
}

#[test]
fn lookups_miss_on_unknown_spans() {
    let oracle = SnapshotOracle::from_json(
        &serde_json::to_string(&sample_snapshot()).expect("snapshot encodes"),
    )
    .expect("decode");
    assert_eq!(oracle.type_of(SourceSpan::new(99, 1, 99, 1)), None);
    assert_eq!(oracle.signature_of(SourceSpan::new(99, 1, 99, 1)), None);
    assert_eq!(oracle.underlying_of("Unknown"), None);
}

#[test]
fn malformed_sidecars_decode_to_an_error() {
    let outcome = SnapshotOracle::from_json("{\"types\": [{\"line\": \"not a number\"}]}");
    assert!(outcome.is_err());

    let outcome = SnapshotOracle::from_json("not json at all");
    assert!(outcome.is_err());
}

#[test]
fn empty_sections_are_optional_in_the_sidecar() {
    let oracle = SnapshotOracle::from_json("{}").expect("an empty snapshot is valid");
    assert_eq!(oracle.type_of(SourceSpan::new(1, 1, 1, 1)), None);
}

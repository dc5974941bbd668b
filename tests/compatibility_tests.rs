//! End-to-end compatibility tests
//!
//! Load `.proto` sources through the loader and check the findings of a full
//! comparison.

use proto_compat::loader::parse_source;
use proto_compat::{compare, Condition, Difference, DifferenceList, Snapshot};

fn load(source: &str) -> Snapshot {
    parse_source(source, "inline.proto").unwrap()
}

fn fixture_v1() -> Snapshot {
    parse_source(include_str!("fixtures/account_v1.proto"), "account_v1.proto").unwrap()
}

fn fixture_v2() -> Snapshot {
    parse_source(include_str!("fixtures/account_v2.proto"), "account_v2.proto").unwrap()
}

fn summarize(differences: &[Difference]) -> Vec<(Condition, String, String)> {
    differences
        .iter()
        .map(|d| (d.condition(), d.path().to_string(), d.qualifier().to_string()))
        .collect()
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_identity() {
    for snapshot in [fixture_v1(), fixture_v2(), Snapshot::new()] {
        let result = compare(&snapshot, &snapshot);
        assert!(result.errors().is_empty());
        assert!(result.warnings().is_empty());
    }
}

#[test]
fn test_message_change_duality() {
    let first = load("message A {} message B {} message Shared { optional int32 x = 1; }");
    let second = load("message C {} message Shared { optional int32 x = 1; }");

    for (older, newer) in [(&first, &second), (&second, &first)] {
        let result = compare(older, newer);
        assert!(result.errors().is_empty());

        for name in newer.names().filter(|n| !older.contains(n)) {
            let expected = format!("Added message {}", name);
            assert!(result.warnings().iter().any(|d| d.message() == expected));
        }
        for name in older.names().filter(|n| !newer.contains(n)) {
            let expected = format!("Removed message {}", name);
            assert!(result.warnings().iter().any(|d| d.message() == expected));
        }
    }
}

#[test]
fn test_required_add_and_remove_asymmetry() {
    let base = load("message M { optional int32 a = 1; }");
    let with_required = load("message M { optional int32 a = 1; required int32 b = 2; }");
    let with_optional = load("message M { optional int32 a = 1; optional int32 b = 2; }");

    let added_required = compare(&base, &with_required);
    assert_eq!(added_required.errors().len(), 1);
    assert!(added_required.warnings().is_empty());

    let added_optional = compare(&base, &with_optional);
    assert!(added_optional.errors().is_empty());
    assert_eq!(added_optional.warnings().len(), 1);

    let removed_required = compare(&with_required, &base);
    assert_eq!(removed_required.errors().len(), 1);
    assert_eq!(removed_required.errors()[0].condition(), Condition::RemovedField);

    let removed_optional = compare(&with_optional, &base);
    assert!(removed_optional.errors().is_empty());
    assert_eq!(removed_optional.warnings()[0].condition(), Condition::RemovedField);
}

#[test]
fn test_tag_reassignment_regardless_of_occupancy() {
    let older = load("message M { optional int32 f = 3; }");
    let cases = [
        "message M { optional int32 f = 4; }",
        "message M { optional int32 f = 4; optional string other = 3; }",
        "message M { required bytes f = 4; repeated int32 g = 3; }",
    ];

    for newer in cases {
        let result = compare(&older, &load(newer));
        let renumbered: Vec<_> = result
            .errors()
            .iter()
            .filter(|d| d.condition() == Condition::ChangedNumber)
            .collect();
        assert_eq!(renumbered.len(), 1, "{}", newer);
        assert_eq!(renumbered[0].qualifier(), "f");
        assert_eq!(renumbered[0].old_value(), "3");
        assert_eq!(renumbered[0].new_value(), "4");
    }
}

#[test]
fn test_attribute_isolation() {
    let older = load("message A {} message M { optional int32 count = 1; }");
    let cases = [
        ("message M { repeated int32 count = 1; }", Condition::ChangedLabel),
        ("message M { optional int32 total = 1; }", Condition::ChangedName),
        ("message M { optional sint32 count = 1; }", Condition::ChangedType),
        ("message M { optional A count = 1; }", Condition::ChangedType),
    ];

    for (newer, expected) in cases {
        let result = compare(&older, &load(&format!("message A {{}} {}", newer)));
        assert!(result.errors().is_empty(), "{}", newer);
        assert_eq!(result.warnings().len(), 1, "{}", newer);
        assert_eq!(result.warnings()[0].condition(), expected);
    }
}

#[test]
fn test_retype_between_messages_is_one_warning() {
    let older = load("message A {} message B {} message M { optional A ref = 1; }");
    let newer = load("message A {} message B {} message M { optional B ref = 1; }");

    let result = compare(&older, &newer);
    let conditions: Vec<_> = result.warnings().iter().map(|d| d.condition()).collect();
    assert_eq!(conditions, vec![Condition::ChangedType]);
}

#[test]
fn test_moved_reference_flags_type_name() {
    let older = load("message Address {} message User { optional Address home = 1; }");
    let newer = load(
        "message Address {} message User { message Address {} optional Address home = 1; }",
    );

    let result = compare(&older, &newer);
    let moved: Vec<_> = result
        .warnings()
        .iter()
        .filter(|d| d.path() == "User")
        .map(|d| (d.condition(), d.old_value(), d.new_value()))
        .collect();
    assert_eq!(moved, vec![(Condition::ChangedTypeName, "Address", "User.Address")]);
}

#[test]
fn test_package_rename_is_quiet_for_fields() {
    let older = load("package a; message A {} message M { optional A ref = 1; }");
    let newer = load("package b; message A {} message M { optional A ref = 1; }");

    assert!(compare(&older, &newer).is_clean());
}

#[test]
fn test_scenario_required_field_added() {
    let older = load("message User { required int32 id = 1; optional string name = 2; }");
    let newer = load(
        "message User { required int32 id = 1; optional string name = 2; required int32 age = 3; }",
    );

    let result = compare(&older, &newer);
    assert!(result.warnings().is_empty());
    assert_eq!(
        summarize(result.errors()),
        vec![(Condition::AddedField, "User".to_string(), "3".to_string())]
    );
    assert_eq!(result.errors()[0].new_value(), "Required");
}

#[test]
fn test_scenario_messages_added_and_removed() {
    let older = load("message A {} message B {}");
    let newer = load("message A {} message C {}");

    let result = compare(&older, &newer);
    assert!(result.errors().is_empty());

    let mut messages: Vec<_> = result.warnings().iter().map(|d| d.message()).collect();
    messages.sort();
    assert_eq!(messages, vec!["Added message C", "Removed message B"]);
}

#[test]
fn test_render_is_idempotent() {
    let result = compare(&fixture_v1(), &fixture_v2());
    let first = result.render(false);
    let second = result.render(false);
    assert_eq!(first, second);
}

#[test]
fn test_concurrent_comparisons_agree() {
    let older = fixture_v1();
    let newer = fixture_v2();
    let expected = compare(&older, &newer);

    let results: Vec<DifferenceList> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| compare(&older, &newer))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in results {
        assert_eq!(result, expected);
    }
}

// =============================================================================
// Fixture evolution
// =============================================================================

#[test]
fn test_account_evolution_errors() {
    let result = compare(&fixture_v1(), &fixture_v2());

    assert_eq!(
        summarize(result.errors()),
        vec![
            (Condition::AddedField, "Account".to_string(), "11".to_string()),
            (Condition::RemovedField, "Account".to_string(), "7".to_string()),
            (Condition::ChangedNumber, "Account".to_string(), "region".to_string()),
        ]
    );
}

#[test]
fn test_account_evolution_warnings() {
    let result = compare(&fixture_v1(), &fixture_v2());

    assert_eq!(
        summarize(result.warnings()),
        vec![
            (Condition::ChangedName, "Account".to_string(), "2".to_string()),
            (Condition::ChangedDefault, "Account".to_string(), "3".to_string()),
            (Condition::ChangedType, "Account".to_string(), "6".to_string()),
            (Condition::AddedField, "Account".to_string(), "10".to_string()),
            (Condition::ChangedDefault, "Account.Preferences".to_string(), "1".to_string()),
            (Condition::AddedField, "Address".to_string(), "3".to_string()),
            (Condition::NonFieldIncompatibility, ".".to_string(), "".to_string()),
            (Condition::NonFieldIncompatibility, ".".to_string(), "".to_string()),
        ]
    );
    assert_eq!(result.warnings()[6].message(), "Added message Session");
    assert_eq!(result.warnings()[7].message(), "Removed message LegacyToken");
}

#[test]
fn test_account_evolution_rendering() {
    let result = compare(&fixture_v1(), &fixture_v2());

    let expected = "\
WARNING
Changed name of field 2 in Account from display_name to name
Changed default value of field 3 in Account from FREE to PRO: this is generally OK
Changed type of field 6 in Account from int32 to int64
Added field 10 in Account of label Optional
Changed default value of field 1 in Account.Preferences from true to false: this is generally OK
Added field 3 in Address of label Optional
Added message Session
Removed message LegacyToken
INCOMPATIBILITIES
Added field 11 in Account of label Required
Removed field 7 in Account of label Required
Changed numeric tag of field named \"region\" in Account from 7 to 10: semantics may be changed for this field
8 Warnings, 3 Incompatibility Errors
";
    assert_eq!(result.render(false), expected);

    let suppressed = result.render(true);
    assert!(suppressed.starts_with("INCOMPATIBILITIES\n"));
    assert!(suppressed.ends_with("8 Warnings, 3 Incompatibility Errors\n"));
}

use crate::key::{reference_image_key, ImageRole, KeyError, ObjectKey};

#[test]
fn parse_reference_key_returns_reference_role() {
    let key = ObjectKey::parse("42/7_reference.jpeg").unwrap();

    assert_eq!(key.subject_id, 42);
    assert_eq!(key.attendance_id, 7);
    assert_eq!(key.role, ImageRole::Reference);
    assert!(key.is_reference());
}

#[test]
fn parse_candidate_key_returns_timestamp_role() {
    let key = ObjectKey::parse("42/7_1700000000.jpeg").unwrap();

    assert_eq!(key.subject_id, 42);
    assert_eq!(key.attendance_id, 7);
    assert_eq!(
        key.role,
        ImageRole::Candidate {
            timestamp: 1_700_000_000
        }
    );
    assert!(!key.is_reference());
}

#[test]
fn display_round_trips_through_parse() {
    for key in [
        ObjectKey::reference(1, 2),
        ObjectKey::candidate(42, 7, 1_700_000_000),
        ObjectKey::candidate(9_000_000_000, 0, 0),
    ] {
        let encoded = key.to_string();
        assert_eq!(ObjectKey::parse(&encoded).unwrap(), key, "key {}", encoded);
    }
}

#[test]
fn malformed_keys_are_rejected() {
    let malformed = [
        "abc/7_init.jpg",
        "abc/7_reference.jpeg",
        "42/7_reference.jpg",
        "42/7_init.jpeg",
        "42-7_reference.jpeg",
        "42/7-reference.jpeg",
        "42/7.jpeg",
        "42/7_.jpeg",
        "42/x_reference.jpeg",
        "42/7_reference.jpeg.bak",
        "prefix/42/7_reference.jpeg",
        "/42/7_reference.jpeg",
        "42/7_-5.jpeg",
        "42/7_REFERENCE.jpeg",
        " 42/7_reference.jpeg",
        "\u{664}\u{662}/7_reference.jpeg",
        "42/7_\u{661}\u{667}\u{660}\u{660}.jpeg",
        "",
    ];

    for key in malformed {
        assert_eq!(
            ObjectKey::parse(key),
            Err(KeyError::Malformed(key.to_string())),
            "key {:?} should be rejected",
            key
        );
    }
}

#[test]
fn identifiers_beyond_range_are_rejected_not_truncated() {
    let key = "99999999999999999999/7_reference.jpeg";
    assert!(matches!(
        ObjectKey::parse(key),
        Err(KeyError::OutOfRange(_, digits)) if digits == "99999999999999999999"
    ));

    let key = "42/7_99999999999999999999999.jpeg";
    assert!(matches!(ObjectKey::parse(key), Err(KeyError::OutOfRange(_, _))));
}

#[test]
fn canonical_reference_location_is_not_an_upload_key() {
    let canonical = reference_image_key(42);

    assert_eq!(canonical, "42/reference.jpeg");
    assert_eq!(ObjectKey::reference(42, 7).reference_image_key(), canonical);
    assert!(ObjectKey::parse(&canonical).is_err());
}

#[test]
fn from_str_matches_parse() {
    let parsed: ObjectKey = "5/6_123.jpeg".parse().unwrap();
    assert_eq!(parsed, ObjectKey::candidate(5, 6, 123));
}

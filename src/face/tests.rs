use crate::face::{Comparison, ComparisonError, FaceComparison, FakeFaceComparison, ImageRef};

fn refs(candidate: &str) -> (ImageRef, ImageRef) {
    (
        ImageRef::new("attendance-test", "42/reference.jpeg"),
        ImageRef::new("attendance-test", candidate),
    )
}

#[tokio::test]
async fn fake_matches_by_default() {
    let faces = FakeFaceComparison::new();
    let (reference, candidate) = refs("42/7_1700000000.jpeg");

    assert_eq!(
        faces.compare(&reference, &candidate).await.unwrap(),
        Comparison::Match
    );
}

#[tokio::test]
async fn fake_outcome_is_keyed_by_candidate() {
    let faces = FakeFaceComparison::new();
    faces.fake_set_default(Comparison::NoMatch);
    faces.fake_set_outcome("42/7_1700000000.jpeg", Comparison::Match);

    let (reference, matching) = refs("42/7_1700000000.jpeg");
    let (_, other) = refs("42/8_1700000100.jpeg");

    assert!(faces.compare(&reference, &matching).await.unwrap().is_match());
    assert!(!faces.compare(&reference, &other).await.unwrap().is_match());
}

#[tokio::test]
async fn fake_throttling_recovers_after_configured_calls() {
    let faces = FakeFaceComparison::new();
    faces.fake_throttle_next(2);
    let (reference, candidate) = refs("42/7_1700000000.jpeg");

    for _ in 0..2 {
        assert!(matches!(
            faces.compare(&reference, &candidate).await,
            Err(ComparisonError::Throttled(_))
        ));
    }
    assert_eq!(
        faces.compare(&reference, &candidate).await.unwrap(),
        Comparison::Match
    );
    assert_eq!(faces.fake_calls().len(), 3);
}

#[test]
fn image_ref_displays_as_s3_uri() {
    let image = ImageRef::new("bucket", "1/reference.jpeg");
    assert_eq!(image.to_string(), "s3://bucket/1/reference.jpeg");
}

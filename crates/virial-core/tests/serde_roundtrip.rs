use virial_core::errors::{ErrorInfo, VirialError};
use virial_core::{Molecule, Vec3};

#[test]
fn error_roundtrips_with_family_tag() {
    let err = VirialError::DegenerateCalibration(
        ErrorInfo::new("preference-zero", "zero preference").with_hint("increase steps"),
    );
    let json = serde_json::to_string(&err).unwrap();
    assert!(json.contains("\"family\":\"DegenerateCalibration\""));
    let back: VirialError = serde_json::from_str(&json).unwrap();
    assert_eq!(err, back);
}

#[test]
fn molecule_roundtrips() {
    let molecule = Molecule::linear_chain(Vec3::new(0.5, -1.0, 2.0), 3, 1.0).unwrap();
    let json = serde_json::to_string(&molecule).unwrap();
    let back: Molecule = serde_json::from_str(&json).unwrap();
    assert_eq!(molecule, back);
}

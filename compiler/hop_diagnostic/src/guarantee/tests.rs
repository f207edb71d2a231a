use super::*;

#[test]
fn from_error_count_requires_errors() {
    assert!(ErrorGuaranteed::from_error_count(0).is_none());
    assert!(ErrorGuaranteed::from_error_count(3).is_some());
}

#[test]
fn display() {
    assert_eq!(ErrorGuaranteed::new_emitted().to_string(), "error(s) emitted");
}

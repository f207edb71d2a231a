use super::*;

#[test]
fn every_user_facing_code_is_documented() {
    for code in ErrorCode::ALL.iter().filter(|c| !c.is_internal()) {
        assert!(ErrorDocs::has_docs(*code), "{code} has no documentation");
    }
}

#[test]
fn docs_start_with_their_code() {
    for code in ErrorDocs::all_codes() {
        let doc = ErrorDocs::get(code).unwrap_or_default();
        assert!(
            doc.starts_with(&format!("# {code}")),
            "{code} documentation must start with its heading"
        );
    }
}

#[test]
fn too_many_errors_has_no_page() {
    assert!(ErrorDocs::get(ErrorCode::E9002).is_none());
}

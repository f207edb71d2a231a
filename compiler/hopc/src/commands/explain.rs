//! The `explain` command: display documentation for error codes.

use hop_diagnostic::{ErrorCode, ErrorDocs};

use super::Report;

pub fn explain_error(code_str: &str) -> Report {
    let Ok(code) = code_str.parse::<ErrorCode>() else {
        return Report::failure(format!(
            "Unknown error code: {code_str}\n\n\
             Codes have the format E4xxx (isolation errors) or E9xxx (internal errors).\n\
             Examples: E4001, E4008, E9001\n"
        ));
    };

    match ErrorDocs::get(code) {
        Some(doc) => {
            let mut report = Report::ok();
            report.stdout.push_str(doc);
            if !doc.ends_with('\n') {
                report.stdout.push('\n');
            }
            report
        }
        None => Report::failure(format!(
            "No documentation available for {code}\n\n\
             Summary: {}\n",
            code.description()
        )),
    }
}

use fb_core::check::{Severity, check_document};
use fb_core::legacy::to_legacy;
use fb_core::model::Document;
use std::env;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let paths: Vec<String> = env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: export_legacy <form.json>...");
        return ExitCode::FAILURE;
    }

    let mut failed = 0;
    for path in &paths {
        let input = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("SKIP {path}: {e}");
                failed += 1;
                continue;
            }
        };
        let (doc, _) = match Document::from_json(&input) {
            Ok(loaded) => loaded,
            Err(e) => {
                eprintln!("FAIL {path}: {e}");
                failed += 1;
                continue;
            }
        };

        for diag in check_document(&doc) {
            let level = match diag.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            eprintln!("{path}: {level}[{}]: {}", diag.rule, diag.message);
        }

        let legacy = to_legacy(&doc.to_persisted().items);
        match serde_json::to_string_pretty(&legacy) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("FAIL {path}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} file(s) failed", paths.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

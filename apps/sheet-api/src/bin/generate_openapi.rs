//! Writes the sheet-api OpenAPI document.
//!
//! Usage:
//!   cargo run -p sheet-api --bin generate-openapi [-- <output path>]
//!
//! Defaults to `specs/sheet-api.json` at the workspace root.

use std::path::PathBuf;

use utoipa::OpenApi;

fn main() {
    let doc = sheet_api::routes::ApiDoc::openapi();
    let paths = doc.paths.paths.len();
    let json = doc.to_pretty_json().expect("failed to serialize OpenAPI document");

    let out = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../specs/sheet-api.json")
    });
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).expect("failed to create output directory");
    }
    std::fs::write(&out, json).expect("failed to write OpenAPI document");
    println!("Wrote {} ({paths} paths)", out.display());
}

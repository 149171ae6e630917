//! services/api/src/bin/openapi.rs
//!
//! Dumps the roster API's OpenAPI document, stamped with the crate version,
//! to `openapi.json` or to the path given as the first argument.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn roster_api_doc() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = "Mentor Roster API".to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    let doc = roster_api_doc();
    std::fs::write(&path, doc.to_pretty_json()?)?;
    println!("Wrote OpenAPI document ({} paths) to {}", doc.paths.paths.len(), path);
    Ok(())
}

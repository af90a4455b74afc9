//! OpenAPI Specification Generator Binary
//!
//! Prints the ICMS admin OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p icms-api --bin generate-openapi --features openapi > openapi.json

use icms_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}

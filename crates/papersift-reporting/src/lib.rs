pub mod export;

pub use export::{ExportFormat, export, export_bibtex, export_csv, export_json, export_to_path};

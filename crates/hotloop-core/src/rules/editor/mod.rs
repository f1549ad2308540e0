//! Editor-hygiene rules for build safety

pub mod editor_field_leak;
pub mod editor_import;

pub use editor_field_leak::EditorFieldEscape;
pub use editor_import::EditorImportOutsideGuard;

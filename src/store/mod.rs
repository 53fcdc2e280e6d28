/// Document persistence for the portal
///
/// Each submodule maps one logical document type onto its SQLite table.
/// Functions take a bare connection so the same calls work on a pooled
/// connection and inside a transaction (`&mut *tx`).

pub mod projects;
pub mod sections;
pub mod status;
pub mod tokens;

pub mod completeness;
pub mod document;
pub mod editor;
pub mod export;
pub mod handlers;
pub mod ids;
pub mod templates;

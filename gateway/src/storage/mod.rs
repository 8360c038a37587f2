//! On-disk state: layout, settings and JSON collections

pub mod collection;
pub mod layout;
pub mod settings;

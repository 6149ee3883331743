//! Media module for item representation and URL selection.

pub mod item;
pub mod parser;

pub use item::MediaType;
pub use parser::content_urls;

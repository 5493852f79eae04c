//! Schemaless XML front end

pub mod cursor;
pub mod parser;

pub use parser::{tree_key, Config, Parser, StartTag, DEPTH_CEILING};

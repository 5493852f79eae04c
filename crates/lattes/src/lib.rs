//! lattes - schemaless Lattes CV parsing and budget-bounded truncation
//!
//! [`parse`] turns an ISO-8859-1 CV export into a generic [`Value`] tree and
//! a [`Summary`]. [`truncate`], [`truncate_for_comparison`] and
//! [`truncate_for_aggregate`] shrink one or more trees to fit a size budget
//! before they are sent to a text-generation service.
//!
//! # Quick Start
//!
//! ```
//! use lattes::{parse, truncate, TruncationConfig, SUMMARY_BUDGET};
//! # fn main() -> Result<(), lattes::Error> {
//! let xml = b"<CURRICULO-VITAE NUMERO-IDENTIFICADOR=\"0001\" DATA-ATUALIZACAO=\"15032024\">\
//!     <DADOS-GERAIS NOME-COMPLETO=\"Jos\xe9 Silva\"/></CURRICULO-VITAE>";
//! let (document, summary) = parse(xml)?;
//! assert_eq!(summary.identifier, "0001");
//! assert_eq!(summary.name, "José Silva");
//! assert_eq!(summary.last_update, "15/03/2024");
//!
//! let shrunk = truncate(&document.to_value(), SUMMARY_BUDGET, &TruncationConfig::default());
//! assert!(!shrunk.truncated);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod input;
pub use input::Input;

pub mod value;
pub use value::{Array, Object, Value, TEXT_KEY};

pub mod xml;

pub mod curriculum;
pub use curriculum::{
    parse, parse_input, parse_with_config, Document, ParserConfig, ProductionCounts,
    ProductionSections, Summary,
};

pub mod budget;
pub use budget::{
    truncate, truncate_for_aggregate, truncate_for_comparison, Truncated, TruncationConfig,
    ANALYSIS_BUDGET, SUMMARY_BUDGET,
};

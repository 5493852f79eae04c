//! Lattes CV parsing: bytes to generic tree plus summary

pub mod config;
pub mod summary;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result, Span};
use crate::input::Input;
use crate::value::{Object, Value};
use crate::xml;

pub use config::{ParserConfig, ProductionSections};
pub use summary::{ProductionCounts, Summary};

/// A parsed curriculum: one entry mapping the root key to the root element
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document(Object);

impl TryFrom<Object> for Document {
    type Error = Error;

    /// Accept a mapping only if it holds exactly one entry whose value is a mapping
    fn try_from(object: Object) -> Result<Self> {
        let single_root = object.len() == 1 && object.values().all(Value::is_object);
        if !single_root {
            return Err(Error::with_message(
                ErrorKind::MalformedInput,
                Span::empty(),
                format!(
                    "a document holds exactly one root element, found {} entries",
                    object.len()
                ),
            ));
        }
        Ok(Self(object))
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let object = Object::deserialize(deserializer)?;
        Self::try_from(object).map_err(de::Error::custom)
    }
}

impl Document {
    /// Key of the root entry (`curriculo-vitae` for Lattes exports)
    pub fn root_key(&self) -> Option<&str> {
        self.0.keys().next().map(String::as_str)
    }

    /// The root element's mapping
    pub fn root(&self) -> Option<&Object> {
        self.0.values().next().and_then(Value::as_object)
    }

    pub fn as_object(&self) -> &Object {
        &self.0
    }

    /// Generic form, as handed to the truncator
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Parse a Lattes CV export with the default schema configuration
pub fn parse(bytes: &[u8]) -> Result<(Document, Summary)> {
    parse_with_config(bytes, &ParserConfig::default())
}

/// Parse a curriculum export
///
/// Fails with [`ErrorKind::MalformedInput`] when no root element can be read
/// or the markup is broken, [`ErrorKind::UnexpectedRoot`] when the root is not
/// `config.root_element` and [`ErrorKind::MissingIdentifier`] when the root
/// lacks a non-empty `config.identifier_attribute`.
pub fn parse_with_config(bytes: &[u8], config: &ParserConfig) -> Result<(Document, Summary)> {
    parse_input(&Input::from_bytes(bytes), config)
}

/// Parse from an [`Input`], which may carry a filename for diagnostics
#[instrument(skip_all, fields(bytes = input.len(), file = input.filename().unwrap_or("-")))]
pub fn parse_input(input: &Input<'_>, config: &ParserConfig) -> Result<(Document, Summary)> {
    let text = input.decode();
    let mut parser = xml::Parser::with_config(
        &text,
        xml::Config {
            max_depth: config.max_depth,
        },
    );

    let root = parser.root()?;
    if root.local_name() != config.root_element {
        return Err(Error::new(
            ErrorKind::UnexpectedRoot {
                expected: config.root_element.clone(),
                found: root.local_name().to_string(),
            },
            Span::at(root.pos),
        ));
    }

    let identifier = root
        .attribute(&config.identifier_attribute)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            Error::new(
                ErrorKind::MissingIdentifier {
                    attribute: config.identifier_attribute.clone(),
                },
                Span::at(root.pos),
            )
        })?
        .to_string();

    let mut cv = root.to_object()?;
    parser.body(&root, &mut cv)?;

    retain_general_data(&mut cv, config);
    let summary = Summary::extract(&cv, identifier, config);
    debug!(
        identifier = %summary.identifier,
        bibliographic = summary.counts.bibliographic,
        technical = summary.counts.technical,
        other = summary.counts.other,
        "parsed curriculum"
    );

    let mut document = Object::new();
    document.insert(xml::tree_key(&root.name), cv);
    Ok((Document(document), summary))
}

/// Drop every general-data key that is not allow-listed
fn retain_general_data(cv: &mut Object, config: &ParserConfig) {
    let keep = |key: &str, _: &Value| config.is_general_data_field(key);
    match cv.get_mut(&config.general_data) {
        Some(Value::Object(general)) => general.retain(keep),
        Some(Value::Array(sections)) => {
            for general in sections.iter_mut().filter_map(Value::as_object_mut) {
                general.retain(keep);
            }
        }
        Some(Value::String(_)) | None => {}
    }
}

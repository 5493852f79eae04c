//! Compact record extracted from a parsed curriculum

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::curriculum::config::ParserConfig;
use crate::value::{Object, Value, TEXT_KEY};
use crate::xml::tree_key;

/// Number of production items per section
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCounts {
    #[serde(rename = "bibliographicProduction")]
    pub bibliographic: usize,
    #[serde(rename = "technicalProduction")]
    pub technical: usize,
    #[serde(rename = "otherProduction")]
    pub other: usize,
}

impl ProductionCounts {
    pub fn total(&self) -> usize {
        self.bibliographic + self.technical + self.other
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(rename = "lattesId")]
    pub identifier: String,
    pub name: String,
    /// `DD/MM/YYYY`, or empty when absent or not a valid date
    #[serde(rename = "lastUpdate")]
    pub last_update: String,
    pub counts: ProductionCounts,
}

impl Summary {
    /// Read the summary fields from the root element of a curriculum
    pub fn extract(cv: &Object, identifier: impl Into<String>, config: &ParserConfig) -> Self {
        let name = cv
            .get(&config.general_data)
            .and_then(|general| general.pointer(&[config.name_field.as_str()]))
            .and_then(Value::as_string)
            .unwrap_or_default()
            .to_string();

        let last_update = cv
            .get(&tree_key(&config.update_attribute))
            .and_then(Value::as_string)
            .map(format_update_date)
            .unwrap_or_default();

        let sections = &config.production;
        Self {
            identifier: identifier.into(),
            name,
            last_update,
            counts: ProductionCounts {
                bibliographic: count_section(cv, &sections.bibliographic),
                technical: count_section(cv, &sections.technical),
                other: count_section(cv, &sections.other),
            },
        }
    }
}

/// `DDMMYYYY` as `DD/MM/YYYY`; empty for anything that is not a real date
pub fn format_update_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() != 8 {
        return String::new();
    }
    Date::parse(raw, format_description!("[day][month][year]"))
        .ok()
        .and_then(|date| date.format(format_description!("[day]/[month]/[year]")).ok())
        .unwrap_or_default()
}

/// Production items under one top-level section
pub fn count_section(cv: &Object, key: &str) -> usize {
    match cv.get(key) {
        Some(Value::Object(section)) => section
            .iter()
            .filter(|(name, _)| name.as_str() != TEXT_KEY)
            .map(|(_, value)| count_items(value))
            .sum(),
        Some(_) | None => 0,
    }
}

/// Leaf items below a value
///
/// A sequence counts its elements and a mapping without child elements is
/// one item. A mapping with child elements is the sum over them. Attributes
/// and text are not items.
pub fn count_items(value: &Value) -> usize {
    match value {
        Value::String(_) => 0,
        Value::Array(items) => items.len(),
        Value::Object(node) => {
            let mut children = node
                .values()
                .filter(|child| !child.is_string())
                .peekable();
            if children.peek().is_none() {
                1
            } else {
                children.map(count_items).sum()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(attrs: &[(&str, &str)]) -> Object {
        let mut node = Object::new();
        for (key, value) in attrs {
            node.insert(*key, *value);
        }
        node
    }

    #[test]
    fn test_update_attribute_in_source_case() {
        let cv = leaf(&[("data-atualizacao", "01022023")]);
        let config = ParserConfig {
            update_attribute: "DATA-ATUALIZACAO".to_string(),
            ..ParserConfig::default()
        };

        let summary = Summary::extract(&cv, "1", &config);
        assert_eq!(summary.last_update, "01/02/2023");
    }

    #[test]
    fn test_bare_item_counts_one() {
        let mut section = Object::new();
        section.insert("artigo", leaf(&[("titulo", "A")]));
        assert_eq!(count_items(&Value::Object(section)), 1);
    }

    #[test]
    fn test_sequence_counts_length() {
        let items: Vec<Value> = (0..3).map(|_| Value::Object(leaf(&[]))).collect();
        assert_eq!(count_items(&Value::from(items)), 3);
    }

    #[test]
    fn test_nested_mapping_sums_children() {
        let mut group = Object::new();
        group.insert("livro", leaf(&[("titulo", "L")]));
        group.insert("capitulo", leaf(&[("titulo", "C")]));
        group.insert(TEXT_KEY, "ignored");
        let mut section = Object::new();
        section.insert("livros-e-capitulos", group);

        let mut cv = Object::new();
        cv.insert("producao-bibliografica", section);
        assert_eq!(count_section(&cv, "producao-bibliografica"), 2);
    }

    #[test]
    fn test_missing_or_string_section_counts_zero() {
        let mut cv = Object::new();
        cv.insert("outra-producao", "texto");
        assert_eq!(count_section(&cv, "outra-producao"), 0);
        assert_eq!(count_section(&cv, "producao-tecnica"), 0);
    }

    #[test]
    fn test_format_update_date() {
        assert_eq!(format_update_date("15032024"), "15/03/2024");
        assert_eq!(format_update_date("31022024"), "");
        assert_eq!(format_update_date("2024"), "");
        assert_eq!(format_update_date(""), "");
    }

    #[test]
    fn test_extract_reads_fixed_paths() {
        let mut general = Object::new();
        general.insert("nome-completo", "Maria da Silva");
        let mut cv = Object::new();
        cv.insert("data-atualizacao", "01122023");
        cv.insert("dados-gerais", general);

        let summary = Summary::extract(&cv, "123", &ParserConfig::default());
        assert_eq!(summary.identifier, "123");
        assert_eq!(summary.name, "Maria da Silva");
        assert_eq!(summary.last_update, "01/12/2023");
        assert_eq!(summary.counts.total(), 0);
    }

    #[test]
    fn test_summary_json_shape() -> Result<(), serde_json::Error> {
        let summary = Summary {
            identifier: "9".to_string(),
            counts: ProductionCounts {
                bibliographic: 2,
                ..ProductionCounts::default()
            },
            ..Summary::default()
        };
        let json = serde_json::to_value(&summary)?;
        assert_eq!(json["lattesId"], "9");
        assert_eq!(json["counts"]["bibliographicProduction"], 2);
        Ok(())
    }
}

//! Schema knowledge the parser needs, as data

use serde::{Deserialize, Serialize};

/// Names of the three production sections, as tree keys
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionSections {
    pub bibliographic: String,
    pub technical: String,
    pub other: String,
}

impl Default for ProductionSections {
    fn default() -> Self {
        Self {
            bibliographic: "producao-bibliografica".to_string(),
            technical: "producao-tecnica".to_string(),
            other: "outra-producao".to_string(),
        }
    }
}

/// Configuration for [`crate::parse_with_config`]
///
/// `Default` describes the Lattes CV export. Element and attribute names
/// used for matching the root are written as in the source document; every
/// other name is a tree key (lowercased).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Expected local name of the root element
    pub root_element: String,
    /// Root attribute holding the record identifier
    pub identifier_attribute: String,
    /// Root attribute holding the last update date (`DDMMYYYY`), in either case
    pub update_attribute: String,
    /// Section trimmed to `general_data_fields`
    pub general_data: String,
    /// Key of the full name inside the general-data section
    pub name_field: String,
    /// Keys kept in the general-data section
    pub general_data_fields: Vec<String>,
    pub production: ProductionSections,
    /// Maximum element nesting depth
    ///
    /// 0, or anything above [`crate::xml::DEPTH_CEILING`], means the ceiling.
    /// Well-formed XML nested deeper than the limit is reported as
    /// [`crate::ErrorKind::MalformedInput`].
    pub max_depth: u16,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            root_element: "CURRICULO-VITAE".to_string(),
            identifier_attribute: "NUMERO-IDENTIFICADOR".to_string(),
            update_attribute: "data-atualizacao".to_string(),
            general_data: "dados-gerais".to_string(),
            name_field: "nome-completo".to_string(),
            general_data_fields: [
                "nome-completo",
                "orcid-id",
                "nome-em-citacoes-bibliograficas",
                "formacao-academica-titulacao",
                "atuacoes-profissionais",
                "areas-de-atuacao",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            production: ProductionSections::default(),
            max_depth: 256,
        }
    }
}

impl ParserConfig {
    /// Replace the general-data allow-list
    pub fn with_general_data_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.general_data_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_general_data_field(&self, key: &str) -> bool {
        self.general_data_fields.iter().any(|field| field == key)
    }
}

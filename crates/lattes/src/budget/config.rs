//! Truncation knobs

use serde::{Deserialize, Serialize};

/// Budget for a single-record summary payload
pub const SUMMARY_BUDGET: usize = 20_000;

/// Budget for a target-plus-peers comparison payload
pub const ANALYSIS_BUDGET: usize = 80_000;

/// Configuration for the truncation policies
///
/// `Default` describes trees produced from Lattes CVs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruncationConfig {
    /// Top-level key of a record (the root element's tree key)
    pub record_key: String,
    /// Section whose fields are also removed by field removal
    pub general_data: String,
    /// Sections dropped first, least valuable first
    pub low_value_sections: Vec<String>,
    /// General-data fields dropped from peer records after the low-value sections
    pub peer_detail_fields: Vec<String>,
    /// Most valuable section; its arrays are halved last
    pub valuable_section: String,
    /// Bytes of serialized JSON per budget unit
    pub divisor: usize,
    /// The comparison target first gets `budget / target_share` on its own
    pub target_share: usize,
    /// Comparison payload key holding the target record
    pub target_key: String,
    /// Comparison payload key holding the peer records
    pub peers_key: String,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            record_key: "curriculo-vitae".to_string(),
            general_data: "dados-gerais".to_string(),
            low_value_sections: vec![
                "dados-complementares".to_string(),
                "outra-producao".to_string(),
                "producao-tecnica".to_string(),
            ],
            peer_detail_fields: vec![
                "atuacoes-profissionais".to_string(),
                "formacao-academica-titulacao".to_string(),
            ],
            valuable_section: "producao-bibliografica".to_string(),
            divisor: 3,
            target_share: 2,
            target_key: "pesquisador_alvo".to_string(),
            peers_key: "outros_pesquisadores".to_string(),
        }
    }
}

impl TruncationConfig {
    pub fn with_divisor(mut self, divisor: usize) -> Self {
        self.divisor = divisor;
        self
    }

    /// Sub-budget granted to the comparison target before peers are considered
    pub fn target_budget(&self, budget: usize) -> usize {
        budget / self.target_share.max(1)
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of a pivot column when no record matched the label.
pub const NO_DATA: &str = "0";

/// Gene identifier as used for matching: trimmed and upper-cased.
/// The display value in the input row is never touched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneKey(String);

impl GeneKey {
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GeneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeFormat {
    #[default]
    Tsv,
    Csv,
}

impl EdgeFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            EdgeFormat::Tsv => b'\t',
            EdgeFormat::Csv => b',',
        }
    }
}

impl fmt::Display for EdgeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeFormat::Tsv => write!(f, "tsv"),
            EdgeFormat::Csv => write!(f, "csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMark {
    pub cell: String,
    pub mark: String,
}

/// How a record's value field turns into a pivot cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub value_field: String,
    pub threshold: f64,
}

impl Signal {
    /// `1` / `-1` for a value at or beyond the threshold, placeholder otherwise.
    pub fn classify(&self, raw: &str) -> &'static str {
        let Ok(value) = raw.trim().parse::<f64>() else {
            return NO_DATA;
        };
        if value > 0.0 && value >= self.threshold {
            "1"
        } else if value < 0.0 && value <= -self.threshold {
            "-1"
        } else {
            NO_DATA
        }
    }
}

/// Output shaping for one dataset. Every variant fixes its column set from
/// configuration alone.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSpec {
    Json {
        count_column: Option<String>,
    },
    Tissues {
        tissues: Vec<String>,
        tissue_field: String,
        signal: Signal,
    },
    Cells {
        pairs: Vec<CellMark>,
        cell_field: String,
        mark_field: String,
        signal: Signal,
    },
    Join {
        join_field: String,
        sep: String,
    },
}

impl OutputSpec {
    pub fn mode(&self) -> &'static str {
        match self {
            OutputSpec::Json { .. } => "json",
            OutputSpec::Tissues { .. } => "tissues",
            OutputSpec::Cells { .. } => "cells",
            OutputSpec::Join { .. } => "join",
        }
    }

    /// Record fields this mode reads beyond `gene_field` and `fields`.
    pub fn extra_fields(&self) -> Vec<&str> {
        match self {
            OutputSpec::Json { .. } => Vec::new(),
            OutputSpec::Tissues {
                tissue_field,
                signal,
                ..
            } => vec![tissue_field.as_str(), signal.value_field.as_str()],
            OutputSpec::Cells {
                cell_field,
                mark_field,
                signal,
                ..
            } => vec![
                cell_field.as_str(),
                mark_field.as_str(),
                signal.value_field.as_str(),
            ],
            OutputSpec::Join { join_field, .. } => vec![join_field.as_str()],
        }
    }
}

/// Label equality for tissue, cell and mark values.
pub fn label_eq(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

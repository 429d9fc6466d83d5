use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{CellMark, EdgeFormat, OutputSpec, Signal, label_eq};
use crate::error::KiraError;
use crate::shaper::output_columns;

pub const DEFAULT_CONFIG_PATH: &str = "config/local_datasets.yml";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatasetEntry {
    pub name: String,
    pub path: Utf8PathBuf,
    #[serde(default)]
    pub format: EdgeFormat,
    pub gene_field: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub output: OutputEntry,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    #[serde(alias = "default")]
    Json,
    Tissues,
    Cells,
    Join,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OutputEntry {
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default)]
    pub count_field: Option<String>,
    #[serde(default)]
    pub tissues: Option<Vec<String>>,
    #[serde(default)]
    pub tissue_field: Option<String>,
    #[serde(default)]
    pub cells: Option<Vec<CellEntry>>,
    #[serde(default)]
    pub cell_field: Option<String>,
    #[serde(default)]
    pub mark_field: Option<String>,
    #[serde(default)]
    pub marks: Option<Vec<String>>,
    #[serde(default)]
    pub value_field: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub join_field: Option<String>,
    #[serde(default)]
    pub sep: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CellEntry {
    Pair([String; 2]),
    Detailed(CellMark),
}

impl CellEntry {
    fn into_cell_mark(self) -> CellMark {
        match self {
            CellEntry::Pair([cell, mark]) => CellMark { cell, mark },
            CellEntry::Detailed(pair) => pair,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetConfig {
    pub name: String,
    pub path: Utf8PathBuf,
    pub format: EdgeFormat,
    pub gene_field: String,
    pub fields: Vec<String>,
    pub skip_rows: usize,
    pub output: OutputSpec,
}

impl DatasetConfig {
    /// Fields kept per record: gene field, declared fields, then whatever the
    /// output mode reads. No duplicates, first occurrence wins.
    pub fn retained_fields(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let candidates = std::iter::once(self.gene_field.as_str())
            .chain(self.fields.iter().map(String::as_str))
            .chain(self.output.extra_fields());
        for field in candidates {
            if seen.insert(field) {
                out.push(field.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub datasets: Vec<DatasetConfig>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KiraError> {
        let config_path = Utf8PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
        let config = Self::parse(&config_path, &content)?;
        Self::resolve_config(config)
    }

    pub fn parse(path: &Utf8Path, content: &str) -> Result<Config, KiraError> {
        let is_yaml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
            .unwrap_or(false);
        if is_yaml {
            serde_yaml::from_str(content).map_err(|err| KiraError::ConfigParse(err.to_string()))
        } else {
            serde_json::from_str(content).map_err(|err| KiraError::ConfigParse(err.to_string()))
        }
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let mut names = HashSet::new();
        let datasets = config
            .datasets
            .into_iter()
            .map(|entry| {
                let name = entry.name.trim().to_string();
                if name.is_empty() {
                    return Err(KiraError::EmptyDatasetName);
                }
                if !names.insert(name.clone()) {
                    return Err(KiraError::DuplicateDataset(name));
                }
                resolve_dataset(name, entry)
            })
            .collect::<Result<Vec<_>, KiraError>>()?;

        let mut columns = HashSet::new();
        for dataset in &datasets {
            for column in output_columns(dataset) {
                if !columns.insert(column.clone()) {
                    return Err(KiraError::ColumnCollision { column });
                }
            }
        }

        Ok(ResolvedConfig {
            schema_version,
            datasets,
        })
    }
}

fn resolve_dataset(name: String, entry: DatasetEntry) -> Result<DatasetConfig, KiraError> {
    let invalid = |message: &str| KiraError::InvalidOutputSpec {
        dataset: name.clone(),
        message: message.to_string(),
    };

    let gene_field = entry.gene_field.trim().to_string();
    if gene_field.is_empty() {
        return Err(invalid("gene_field must not be empty"));
    }

    let output = entry.output;
    let threshold = output.threshold.unwrap_or(0.0);
    if !threshold.is_finite() || threshold < 0.0 {
        return Err(invalid("threshold must be a non-negative number"));
    }
    let signal = || Signal {
        value_field: output
            .value_field
            .clone()
            .unwrap_or_else(|| "weight".to_string()),
        threshold,
    };

    let spec = match output.mode {
        OutputMode::Json => OutputSpec::Json {
            count_column: output.count_field.clone(),
        },
        OutputMode::Tissues => {
            let tissues = output.tissues.clone().unwrap_or_default();
            if tissues.is_empty() {
                return Err(invalid("tissues mode requires a non-empty `tissues` list"));
            }
            OutputSpec::Tissues {
                tissues,
                tissue_field: output
                    .tissue_field
                    .clone()
                    .unwrap_or_else(|| "target".to_string()),
                signal: signal(),
            }
        }
        OutputMode::Cells => {
            let declared = output.cells.clone().unwrap_or_default();
            if declared.is_empty() {
                return Err(invalid("cells mode requires a non-empty `cells` list"));
            }
            let mut pairs: Vec<CellMark> =
                declared.into_iter().map(CellEntry::into_cell_mark).collect();
            if let Some(marks) = &output.marks {
                pairs.retain(|pair| marks.iter().any(|mark| label_eq(mark, &pair.mark)));
                if pairs.is_empty() {
                    return Err(invalid("`marks` filter removes every cell/mark pair"));
                }
            }
            OutputSpec::Cells {
                pairs,
                cell_field: output
                    .cell_field
                    .clone()
                    .unwrap_or_else(|| "target".to_string()),
                mark_field: output
                    .mark_field
                    .clone()
                    .unwrap_or_else(|| "mark".to_string()),
                signal: signal(),
            }
        }
        OutputMode::Join => {
            let join_field = output
                .join_field
                .clone()
                .or_else(|| entry.fields.first().cloned())
                .ok_or_else(|| invalid("join mode requires `join_field` or a non-empty `fields`"))?;
            OutputSpec::Join {
                join_field,
                sep: output.sep.clone().unwrap_or_else(|| "|".to_string()),
            }
        }
    };

    Ok(DatasetConfig {
        name,
        path: entry.path,
        format: entry.format,
        gene_field,
        fields: entry.fields,
        skip_rows: entry.skip_rows,
        output: spec,
    })
}

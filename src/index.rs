use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};

use csv::{ByteRecord, ReaderBuilder};
use flate2::read::MultiGzDecoder;
use tracing::{debug, info, warn};

use crate::config::DatasetConfig;
use crate::domain::{EdgeFormat, GeneKey};
use crate::error::{DatasetLoadError, LoadCause};

/// One edge-file row restricted to the dataset's retained fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<String>,
}

impl Record {
    pub fn get(&self, position: usize) -> &str {
        self.values.get(position).map(String::as_str).unwrap_or("")
    }
}

/// Gene to records lookup for one dataset. Read-only once built.
#[derive(Debug, Clone)]
pub struct DatasetIndex {
    dataset: String,
    fields: Vec<String>,
    buckets: HashMap<GeneKey, Vec<Record>>,
    records: usize,
}

impl DatasetIndex {
    /// Stand-in for a dataset that failed to load: matches nothing.
    pub fn empty(config: &DatasetConfig) -> Self {
        Self {
            dataset: config.name.clone(),
            fields: config.retained_fields(),
            buckets: HashMap::new(),
            records: 0,
        }
    }

    pub fn build(config: &DatasetConfig) -> Result<Self, DatasetLoadError> {
        let reader = open_edges(config)?;
        let index = Self::from_reader(config, reader)?;
        info!(
            dataset = %config.name,
            path = %config.path,
            format = %config.format,
            genes = index.gene_count(),
            records = index.record_count(),
            "dataset indexed"
        );
        Ok(index)
    }

    pub fn from_reader<R: Read>(config: &DatasetConfig, reader: R) -> Result<Self, DatasetLoadError> {
        let fail = |cause: LoadCause| DatasetLoadError {
            dataset: config.name.clone(),
            cause,
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(config.format.delimiter())
            .quoting(matches!(config.format, EdgeFormat::Csv))
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = reader
            .byte_headers()
            .map_err(|err| fail(csv_cause(&err)))?
            .iter()
            .map(|name| {
                String::from_utf8_lossy(name)
                    .trim_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        let fields = config.retained_fields();
        let positions = fields
            .iter()
            .map(|field| {
                header
                    .iter()
                    .position(|name| name == field)
                    .ok_or_else(|| fail(LoadCause::MissingField(field.clone())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        // retained_fields() always starts with gene_field
        let gene_position = positions[0];

        let mut buckets: HashMap<GeneKey, Vec<Record>> = HashMap::new();
        let mut records = 0;
        let mut raw = ByteRecord::new();
        let mut row = 0usize;
        loop {
            let more = reader
                .read_byte_record(&mut raw)
                .map_err(|err| fail(csv_cause(&err)))?;
            if !more {
                break;
            }
            row += 1;
            if row <= config.skip_rows {
                continue;
            }

            // only the gene key is normalized; retained values stay verbatim
            let key = GeneKey::new(&field_text(&raw, gene_position));
            if key.is_empty() {
                debug!(
                    dataset = %config.name,
                    line = raw.position().map(|pos| pos.line()).unwrap_or(0),
                    "edge record without gene value skipped"
                );
                continue;
            }

            let values = positions
                .iter()
                .map(|&position| field_text(&raw, position))
                .collect();
            buckets.entry(key).or_default().push(Record { values });
            records += 1;
        }

        Ok(Self {
            dataset: config.name.clone(),
            fields,
            buckets,
            records,
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|name| name == field)
    }

    /// Records for `key` in file order; empty when the gene is unknown.
    pub fn lookup(&self, key: &GeneKey) -> &[Record] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn gene_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn record_count(&self) -> usize {
        self.records
    }
}

/// A configured dataset with its index. A dataset that failed to load keeps
/// an empty index and the error that caused it.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub config: DatasetConfig,
    pub index: DatasetIndex,
    pub error: Option<DatasetLoadError>,
}

impl LoadedDataset {
    pub fn load(config: &DatasetConfig) -> Self {
        match DatasetIndex::build(config) {
            Ok(index) => Self {
                config: config.clone(),
                index,
                error: None,
            },
            Err(err) => {
                warn!(dataset = %err.dataset, cause = %err.cause, "dataset skipped");
                Self {
                    config: config.clone(),
                    index: DatasetIndex::empty(config),
                    error: Some(err),
                }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.error.is_none()
    }
}

fn open_edges(config: &DatasetConfig) -> Result<Box<dyn Read>, DatasetLoadError> {
    let file = File::open(config.path.as_std_path()).map_err(|err| DatasetLoadError {
        dataset: config.name.clone(),
        cause: match err.kind() {
            io::ErrorKind::NotFound => LoadCause::Missing(config.path.clone()),
            _ => LoadCause::Unreadable(format!("{}: {err}", config.path)),
        },
    })?;
    let reader = BufReader::new(file);
    let gzipped = config
        .path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if gzipped {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

fn field_text(record: &ByteRecord, position: usize) -> String {
    record
        .get(position)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

fn csv_cause(err: &csv::Error) -> LoadCause {
    match err.kind() {
        csv::ErrorKind::Io(io_err) => LoadCause::Unreadable(io_err.to_string()),
        _ => LoadCause::Malformed {
            line: err.position().map(|pos| pos.line()).unwrap_or(0),
            message: err.to_string(),
        },
    }
}

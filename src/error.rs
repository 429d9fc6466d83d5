use std::fmt;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    #[error("dataset name must not be empty")]
    #[diagnostic(help("every dataset needs a unique `name`; it prefixes its output columns"))]
    EmptyDatasetName,

    #[error("duplicate dataset name: {0}")]
    #[diagnostic(help("dataset names prefix output columns and must be unique"))]
    DuplicateDataset(String),

    #[error("invalid output spec for dataset {dataset}: {message}")]
    InvalidOutputSpec { dataset: String, message: String },

    #[error("output column {column} is produced twice")]
    #[diagnostic(help("rename the dataset or its `count_field`"))]
    ColumnCollision { column: String },

    #[error("input has no gene column (expected `gene` or `基因`), columns: {columns}")]
    #[diagnostic(help("pass --gene-column <N> to pick the column by its 1-based index"))]
    GeneColumnUnresolved { columns: String },

    #[error("gene column index {index} is out of range (input has {columns} columns)")]
    GeneColumnOutOfRange { index: usize, columns: usize },

    #[error("gene input has no rows: {0}")]
    EmptyInput(String),

    #[error("malformed gene input {source_name}: {message}")]
    InputRead {
        source_name: String,
        message: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to render matches of dataset {dataset}: {message}")]
    Render { dataset: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    InputFormat,
    Io,
}

impl KiraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KiraError::ConfigRead(_)
            | KiraError::ConfigParse(_)
            | KiraError::EmptyDatasetName
            | KiraError::DuplicateDataset(_)
            | KiraError::InvalidOutputSpec { .. }
            | KiraError::ColumnCollision { .. }
            | KiraError::GeneColumnUnresolved { .. } => ErrorKind::Config,
            KiraError::GeneColumnOutOfRange { .. }
            | KiraError::EmptyInput(_)
            | KiraError::InputRead { .. } => ErrorKind::InputFormat,
            KiraError::Filesystem(_) | KiraError::Render { .. } => ErrorKind::Io,
        }
    }
}

/// A dataset that could not be indexed. Never fatal: the run keeps going and
/// the dataset contributes empty columns for every gene.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("dataset {dataset} failed to load: {cause}")]
pub struct DatasetLoadError {
    pub dataset: String,
    pub cause: LoadCause,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadCause {
    Missing(Utf8PathBuf),
    Unreadable(String),
    MissingField(String),
    Malformed { line: u64, message: String },
}

impl fmt::Display for LoadCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadCause::Missing(path) => write!(f, "file not found: {path}"),
            LoadCause::Unreadable(message) => write!(f, "unreadable: {message}"),
            LoadCause::MissingField(field) => write!(f, "header has no field `{field}`"),
            LoadCause::Malformed { line, message } => write!(f, "line {line}: {message}"),
        }
    }
}

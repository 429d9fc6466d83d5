use std::io::Write;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::error::KiraError;
use crate::index::LoadedDataset;
use crate::input::GeneTable;
use crate::merge::{TableWriter, build_header, merge_row};
use crate::output::OutputTarget;

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub delimiter: u8,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self { delimiter: b'\t' }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationReport {
    pub rows: usize,
    pub columns: usize,
    pub datasets: Vec<DatasetSummary>,
    pub warnings: Vec<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub name: String,
    pub mode: String,
    pub path: String,
    pub status: String,
    pub genes: usize,
    pub records: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// One annotation run over a fixed dataset configuration.
pub struct App {
    config: ResolvedConfig,
    options: AnnotateOptions,
}

struct Prepared {
    datasets: Vec<LoadedDataset>,
    header: Vec<String>,
}

impl App {
    pub fn new(config: ResolvedConfig, options: AnnotateOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Annotates `table` into `target`. The target is only opened once every
    /// fatal check has passed.
    pub fn annotate(
        &self,
        table: &GeneTable,
        target: &OutputTarget,
        sink: &dyn ProgressSink,
    ) -> Result<AnnotationReport, KiraError> {
        let prepared = self.prepare(table, sink)?;
        target.write_with(|writer| self.write_rows(table, &prepared, writer, sink))
    }

    pub fn annotate_to_writer<W: Write>(
        &self,
        table: &GeneTable,
        writer: W,
        sink: &dyn ProgressSink,
    ) -> Result<AnnotationReport, KiraError> {
        let prepared = self.prepare(table, sink)?;
        self.write_rows(table, &prepared, writer, sink)
    }

    fn prepare(&self, table: &GeneTable, sink: &dyn ProgressSink) -> Result<Prepared, KiraError> {
        let mut datasets = Vec::with_capacity(self.config.datasets.len());
        for config in &self.config.datasets {
            let start = Instant::now();
            sink.event(ProgressEvent {
                message: format!("phase=Index; dataset={}", config.name),
                elapsed: None,
            });
            let loaded = LoadedDataset::load(config);
            let message = match &loaded.error {
                None => format!(
                    "phase=Index; dataset={} genes={} records={}",
                    config.name,
                    loaded.index.gene_count(),
                    loaded.index.record_count()
                ),
                Some(err) => format!("phase=Index; warning: {err}"),
            };
            sink.event(ProgressEvent {
                message,
                elapsed: Some(start.elapsed()),
            });
            datasets.push(loaded);
        }
        let header = build_header(table.columns(), &datasets)?;
        Ok(Prepared { datasets, header })
    }

    fn write_rows<W: Write>(
        &self,
        table: &GeneTable,
        prepared: &Prepared,
        writer: W,
        sink: &dyn ProgressSink,
    ) -> Result<AnnotationReport, KiraError> {
        let start = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Annotate; rows={}", table.len()),
            elapsed: None,
        });

        let mut out = TableWriter::new(writer, self.options.delimiter, &prepared.header)?;
        for row in table.rows() {
            out.write_row(&merge_row(row, &prepared.datasets)?)?;
        }
        let rows = out.rows();
        let mut inner = out.finish()?;
        inner
            .flush()
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;

        sink.event(ProgressEvent {
            message: format!("phase=Annotate; wrote {rows} rows"),
            elapsed: Some(start.elapsed()),
        });
        info!(
            rows,
            columns = prepared.header.len(),
            "annotation written"
        );

        Ok(report(rows, prepared))
    }
}

fn report(rows: usize, prepared: &Prepared) -> AnnotationReport {
    let datasets = prepared
        .datasets
        .iter()
        .map(|dataset| DatasetSummary {
            name: dataset.config.name.clone(),
            mode: dataset.config.output.mode().to_string(),
            path: dataset.config.path.to_string(),
            status: if dataset.is_loaded() {
                "loaded".to_string()
            } else {
                "failed".to_string()
            },
            genes: dataset.index.gene_count(),
            records: dataset.index.record_count(),
            error: dataset.error.as_ref().map(|err| err.cause.to_string()),
        })
        .collect();
    let warnings = prepared
        .datasets
        .iter()
        .filter_map(|dataset| dataset.error.as_ref().map(ToString::to_string))
        .collect();

    AnnotationReport {
        rows,
        columns: prepared.header.len(),
        datasets,
        warnings,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

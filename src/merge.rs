use std::borrow::Cow;
use std::collections::HashSet;
use std::io::Write;

use csv::{QuoteStyle, WriterBuilder};

use crate::error::KiraError;
use crate::index::LoadedDataset;
use crate::input::GeneRow;
use crate::shaper::{output_columns, shape};

/// Output header: input columns, then one block per dataset in config order.
pub fn build_header(
    input_columns: &[String],
    datasets: &[LoadedDataset],
) -> Result<Vec<String>, KiraError> {
    let mut seen: HashSet<String> = input_columns.iter().cloned().collect();
    let mut header = input_columns.to_vec();
    for dataset in datasets {
        for column in output_columns(&dataset.config) {
            if !seen.insert(column.clone()) {
                return Err(KiraError::ColumnCollision { column });
            }
            header.push(column);
        }
    }
    Ok(header)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedRow {
    values: Vec<String>,
}

impl AnnotatedRow {
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

pub fn merge_row(row: &GeneRow, datasets: &[LoadedDataset]) -> Result<AnnotatedRow, KiraError> {
    let key = row.key();
    let mut values = row.values().to_vec();
    for dataset in datasets {
        values.extend(shape(&dataset.config, &dataset.index, &key)?);
    }
    Ok(AnnotatedRow { values })
}

/// Delimited writer that refuses ragged rows.
///
/// Tab output is never quoted so input columns round-trip verbatim; a tab or
/// line break inside a value is written as a single space.
pub struct TableWriter<W: Write> {
    writer: csv::Writer<W>,
    plain: bool,
    width: usize,
    rows: usize,
}

impl<W: Write> TableWriter<W> {
    pub fn new(inner: W, delimiter: u8, header: &[String]) -> Result<Self, KiraError> {
        let plain = delimiter == b'\t';
        let quote_style = if plain {
            QuoteStyle::Never
        } else {
            QuoteStyle::Necessary
        };
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(quote_style)
            .has_headers(false)
            .from_writer(inner);
        writer
            .write_record(header.iter().map(|value| flatten(plain, value).into_owned().into_bytes()))
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        Ok(Self {
            writer,
            plain,
            width: header.len(),
            rows: 0,
        })
    }

    pub fn write_row(&mut self, row: &AnnotatedRow) -> Result<(), KiraError> {
        if row.values.len() != self.width {
            return Err(KiraError::Filesystem(format!(
                "row {} has {} columns, header has {}",
                self.rows + 1,
                row.values.len(),
                self.width
            )));
        }
        let plain = self.plain;
        self.writer
            .write_record(row.values.iter().map(|value| flatten(plain, value).into_owned().into_bytes()))
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> Result<W, KiraError> {
        self.writer
            .into_inner()
            .map_err(|err| KiraError::Filesystem(err.to_string()))
    }
}

fn flatten(plain: bool, value: &str) -> Cow<'_, str> {
    if plain && value.contains(['\t', '\n', '\r']) {
        Cow::Owned(value.replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

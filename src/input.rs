use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use csv::ReaderBuilder;

use crate::domain::GeneKey;
use crate::error::KiraError;

/// Header names recognised as the gene column when no index is given.
pub const GENE_COLUMN_NAMES: [&str; 2] = ["gene", "基因"];

pub const DEFAULT_GENE_COLUMN: &str = "gene";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRow {
    values: Vec<String>,
    gene: usize,
}

impl GeneRow {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn gene(&self) -> &str {
        &self.values[self.gene]
    }

    pub fn key(&self) -> GeneKey {
        GeneKey::new(self.gene())
    }
}

/// Input rows in file order with their original header.
#[derive(Debug, Clone)]
pub struct GeneTable {
    columns: Vec<String>,
    gene_column: usize,
    rows: Vec<GeneRow>,
}

impl GeneTable {
    pub fn from_genes<S: AsRef<str>>(genes: &[S]) -> Result<Self, KiraError> {
        if genes.is_empty() {
            return Err(KiraError::EmptyInput("no genes given".to_string()));
        }
        let mut table = Self {
            columns: vec![DEFAULT_GENE_COLUMN.to_string()],
            gene_column: 0,
            rows: Vec::with_capacity(genes.len()),
        };
        table.append_genes(genes);
        Ok(table)
    }

    pub fn from_path(
        path: &Utf8Path,
        delimiter: u8,
        gene_column: Option<usize>,
    ) -> Result<Self, KiraError> {
        let file = File::open(path.as_std_path()).map_err(|err| KiraError::InputRead {
            source_name: path.to_string(),
            message: err.to_string(),
        })?;
        Self::from_reader(file, path.as_str(), delimiter, gene_column)
    }

    /// `gene_column` is 1-based and wins over header-name detection.
    pub fn from_reader<R: Read>(
        reader: R,
        source_name: &str,
        delimiter: u8,
        gene_column: Option<usize>,
    ) -> Result<Self, KiraError> {
        let read_err = |err: csv::Error| KiraError::InputRead {
            source_name: source_name.to_string(),
            message: err.to_string(),
        };

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .quoting(delimiter != b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader
            .headers()
            .map_err(read_err)?
            .iter()
            .map(|name| name.trim_matches('\u{feff}').to_string())
            .collect();
        if columns.iter().all(|name| name.is_empty()) {
            return Err(KiraError::EmptyInput(source_name.to_string()));
        }

        let gene = resolve_gene_column(&columns, gene_column)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            if record.len() > columns.len() {
                let line = record.position().map(|pos| pos.line()).unwrap_or(0);
                return Err(KiraError::InputRead {
                    source_name: source_name.to_string(),
                    message: format!(
                        "line {line} has {} fields, header has {}",
                        record.len(),
                        columns.len()
                    ),
                });
            }
            let mut values: Vec<String> = record.iter().map(str::to_string).collect();
            values.resize(columns.len(), String::new());
            rows.push(GeneRow { values, gene });
        }

        if rows.is_empty() {
            return Err(KiraError::EmptyInput(source_name.to_string()));
        }

        Ok(Self {
            columns,
            gene_column: gene,
            rows,
        })
    }

    /// Extra genes go after the existing rows, other columns left empty.
    pub fn append_genes<S: AsRef<str>>(&mut self, genes: &[S]) {
        for gene in genes {
            let mut values = vec![String::new(); self.columns.len()];
            values[self.gene_column] = gene.as_ref().to_string();
            self.rows.push(GeneRow {
                values,
                gene: self.gene_column,
            });
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn gene_column(&self) -> &str {
        &self.columns[self.gene_column]
    }

    pub fn rows(&self) -> &[GeneRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn resolve_gene_column(columns: &[String], explicit: Option<usize>) -> Result<usize, KiraError> {
    if let Some(index) = explicit {
        if index == 0 || index > columns.len() {
            return Err(KiraError::GeneColumnOutOfRange {
                index,
                columns: columns.len(),
            });
        }
        return Ok(index - 1);
    }
    columns
        .iter()
        .position(|name| {
            let name = name.trim();
            GENE_COLUMN_NAMES
                .iter()
                .any(|accepted| name.to_lowercase() == *accepted)
        })
        .ok_or_else(|| KiraError::GeneColumnUnresolved {
            columns: columns.join(", "),
        })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn direct_genes_get_single_column() {
        let table = GeneTable::from_genes(&["EGFR", "TP53"]).unwrap();
        assert_eq!(table.columns(), ["gene"]);
        assert_eq!(table.rows()[1].gene(), "TP53");
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let data = "Score\tGENE\nx\tKRAS\n";
        let table = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap();
        assert_eq!(table.gene_column(), "GENE");
        assert_eq!(table.rows()[0].gene(), "KRAS");
    }

    #[test]
    fn explicit_index_beats_header() {
        let data = "gene\tsymbol\nA\tBRAF\n";
        let table = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', Some(2)).unwrap();
        assert_eq!(table.rows()[0].gene(), "BRAF");
    }

    #[test]
    fn empty_gene_rows_are_kept() {
        let data = "gene\tnote\nEGFR\ta\n\tb\nEGFR\tc\n";
        let table = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[1].gene(), "");
        assert_eq!(table.rows()[2].values()[1], "c");
    }

    #[test]
    fn short_rows_are_padded() {
        let data = "gene\tnote\tscore\nEGFR\n";
        let table = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap();
        assert_eq!(table.rows()[0].values(), ["EGFR", "", ""]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let data = "gene\nEGFR\textra\n";
        let err = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap_err();
        assert_matches!(err, KiraError::InputRead { .. });
    }

    #[test]
    fn tab_input_keeps_quotes_verbatim() {
        let data = "gene\tnote\nKRAS\t\"5 inch\nEGFR\t\"a\"\nTP53\ty\n";
        let table = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0].values(), ["KRAS", "\"5 inch"]);
        assert_eq!(table.rows()[1].values(), ["EGFR", "\"a\""]);
        assert_eq!(table.rows()[2].gene(), "TP53");
    }

    #[test]
    fn comma_input_still_honours_quotes() {
        let data = "gene,note\nKRAS,\"a, b\"\n";
        let table = GeneTable::from_reader(data.as_bytes(), "mem", b',', None).unwrap();
        assert_eq!(table.rows()[0].values(), ["KRAS", "a, b"]);
    }

    #[test]
    fn bom_is_stripped_from_header() {
        let data = "\u{feff}gene\tx\nTP53\t1\n";
        let table = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap();
        assert_eq!(table.columns()[0], "gene");
    }

    #[test]
    fn missing_gene_column_is_config_error() {
        let data = "symbol\tscore\nEGFR\t1\n";
        let err = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap_err();
        assert_matches!(err, KiraError::GeneColumnUnresolved { .. });
    }

    #[test]
    fn index_out_of_range() {
        let data = "gene\nEGFR\n";
        let err = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', Some(3)).unwrap_err();
        assert_matches!(err, KiraError::GeneColumnOutOfRange { index: 3, columns: 1 });
        let err = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', Some(0)).unwrap_err();
        assert_matches!(err, KiraError::GeneColumnOutOfRange { index: 0, .. });
    }

    #[test]
    fn header_only_is_empty_input() {
        let data = "gene\tscore\n";
        let err = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap_err();
        assert_matches!(err, KiraError::EmptyInput(_));
        let err = GeneTable::from_reader("".as_bytes(), "mem", b'\t', None).unwrap_err();
        assert_matches!(err, KiraError::EmptyInput(_));
    }

    #[test]
    fn appended_genes_follow_file_rows() {
        let data = "gene\tscore\nKRAS\t5\n";
        let mut table = GeneTable::from_reader(data.as_bytes(), "mem", b'\t', None).unwrap();
        table.append_genes(&["TP53"]);
        assert_eq!(table.rows()[1].values(), ["TP53", ""]);
    }
}

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::config::DatasetConfig;
use crate::domain::{GeneKey, NO_DATA, OutputSpec, Signal, label_eq};
use crate::error::KiraError;
use crate::index::{DatasetIndex, Record};

/// Column names for a dataset, fixed by configuration alone.
pub fn output_columns(dataset: &DatasetConfig) -> Vec<String> {
    let name = &dataset.name;
    match &dataset.output {
        OutputSpec::Json { count_column } => vec![
            format!("{name}_json"),
            count_column
                .clone()
                .unwrap_or_else(|| format!("{name}_count")),
        ],
        OutputSpec::Tissues { tissues, .. } => tissues
            .iter()
            .map(|tissue| format!("{name}_{tissue}"))
            .collect(),
        OutputSpec::Cells { pairs, .. } => pairs
            .iter()
            .map(|pair| format!("{name}_{}_{}", pair.cell, pair.mark))
            .collect(),
        OutputSpec::Join { .. } => vec![format!("{name}_joined")],
    }
}

/// Values for one gene, aligned with [`output_columns`].
pub fn shape(
    dataset: &DatasetConfig,
    index: &DatasetIndex,
    key: &GeneKey,
) -> Result<Vec<String>, KiraError> {
    let hits = index.lookup(key);
    let values = match &dataset.output {
        OutputSpec::Json { .. } => {
            let fields: Vec<(&str, Option<usize>)> = dataset
                .fields
                .iter()
                .map(|field| (field.as_str(), index.position(field)))
                .collect();
            let view: Vec<RecordView<'_>> = hits
                .iter()
                .map(|record| RecordView {
                    fields: &fields,
                    record,
                })
                .collect();
            let json = serde_json::to_string(&view).map_err(|err| KiraError::Render {
                dataset: dataset.name.clone(),
                message: err.to_string(),
            })?;
            vec![json, hits.len().to_string()]
        }
        OutputSpec::Tissues {
            tissues,
            tissue_field,
            signal,
        } => {
            let label = index.position(tissue_field);
            tissues
                .iter()
                .map(|tissue| {
                    let found = hits.iter().find(|record| {
                        label.is_some_and(|position| label_eq(record.get(position), tissue))
                    });
                    pivot_value(index, signal, found)
                })
                .collect()
        }
        OutputSpec::Cells {
            pairs,
            cell_field,
            mark_field,
            signal,
        } => {
            let cell = index.position(cell_field);
            let mark = index.position(mark_field);
            pairs
                .iter()
                .map(|pair| {
                    let found = hits.iter().find(|record| match (cell, mark) {
                        (Some(cell), Some(mark)) => {
                            label_eq(record.get(cell), &pair.cell)
                                && label_eq(record.get(mark), &pair.mark)
                        }
                        _ => false,
                    });
                    pivot_value(index, signal, found)
                })
                .collect()
        }
        OutputSpec::Join { join_field, sep } => {
            let joined = match index.position(join_field) {
                Some(position) => hits
                    .iter()
                    .map(|record| record.get(position))
                    .collect::<Vec<_>>()
                    .join(sep),
                None => String::new(),
            };
            vec![joined]
        }
    };
    Ok(values)
}

fn pivot_value(index: &DatasetIndex, signal: &Signal, found: Option<&Record>) -> String {
    match (found, index.position(&signal.value_field)) {
        (Some(record), Some(position)) => signal.classify(record.get(position)).to_string(),
        _ => NO_DATA.to_string(),
    }
}

/// A record rendered as a JSON object with keys in declared field order.
struct RecordView<'a> {
    fields: &'a [(&'a str, Option<usize>)],
    record: &'a Record,
}

impl Serialize for RecordView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, position) in self.fields {
            let value = position.map(|position| self.record.get(position)).unwrap_or("");
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::domain::{CellMark, EdgeFormat};

    const EDGES: &str = "source\ttarget\tmark\tweight\n\
X\tLiver\tH3K4me3\t1\n\
X\tLiver\tH3K27ac\t-1\n\
X\tLung\tH3K4me3\t-0.2\n\
Y\tHeart\tH3K4me3\t1\n";

    fn dataset(name: &str, fields: &[&str], output: OutputSpec) -> DatasetConfig {
        DatasetConfig {
            name: name.to_string(),
            path: Utf8PathBuf::from("unused.tsv"),
            format: EdgeFormat::Tsv,
            gene_field: "source".to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            skip_rows: 0,
            output,
        }
    }

    fn signal() -> Signal {
        Signal {
            value_field: "weight".to_string(),
            threshold: 0.0,
        }
    }

    fn run(dataset: &DatasetConfig, gene: &str) -> Vec<String> {
        let index = DatasetIndex::from_reader(dataset, EDGES.as_bytes()).unwrap();
        shape(dataset, &index, &GeneKey::new(gene)).unwrap()
    }

    #[test]
    fn json_mode_lists_declared_fields_in_order() {
        let ds = dataset(
            "D",
            &["weight", "target"],
            OutputSpec::Json { count_column: None },
        );
        assert_eq!(output_columns(&ds), ["D_json", "D_count"]);
        let values = run(&ds, "y");
        assert_eq!(values[0], r#"[{"weight":"1","target":"Heart"}]"#);
        assert_eq!(values[1], "1");
    }

    #[test]
    fn json_mode_without_hits() {
        let ds = dataset(
            "D",
            &["target"],
            OutputSpec::Json {
                count_column: Some("hits".to_string()),
            },
        );
        assert_eq!(output_columns(&ds), ["D_json", "hits"]);
        assert_eq!(run(&ds, "KRAS"), ["[]", "0"]);
    }

    #[test]
    fn tissues_pivot_first_match_wins() {
        let ds = dataset(
            "T",
            &[],
            OutputSpec::Tissues {
                tissues: vec!["Liver".to_string(), "Lung".to_string(), "Brain".to_string()],
                tissue_field: "target".to_string(),
                signal: signal(),
            },
        );
        assert_eq!(output_columns(&ds), ["T_Liver", "T_Lung", "T_Brain"]);
        assert_eq!(run(&ds, "X"), ["1", "-1", NO_DATA]);
    }

    #[test]
    fn tissues_threshold_masks_weak_values() {
        let ds = dataset(
            "T",
            &[],
            OutputSpec::Tissues {
                tissues: vec!["Lung".to_string()],
                tissue_field: "target".to_string(),
                signal: Signal {
                    value_field: "weight".to_string(),
                    threshold: 0.5,
                },
            },
        );
        assert_eq!(run(&ds, "X"), [NO_DATA]);
    }

    #[test]
    fn cells_pivot_matches_cell_and_mark() {
        let ds = dataset(
            "C",
            &[],
            OutputSpec::Cells {
                pairs: vec![
                    CellMark {
                        cell: "Liver".to_string(),
                        mark: "H3K27ac".to_string(),
                    },
                    CellMark {
                        cell: "Lung".to_string(),
                        mark: "H3K27ac".to_string(),
                    },
                ],
                cell_field: "target".to_string(),
                mark_field: "mark".to_string(),
                signal: signal(),
            },
        );
        assert_eq!(output_columns(&ds), ["C_Liver_H3K27ac", "C_Lung_H3K27ac"]);
        assert_eq!(run(&ds, "x"), ["-1", NO_DATA]);
        assert_eq!(run(&ds, "unknown"), [NO_DATA, NO_DATA]);
    }

    #[test]
    fn join_concatenates_in_file_order() {
        let ds = dataset(
            "J",
            &["target"],
            OutputSpec::Join {
                join_field: "target".to_string(),
                sep: ";".to_string(),
            },
        );
        assert_eq!(output_columns(&ds), ["J_joined"]);
        assert_eq!(run(&ds, "X"), ["Liver;Liver;Lung"]);
        assert_eq!(run(&ds, "Z"), [""]);
    }

    #[test]
    fn empty_index_yields_placeholders() {
        let ds = dataset(
            "T",
            &[],
            OutputSpec::Tissues {
                tissues: vec!["Liver".to_string()],
                tissue_field: "target".to_string(),
                signal: signal(),
            },
        );
        let index = DatasetIndex::empty(&ds);
        assert_eq!(shape(&ds, &index, &GeneKey::new("X")).unwrap(), [NO_DATA]);
    }
}

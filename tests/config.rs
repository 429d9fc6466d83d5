use assert_matches::assert_matches;
use camino::Utf8Path;

use kira_annotate::config::{Config, ConfigLoader};
use kira_annotate::domain::{CellMark, OutputSpec};
use kira_annotate::error::{ErrorKind, KiraError};

fn resolve_yaml(yaml: &str) -> Result<kira_annotate::config::ResolvedConfig, KiraError> {
    let config: Config = ConfigLoader::parse(Utf8Path::new("datasets.yml"), yaml)?;
    ConfigLoader::resolve_config(config)
}

#[test]
fn parses_every_mode() {
    let resolved = resolve_yaml(
        r#"
schema_version: 1
datasets:
  - name: GTEx
    path: edges/gtex.txt.gz
    gene_field: source
    fields: [target, weight]
  - name: HPA
    path: edges/hpa.tsv
    gene_field: source
    output:
      mode: tissues
      tissues: [Liver, Lung]
      threshold: 0.5
  - name: ENCODE
    path: edges/encode.tsv
    gene_field: source
    output:
      mode: cells
      cell_field: cell
      cells:
        - [HepG2, H3K4me3]
        - { cell: K562, mark: H3K27ac }
      marks: [h3k4me3]
  - name: KEGG
    path: edges/kegg.csv
    format: csv
    gene_field: gene
    fields: [pathway]
    output:
      mode: join
      sep: "; "
"#,
    )
    .unwrap();

    assert_eq!(resolved.datasets.len(), 4);
    assert_eq!(resolved.datasets[0].output.mode(), "json");
    assert_matches!(
        &resolved.datasets[1].output,
        OutputSpec::Tissues { tissues, tissue_field, signal }
            if tissues.len() == 2 && tissue_field == "target" && signal.threshold == 0.5
    );
    assert_matches!(
        &resolved.datasets[2].output,
        OutputSpec::Cells { pairs, cell_field, .. }
            if cell_field == "cell"
                && pairs == &vec![CellMark { cell: "HepG2".to_string(), mark: "H3K4me3".to_string() }]
    );
    assert_matches!(
        &resolved.datasets[3].output,
        OutputSpec::Join { join_field, sep } if join_field == "pathway" && sep == "; "
    );
}

#[test]
fn default_alias_maps_to_json() {
    let resolved = resolve_yaml(
        "datasets:\n  - name: D\n    path: d.tsv\n    gene_field: source\n    output:\n      mode: default\n      count_field: D_hits\n",
    )
    .unwrap();
    assert_eq!(
        resolved.datasets[0].output,
        OutputSpec::Json {
            count_column: Some("D_hits".to_string())
        }
    );
}

#[test]
fn duplicate_names_are_fatal() {
    let err = resolve_yaml(
        "datasets:\n  - {name: D, path: a.tsv, gene_field: g}\n  - {name: D, path: b.tsv, gene_field: g}\n",
    )
    .unwrap_err();
    assert_matches!(err, KiraError::DuplicateDataset(ref name) if name == "D");
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn tissues_without_labels_is_fatal() {
    let err = resolve_yaml(
        "datasets:\n  - name: T\n    path: t.tsv\n    gene_field: g\n    output: {mode: tissues}\n",
    )
    .unwrap_err();
    assert_matches!(err, KiraError::InvalidOutputSpec { dataset, .. } if dataset == "T");
}

#[test]
fn mark_filter_removing_everything_is_fatal() {
    let err = resolve_yaml(
        "datasets:\n  - name: C\n    path: c.tsv\n    gene_field: g\n    output:\n      mode: cells\n      cells: [[HepG2, H3K4me3]]\n      marks: [H3K9me3]\n",
    )
    .unwrap_err();
    assert_matches!(err, KiraError::InvalidOutputSpec { .. });
}

#[test]
fn join_without_field_is_fatal() {
    let err = resolve_yaml(
        "datasets:\n  - name: J\n    path: j.tsv\n    gene_field: g\n    output: {mode: join}\n",
    )
    .unwrap_err();
    assert_matches!(err, KiraError::InvalidOutputSpec { .. });
}

#[test]
fn unknown_mode_is_a_parse_error() {
    let err = resolve_yaml(
        "datasets:\n  - name: X\n    path: x.tsv\n    gene_field: g\n    output: {mode: matrix}\n",
    )
    .unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}

#[test]
fn count_field_collision_is_fatal() {
    let err = resolve_yaml(
        "datasets:\n  - {name: A, path: a.tsv, gene_field: g}\n  - name: B\n    path: b.tsv\n    gene_field: g\n    output: {count_field: A_count}\n",
    )
    .unwrap_err();
    assert_matches!(err, KiraError::ColumnCollision { column } if column == "A_count");
}

#[test]
fn missing_config_file() {
    let err = ConfigLoader::resolve(Some("/nonexistent/kira/datasets.json")).unwrap_err();
    assert_matches!(err, KiraError::ConfigRead(_));
}

#[test]
fn shipped_config_resolves() {
    let resolved = ConfigLoader::resolve(Some(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/local_datasets.yml"
    )))
    .unwrap();
    let names: Vec<&str> = resolved.datasets.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["GTEx_Tissue", "ENCODE_Histone", "KEGG", "OMIM"]);
    assert_matches!(&resolved.datasets[1].output, OutputSpec::Cells { pairs, .. } if pairs.len() == 2);
}

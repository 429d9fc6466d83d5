use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::app::{AnnotationReport, ProgressEvent, ProgressSink};
use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(Utf8PathBuf),
}

impl OutputTarget {
    pub fn from_arg(value: Option<&str>) -> Self {
        match value {
            None | Some("-") => OutputTarget::Stdout,
            Some(path) => OutputTarget::File(Utf8PathBuf::from(path)),
        }
    }

    /// Runs `write` against the target. Files are written to a temporary
    /// sibling and renamed into place only after `write` succeeds.
    pub fn write_with<T, F>(&self, write: F) -> Result<T, KiraError>
    where
        F: FnOnce(&mut dyn Write) -> Result<T, KiraError>,
    {
        match self {
            OutputTarget::Stdout => {
                let stdout = io::stdout();
                let mut writer = BufWriter::new(stdout.lock());
                let value = write(&mut writer)?;
                writer
                    .flush()
                    .map_err(|err| KiraError::Filesystem(err.to_string()))?;
                Ok(value)
            }
            OutputTarget::File(path) => write_atomic(path, write),
        }
    }
}

fn write_atomic<T, F>(dest: &Utf8Path, write: F) -> Result<T, KiraError>
where
    F: FnOnce(&mut dyn Write) -> Result<T, KiraError>,
{
    let parent = match dest.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    std::fs::create_dir_all(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".kira-annotate")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(err.to_string()))?;

    let value = {
        let mut writer = BufWriter::new(temp.as_file_mut());
        let value = write(&mut writer)?;
        writer
            .flush()
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        value
    };

    temp.persist(dest.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("write {dest}: {err}")))?;
    Ok(value)
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(result: &AnnotationReport) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stderr = io::stderr();
        stderr.write_all(json.as_bytes())?;
        stderr.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Human-readable summary and progress lines on stderr.
pub struct TextOutput;

impl TextOutput {
    pub fn print_report(result: &AnnotationReport) -> io::Result<()> {
        let mut stderr = io::stderr();
        writeln!(
            stderr,
            "annotated {} rows, {} columns",
            result.rows, result.columns
        )?;
        for dataset in &result.datasets {
            match &dataset.error {
                None => writeln!(
                    stderr,
                    "  {} ({}): {} genes, {} records",
                    dataset.name, dataset.mode, dataset.genes, dataset.records
                )?,
                Some(error) => writeln!(
                    stderr,
                    "  {} ({}): FAILED, empty columns emitted ({error})",
                    dataset.name, dataset.mode
                )?,
            }
        }
        for warning in &result.warnings {
            writeln!(stderr, "warning: {warning}")?;
        }
        Ok(())
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }
}

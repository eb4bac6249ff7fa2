//! Delimited-text table export

use super::{ExportResult, ResultCollection, TabularExporter};
use crate::config::OutputConfig;
use crate::extract::Field;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Byte order mark, so spreadsheet tools detect UTF-8
const UTF8_BOM: &str = "\u{feff}";

/// Writes records as a delimited text file with a header row
#[derive(Debug, Clone)]
pub struct CsvExporter {
    path: PathBuf,
    delimiter: char,
    bom: bool,
}

impl CsvExporter {
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            path: path.into(),
            delimiter,
            bom: false,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.path, config.delimiter).with_bom(config.bom)
    }

    /// Prefixes the file with a UTF-8 byte order mark
    pub fn with_bom(mut self, bom: bool) -> Self {
        self.bom = bom;
        self
    }

    fn write_table<W: Write>(&self, mut w: W, collection: &ResultCollection) -> io::Result<usize> {
        if self.bom {
            write!(w, "{}", UTF8_BOM)?;
        }

        let header: Vec<&str> = Field::ALL.iter().map(Field::column).collect();
        write_row(&mut w, &header, self.delimiter)?;

        for record in collection {
            let row: Vec<&str> = record.values().collect();
            write_row(&mut w, &row, self.delimiter)?;
        }

        w.flush()?;
        Ok(collection.len())
    }
}

impl TabularExporter for CsvExporter {
    fn export(&self, collection: &ResultCollection) -> ExportResult<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        Ok(self.write_table(BufWriter::new(file), collection)?)
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Writes one row, quoting fields that contain the separator, quotes or line breaks
fn write_row<W: Write>(mut w: W, row: &[&str], sep: char) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{}", sep)?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

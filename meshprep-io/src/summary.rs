//! Summary table output
//!
//! One header line followed by one line per processed mesh, comma separated,
//! in processing order.

use meshprep_core::{Result, SummaryRecord};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writer for the batch summary CSV
pub struct SummaryCsvWriter;

impl SummaryCsvWriter {
    /// Write the records to `path`, replacing any existing file.
    pub fn write<P: AsRef<Path>>(records: &[SummaryRecord], path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(records, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the records to any sink
    pub fn write_to<W: Write>(records: &[SummaryRecord], writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", SummaryRecord::COLUMNS.join(","))?;

        for record in records {
            let values = record.values();
            let line: Vec<Cow<str>> = values.iter().map(|v| escape_field(v)).collect();
            writeln!(writer, "{}", line.join(","))?;
        }

        Ok(())
    }
}

/// Convenience wrapper around [`SummaryCsvWriter::write`]
pub fn write_summary_csv<P: AsRef<Path>>(records: &[SummaryRecord], path: P) -> Result<()> {
    SummaryCsvWriter::write(records, path)
}

/// Quote a field when it contains a separator, a quote or a line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

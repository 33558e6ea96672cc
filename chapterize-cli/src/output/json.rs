//! JSON output formatter

use super::ChapterFormatter;
use anyhow::Result;
use chapterize_core::CacheRecord;
use serde::Serialize;
use std::io::Write;

/// One element of the JSON output array
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// Source file path
    pub file: String,
    /// Full discovery record, chapter bodies included
    #[serde(flatten)]
    pub record: CacheRecord,
}

/// JSON formatter - collects reports and emits one array on finish
pub struct JsonFormatter<W: Write> {
    writer: W,
    reports: Vec<FileReport>,
}

impl<W: Write> JsonFormatter<W> {
    /// Create a new JSON formatter
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            reports: Vec::new(),
        }
    }
}

impl<W: Write> ChapterFormatter for JsonFormatter<W> {
    fn write_report(&mut self, source: &str, record: &CacheRecord) -> Result<()> {
        self.reports.push(FileReport {
            file: source.to_string(),
            record: record.clone(),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, &self.reports)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chapterize_core::{Chapter, ReconciliationLog, SplitPlan};

    #[test]
    fn output_is_a_json_array() {
        let record = CacheRecord {
            chapters: vec![Chapter::new(1, "제 1 화".into(), None, "본문".into())],
            plan: SplitPlan::Pattern(r"제\s*\d+\s*화".into()),
            stats: None,
            log: ReconciliationLog::new(),
        };
        let mut buf = Vec::new();
        let mut formatter = JsonFormatter::new(&mut buf);
        formatter.write_report("novel.txt", &record).unwrap();
        formatter.finish().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["file"], "novel.txt");
        assert_eq!(value[0]["chapters"][0]["title"], "제 1 화");
    }
}

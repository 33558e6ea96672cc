//! Text output formatter

use super::ChapterFormatter;
use anyhow::Result;
use chapterize_core::{CacheRecord, SplitPlan};
use std::io::Write;

/// Human-readable summary: one line per chapter plus the escalation record.
pub struct TextFormatter<W: Write> {
    writer: W,
}

impl<W: Write> TextFormatter<W> {
    /// Create a new text formatter
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ChapterFormatter for TextFormatter<W> {
    fn write_report(&mut self, source: &str, record: &CacheRecord) -> Result<()> {
        let plan = match &record.plan {
            SplitPlan::Pattern(p) => format!("pattern {p}"),
            SplitPlan::Boundaries(b) => format!("{} boundaries", b.len()),
        };
        writeln!(
            self.writer,
            "{source}: {} chapters ({plan})",
            record.chapters.len()
        )?;

        for chapter in &record.chapters {
            let subtitle = chapter
                .subtitle
                .as_deref()
                .map(|s| format!(" — {s}"))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "  {:>4}. [{:?}] {}{subtitle} ({} chars)",
                chapter.id, chapter.kind, chapter.title, chapter.length
            )?;
        }

        if !record.log.entries.is_empty() {
            writeln!(self.writer, "  escalation:")?;
            for line in record.log.to_string().lines() {
                writeln!(self.writer, "    {line}")?;
            }
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chapterize_core::{Chapter, ReconciliationLog};

    #[test]
    fn report_lists_chapters() {
        let record = CacheRecord {
            chapters: vec![
                Chapter::new(1, "제 1 화".into(), Some("시작".into()), "본문".into()),
                Chapter::new(2, "외전".into(), None, "본문".into()),
            ],
            plan: SplitPlan::Pattern(r"제\s*\d+\s*화".into()),
            stats: None,
            log: ReconciliationLog::new(),
        };
        let mut buf = Vec::new();
        let mut formatter = TextFormatter::new(&mut buf);
        formatter.write_report("novel.txt", &record).unwrap();
        formatter.finish().unwrap();

        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("novel.txt: 2 chapters"));
        assert!(out.contains("제 1 화 — 시작"));
        assert!(out.contains("[Extra] 외전"));
    }
}

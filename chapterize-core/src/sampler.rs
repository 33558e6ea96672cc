//! Representative sampling of large novel texts
//!
//! Pattern proposals are made from a sample, not the whole file: chunks are
//! taken at evenly spaced offsets and joined with skip markers so the oracle
//! sees material from the entire span, including the head (prologue) and the
//! tail.

/// Marker inserted between non-contiguous sample chunks
pub const SAMPLE_SKIP_MARKER: &str = "\n\n[...SAMPLE_SKIP...]\n\n";

/// Number of chunks taken when resampling a bounded region
const RETRY_SAMPLE_POINTS: usize = 10;

/// Regions smaller than this are returned whole instead of sampled
const WHOLE_REGION_LIMIT: usize = 2 * 1024 * 1024;

/// Extracts evenly spaced samples from in-memory text.
#[derive(Debug, Clone)]
pub struct Sampler {
    chunk_size: usize,
    num_samples: usize,
}

impl Sampler {
    /// Create a sampler taking `num_samples` chunks of `chunk_size` bytes.
    pub fn new(chunk_size: usize, num_samples: usize) -> Self {
        Self {
            chunk_size,
            num_samples: num_samples.max(1),
        }
    }

    /// Sample the whole text at evenly spaced offsets.
    ///
    /// Small texts (below 1.5x the total sample volume) are returned whole.
    /// The first chunk always starts at offset 0 so the prologue is visible.
    pub fn sample(&self, text: &str) -> String {
        let total_sample = self.chunk_size * self.num_samples;
        if text.len() <= total_sample + total_sample / 2 {
            return text.to_string();
        }

        let step = text.len() / self.num_samples;
        let mut chunks = Vec::with_capacity(self.num_samples);
        chunks.push(self.chunk_at(text, 0));

        for i in 1..self.num_samples {
            // Offsets land mid-line; skip to the next line start so the
            // oracle never sees a torn-off line fragment.
            let offset = next_line_start(text, i * step);
            let chunk = self.chunk_at(text, offset);
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
        }

        chunks.join(SAMPLE_SKIP_MARKER)
    }

    /// Sample within `[start, start + len)` (to end of text when `len` is
    /// `None`). Used for adaptive retry at a failure position and for
    /// gap-targeted resampling.
    pub fn sample_from(&self, text: &str, start: usize, len: Option<usize>) -> String {
        if start >= text.len() {
            return String::new();
        }

        let remaining = text.len() - start;
        let range = len.map_or(remaining, |l| l.min(remaining));
        if range == 0 {
            return String::new();
        }

        let begin = next_line_start(text, start);
        let end = snap_boundary(text, (start + range).min(text.len()));
        if begin >= end {
            return String::new();
        }

        if range < WHOLE_REGION_LIMIT {
            return text[begin..end].to_string();
        }

        let step = range / RETRY_SAMPLE_POINTS;
        let mut chunks = vec![self.chunk_at(text, begin)];
        for i in 1..RETRY_SAMPLE_POINTS {
            let offset = next_line_start(text, start + i * step);
            if offset >= end {
                break;
            }
            let chunk = self.chunk_at(text, offset);
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
        }

        chunks.join(SAMPLE_SKIP_MARKER)
    }

    fn chunk_at(&self, text: &str, offset: usize) -> String {
        if offset >= text.len() {
            return String::new();
        }
        let end = snap_boundary(text, (offset + self.chunk_size).min(text.len()));
        text[offset..end].to_string()
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(32 * 1024, 30)
    }
}

/// Byte offset of the first line start at or after `pos`.
fn next_line_start(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let pos = snap_boundary(text, pos);
    match text[pos..].find('\n') {
        Some(nl) => pos + nl + 1,
        None => text.len(),
    }
}

/// Snap `pos` forward to the nearest UTF-8 character boundary.
fn snap_boundary(text: &str, mut pos: usize) -> usize {
    while pos < text.len() && !text.is_char_boundary(pos) {
        pos += 1;
    }
    pos.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_text() -> String {
        let mut text = String::new();
        for i in 0..5000 {
            text.push_str(&format!("{i}화 제목\n본문이 이어집니다. 본문이 이어집니다.\n\n"));
        }
        text
    }

    #[test]
    fn small_text_is_returned_whole() {
        let sampler = Sampler::new(1024, 4);
        let text = "짧은 파일\n내용\n";
        assert_eq!(sampler.sample(text), text);
    }

    #[test]
    fn large_text_gets_skip_markers() {
        let sampler = Sampler::new(512, 8);
        let text = big_text();
        let sample = sampler.sample(&text);
        assert!(sample.contains("[...SAMPLE_SKIP...]"));
        assert!(sample.len() < text.len());
        // The head of the file is always included
        assert!(sample.starts_with("0화 제목"));
    }

    #[test]
    fn chunks_start_on_line_boundaries() {
        let sampler = Sampler::new(256, 6);
        let text = big_text();
        let sample = sampler.sample(&text);
        for chunk in sample.split(SAMPLE_SKIP_MARKER).skip(1) {
            // Every resumed chunk begins at a line start: an episode title
            // or body line, never a split-off fragment of a multibyte char.
            assert!(!chunk.starts_with('\u{FFFD}'));
        }
    }

    #[test]
    fn sample_from_skips_partial_first_line() {
        let sampler = Sampler::new(1024, 4);
        let text = "첫 줄\n둘째 줄\n셋째 줄\n";
        // Offset 1 lands inside the first line; sampling resumes at line 2.
        let sample = sampler.sample_from(text, 1, None);
        assert!(sample.starts_with("둘째 줄"));
    }

    #[test]
    fn sample_from_past_end_is_empty() {
        let sampler = Sampler::default();
        assert_eq!(sampler.sample_from("abc", 10, None), "");
    }

    #[test]
    fn sample_from_respects_length() {
        let sampler = Sampler::new(1024, 4);
        let text = big_text();
        let sample = sampler.sample_from(&text, 0, Some(200));
        assert!(sample.len() <= 220);
    }
}

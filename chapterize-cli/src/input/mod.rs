//! Input file resolution

pub mod glob_resolver;

pub use glob_resolver::resolve_patterns;

use std::path::Path;

/// Expected chapter count implied by the file name.
///
/// Archive dumps conventionally end the name with the episode count
/// ("어떤 소설 1-250.txt", "소설명 300.txt"); the trailing digit run is that
/// count.
pub fn expected_count_from_name(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

//! Property tests for the optimizer, the pattern transforms, and coverage.

use chapterize_core::optimizer::GlobalOptimizer;
use chapterize_core::pattern::{relax_numbers, sanitize, TitlePattern};
use chapterize_core::types::{Candidate, CandidateFeatures};
use chapterize_core::Splitter;
use proptest::prelude::*;

fn text_of(lines: usize) -> String {
    let filler = "본문 ".repeat(20);
    (0..lines)
        .map(|i| format!("{i} {filler}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn novel_with_title_at(title_line: usize, total_lines: usize) -> String {
    let filler = "본문 ".repeat(20);
    (0..total_lines)
        .map(|i| {
            if i == title_line {
                "제 1 화".to_string()
            } else {
                filler.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn candidate(line_num: usize, confidence: f64) -> Candidate {
    Candidate {
        line_num,
        text: format!("후보 {line_num}"),
        confidence,
        features: CandidateFeatures::default(),
        oracle_score: None,
    }
}

proptest! {
    #[test]
    fn optimizer_respects_cardinality_spacing_and_order(
        lines in prop::collection::btree_set(0usize..600, 0..60),
        confidences in prop::collection::vec(0.0f64..1.0, 60),
        expected in 0usize..20,
    ) {
        let text = text_of(600);
        let candidates: Vec<Candidate> = lines
            .iter()
            .zip(confidences.iter())
            .map(|(&l, &c)| candidate(l, c))
            .collect();

        let boundaries = GlobalOptimizer::new()
            .select_boundaries(&text, &candidates, expected, &[]);

        prop_assert!(boundaries.len() <= expected);
        for pair in boundaries.windows(2) {
            prop_assert!(pair[0].byte_pos < pair[1].byte_pos);
            prop_assert!(pair[1].byte_pos - pair[0].byte_pos >= 500);
        }
    }

    #[test]
    fn relaxation_is_idempotent(pattern in "[가-힣a-zA-Z0-9\\\\d\\+\\*\\s]{0,30}") {
        let once = relax_numbers(&pattern);
        prop_assert_eq!(relax_numbers(&once), once);
    }

    #[test]
    fn sanitize_output_always_compiles(proposal in ".{0,40}") {
        if let Some(source) = sanitize(&proposal) {
            prop_assert!(regex::Regex::new(&source).is_ok());
        }
    }

    #[test]
    fn end_marker_exclusion_is_sound(
        n in 1usize..1000,
        keyword_idx in 0usize..4,
    ) {
        let keywords: Vec<String> =
            ["끝", "완", "END", "fin"].iter().map(|s| s.to_string()).collect();
        let pattern = TitlePattern::compile(r"제\s*\d+\s*화", &keywords).unwrap();

        let title = format!("제 {n} 화");
        prop_assert!(pattern.find(&title).is_some());

        let closed = format!("제 {n} 화 {}", keywords[keyword_idx]);
        prop_assert!(pattern.find(&closed).is_none());
    }

    #[test]
    fn coverage_grows_as_the_last_match_nears_eof(
        earlier in 1usize..200,
        offset in 0usize..200,
    ) {
        let later = earlier + offset;
        let total = later + 50;
        let pattern = TitlePattern::compile(r"제\s*\d+\s*화", &[]).unwrap();
        let splitter = Splitter::new();

        let a = splitter.verify(&novel_with_title_at(earlier, total), &pattern);
        let b = splitter.verify(&novel_with_title_at(later, total), &pattern);

        prop_assert!(b.last_match_ratio >= a.last_match_ratio);
        prop_assert!(b.tail_size <= a.tail_size);
    }
}

#[test]
fn coverage_ok_needs_a_match_and_either_criterion() {
    let splitter = Splitter::new();
    let pattern = TitlePattern::compile(r"제\s*\d+\s*화", &[]).unwrap();

    // Zero matches never cover, no matter how short the file is
    let empty = splitter.verify("본문뿐인 짧은 파일", &pattern);
    assert_eq!(empty.match_count, 0);
    assert!(!empty.coverage_ok);

    // Low ratio, tail under the byte limit: the tail criterion carries it
    let mut text = String::from("제 1 화\n");
    text.push_str(&"본문 ".repeat(2_000));
    let small_tail = splitter.verify(&text, &pattern);
    assert!(small_tail.last_match_ratio < 0.99);
    assert!(small_tail.tail_size < 20_000);
    assert!(small_tail.coverage_ok);

    // Low ratio and a tail past the limit: neither criterion holds
    let mut text = String::from("제 1 화\n");
    text.push_str(&"본문 ".repeat(10_000));
    let large_tail = splitter.verify(&text, &pattern);
    assert!(large_tail.last_match_ratio < 0.99);
    assert!(large_tail.tail_size > 20_000);
    assert!(!large_tail.coverage_ok);

    // High ratio covers even with a tail past the byte limit
    let mut text = "본문 ".repeat(400_000);
    text.push_str("\n제 1 화\n");
    text.push_str(&"본문 ".repeat(3_600));
    let high_ratio = splitter.verify(&text, &pattern);
    assert!(high_ratio.last_match_ratio > 0.99);
    assert!(high_ratio.tail_size > 20_000);
    assert!(high_ratio.coverage_ok);
}

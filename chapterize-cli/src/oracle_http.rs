//! HTTP oracle client
//!
//! Blocking client for an Ollama-style generation endpoint. Transport and
//! JSON failures degrade to absence; the engine treats an unreachable oracle
//! exactly like an offline one. A response that arrives but carries no
//! numeric token is a score of [`NEUTRAL_SCORE`] instead: the model answered,
//! it just answered uselessly.

use crate::config::OracleConfig;
use chapterize_core::oracle::{parse_score, ScoreContext, ScoringOracle, NEUTRAL_SCORE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Cap on titles accepted from a single enumeration response
const MAX_ENUMERATED_TITLES: usize = 200;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Scoring oracle backed by a local generation endpoint.
pub struct HttpOracle {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

impl HttpOracle {
    /// Build a client from the oracle configuration.
    pub fn new(cfg: &OracleConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
        }
    }

    fn generate(&self, prompt: &str) -> Option<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = match self.client.post(&self.endpoint).json(&request).send() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "oracle request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "oracle returned an error status");
            return None;
        }
        match response.json::<GenerateResponse>() {
            Ok(body) => {
                debug!(chars = body.response.len(), "oracle response received");
                Some(body.response)
            }
            Err(e) => {
                warn!(error = %e, "oracle response was not valid JSON");
                None
            }
        }
    }
}

impl ScoringOracle for HttpOracle {
    fn score_candidate(&mut self, text: &str, context: &ScoreContext) -> Option<f64> {
        let prompt = format!(
            "The line below comes from a web novel. Judge whether it is a \
             chapter title line (like \"제 3 화\" or \"Chapter 12\") rather \
             than body prose or dialogue.\n\n\
             Lines before:\n{}\n\nLine:\n{}\n\nLines after:\n{}\n\n\
             Answer with a single number between 0 and 1.",
            context.before, text, context.after
        );
        Some(score_response(&self.generate(&prompt)?))
    }

    fn score_topic_change(&mut self, before: &str, after: &str) -> Option<f64> {
        let prompt = format!(
            "Two passages from the same web novel, separated by a paragraph \
             break. Judge whether the second passage starts a new chapter \
             (scene change, time skip, new episode) rather than continuing \
             the first.\n\nFirst passage:\n{before}\n\nSecond passage:\n{after}\n\n\
             Answer with a single number between 0 and 1."
        );
        Some(score_response(&self.generate(&prompt)?))
    }

    fn propose_pattern(&mut self, sample: &str) -> Option<String> {
        let prompt = format!(
            "Below are samples from one long web novel file. Chapter title \
             lines repeat in a fixed format (for example \"제 1 화\", \
             \"12화. 제목\", \"Chapter 3\").\n\n{sample}\n\n\
             Reply with ONE regular expression matching the chapter title \
             lines of this file, and nothing else. Do not use lookahead or \
             lookbehind."
        );
        let response = self.generate(&prompt)?;
        let line = response.lines().map(str::trim).find(|l| !l.is_empty())?;
        Some(line.to_string())
    }

    fn enumerate_titles(&mut self, sample: &str, known: &[String]) -> Vec<String> {
        let examples = if known.is_empty() {
            String::new()
        } else {
            format!(
                "Known title lines from this file:\n{}\n\n",
                known.join("\n")
            )
        };
        let prompt = format!(
            "{examples}Below is a region of a web novel file. List every \
             chapter title line that appears in it, exactly as written, one \
             per line. Reply with title lines only; nothing else.\n\n{sample}"
        );
        let Some(response) = self.generate(&prompt) else {
            return Vec::new();
        };
        response
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(MAX_ENUMERATED_TITLES)
            .map(str::to_string)
            .collect()
    }
}

/// A delivered response always yields a score; no number means neutral.
fn score_response(response: &str) -> f64 {
    match parse_score(response) {
        Some(score) => score,
        None => {
            warn!(chars = response.len(), "oracle response had no score, using neutral");
            NEUTRAL_SCORE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_but_unparsable_response_scores_neutral() {
        assert_eq!(score_response("definitely a chapter title"), NEUTRAL_SCORE);
        assert_eq!(score_response(""), NEUTRAL_SCORE);
        assert_eq!(score_response("0.8"), 0.8);
    }

    #[test]
    fn unreachable_endpoint_is_absence() {
        // Nothing listens on this port; every call degrades to None/empty.
        let cfg = OracleConfig {
            endpoint: "http://127.0.0.1:1/api/generate".to_string(),
            timeout_secs: 1,
            ..OracleConfig::default()
        };
        let mut oracle = HttpOracle::new(&cfg);
        assert!(oracle.propose_pattern("sample").is_none());
        assert!(oracle
            .score_candidate("제 1 화", &ScoreContext::default())
            .is_none());
        assert!(oracle.enumerate_titles("sample", &[]).is_empty());
    }
}

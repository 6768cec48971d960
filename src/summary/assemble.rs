use serde::{Deserialize, Serialize};

use super::rank::RankScore;
use super::segment::Sentence;
use super::SummaryResult;

/// How many sentences go into each part of the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLimits {
    /// Sentences joined into the brief
    pub brief_sentences: usize,
    /// Sentences listed as key points
    pub key_points: usize,
    /// Transcripts with at most this many sentences are returned verbatim
    pub short_transcript_threshold: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            brief_sentences: 3,
            key_points: 5,
            short_transcript_threshold: 5,
        }
    }
}

impl SummaryLimits {
    pub fn is_short(&self, sentence_count: usize) -> bool {
        sentence_count <= self.short_transcript_threshold
    }
}

/// Verbatim summary for transcripts too short to rank
pub fn verbatim(text: &str, sentences: &[Sentence<'_>]) -> SummaryResult {
    SummaryResult {
        brief: text.to_string(),
        key_points: sentences.iter().map(|s| s.text.to_string()).collect(),
    }
}

/// Sentence indices by descending score; equal scores keep transcript order
pub fn ranked_order(scores: &RankScore) -> Vec<usize> {
    let values = scores.as_slice();
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    order
}

/// Build the brief and key points from ranked sentences.
///
/// Short transcripts bypass the scores entirely and come back verbatim.
pub fn assemble(
    text: &str,
    sentences: &[Sentence<'_>],
    scores: &RankScore,
    limits: &SummaryLimits,
) -> SummaryResult {
    if limits.is_short(sentences.len()) {
        return verbatim(text, sentences);
    }

    debug_assert_eq!(sentences.len(), scores.len());

    let ranked: Vec<&str> = ranked_order(scores)
        .into_iter()
        .filter_map(|index| sentences.get(index))
        .map(|sentence| sentence.text)
        .collect();

    SummaryResult {
        brief: ranked
            .iter()
            .take(limits.brief_sentences)
            .copied()
            .collect::<Vec<_>>()
            .join(" "),
        key_points: ranked
            .iter()
            .take(limits.key_points)
            .map(|text| text.to_string())
            .collect(),
    }
}

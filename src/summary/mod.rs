//! Extractive summarisation: sentences are scored by their centrality in a
//! lexical-overlap graph and the most central ones form the summary.

use serde::{Deserialize, Serialize};

pub mod assemble;
pub mod rank;
pub mod segment;
pub mod similarity;
pub mod stopwords;

pub use assemble::{assemble, SummaryLimits};
pub use rank::{rank, RankOptions, RankScore};
pub use segment::{segment, Sentence};
pub use similarity::SimilarityGraph;

/// Brief plus ranked key points, drawn verbatim from the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Top sentences joined with single spaces, in rank order
    pub brief: String,

    /// Top sentences in rank order
    #[serde(rename = "keyPoints")]
    pub key_points: Vec<String>,
}

/// Summariser settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryOptions {
    pub limits: SummaryLimits,
    pub ranking: RankOptions,
}

/// Runs segmentation, graph building, ranking and assembly
#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    options: SummaryOptions,
}

impl Summarizer {
    pub fn new(options: SummaryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SummaryOptions {
        &self.options
    }

    /// Summarise a transcript. Short transcripts skip graph building and ranking.
    pub fn summarize(&self, text: &str) -> SummaryResult {
        let sentences = segment(text);

        if self.options.limits.is_short(sentences.len()) {
            tracing::debug!(
                sentences = sentences.len(),
                "short transcript, returning it verbatim"
            );
            return assemble::verbatim(text, &sentences);
        }

        let graph = SimilarityGraph::build(&sentences);
        let scores = rank(&graph, &self.options.ranking);
        tracing::debug!(
            sentences = sentences.len(),
            iterations = scores.iterations(),
            converged = scores.converged(),
            "ranked sentences"
        );

        assemble(text, &sentences, &scores, &self.options.limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "Solar power is growing fast. \
        Cheap solar panels make solar power affordable. \
        My cousin likes jazz music. \
        Grid batteries store solar power for the night. \
        The weather was nice yesterday. \
        Solar panels and batteries now power whole towns. \
        Pizza tastes good.";

    #[test]
    fn test_short_transcript_is_returned_verbatim() {
        let text = "Cats are mammals. Dogs are mammals too. Cats and dogs are pets.";
        let summary = Summarizer::default().summarize(text);
        assert_eq!(summary.brief, text);
        assert_eq!(
            summary.key_points,
            vec!["Cats are mammals.", "Dogs are mammals too.", "Cats and dogs are pets."]
        );
    }

    #[test]
    fn test_long_transcript_prefers_central_sentences() {
        let summary = Summarizer::default().summarize(ARTICLE);
        assert_eq!(summary.key_points.len(), 5);
        assert!(summary.key_points[0].contains("olar"));
        for off_topic in ["My cousin likes jazz music.", "Pizza tastes good."] {
            assert!(!summary.key_points[..3].contains(&off_topic.to_string()));
        }
    }

    #[test]
    fn test_summary_text_is_verbatim_from_transcript() {
        let summary = Summarizer::default().summarize(ARTICLE);
        for point in &summary.key_points {
            assert!(ARTICLE.contains(point.as_str()));
        }
        let brief_parts = summary.key_points[..3].join(" ");
        assert_eq!(summary.brief, brief_parts);
    }

    #[test]
    fn test_summarize_is_deterministic() {
        let summarizer = Summarizer::default();
        assert_eq!(summarizer.summarize(ARTICLE), summarizer.summarize(ARTICLE));
    }

    #[test]
    fn test_serializes_key_points_in_camel_case() {
        let summary = SummaryResult {
            brief: "b".into(),
            key_points: vec!["k".into()],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["keyPoints"][0], "k");
    }
}

use rayon::prelude::*;
use std::collections::HashSet;

use super::segment::Sentence;
use super::stopwords::is_stop_word;

/// Lower-cased content words of a sentence: runs of alphanumerics with inner
/// apostrophes, stop words removed.
pub fn content_words(sentence: &str) -> HashSet<String> {
    sentence
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|raw| raw.trim_matches(|c| c == '\'' || c == '\u{2019}'))
        .filter(|word| !word.is_empty())
        .map(|word| word.replace('\u{2019}', "'").to_lowercase())
        .filter(|word| !is_stop_word(word))
        .collect()
}

/// Cosine similarity of the binary presence vectors of two word sets over
/// their union vocabulary.
///
/// For 0/1 vectors the dot product is the size of the intersection and each
/// norm is the square root of the set size. An empty set has an all-zero
/// vector and yields exactly 0.0.
pub fn binary_cosine(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let shared = small.iter().filter(|word| large.contains(*word)).count();

    shared as f64 / ((a.len() as f64).sqrt() * (b.len() as f64).sqrt())
}

/// Undirected weighted graph over sentence indices.
///
/// Only the strict upper triangle is stored, so each edge exists once and the
/// diagonal is implicitly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityGraph {
    nodes: usize,
    upper: Vec<f64>,
}

impl SimilarityGraph {
    /// Build the graph for a segmented transcript. Rows are computed in parallel.
    pub fn build(sentences: &[Sentence<'_>]) -> Self {
        let words: Vec<HashSet<String>> = sentences
            .par_iter()
            .map(|sentence| content_words(sentence.text))
            .collect();

        let n = words.len();
        let upper = (0..n)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| binary_cosine(&words[i], &words[j]))
                    .collect::<Vec<f64>>()
            })
            .flatten()
            .collect();

        tracing::debug!(sentences = n, edges = n * n.saturating_sub(1) / 2, "built similarity graph");

        Self { nodes: n, upper }
    }

    /// Graph from an explicit upper-triangle weight list, row-major
    pub fn from_upper_triangle(nodes: usize, upper: Vec<f64>) -> anyhow::Result<Self> {
        let expected = nodes * nodes.saturating_sub(1) / 2;
        if upper.len() != expected {
            anyhow::bail!(
                "Expected {} edge weights for {} nodes, got {}",
                expected,
                nodes,
                upper.len()
            );
        }
        if let Some(bad) = upper.iter().find(|w| !w.is_finite() || **w < 0.0) {
            anyhow::bail!("Edge weights must be finite and non-negative, got {}", bad);
        }

        Ok(Self { nodes, upper })
    }

    pub fn len(&self) -> usize {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    /// Weight of the edge between `i` and `j`; zero on the diagonal
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Less => self.upper[self.offset(i, j)],
            std::cmp::Ordering::Greater => self.upper[self.offset(j, i)],
        }
    }

    /// Sum of weights of all edges incident to `i`
    pub fn strength(&self, i: usize) -> f64 {
        (0..self.nodes).map(|j| self.weight(i, j)).sum()
    }

    // Row i of the upper triangle starts after rows 0..i, which hold
    // (n-1) + (n-2) + ... + (n-i) entries.
    fn offset(&self, i: usize, j: usize) -> usize {
        i * (2 * self.nodes - i - 1) / 2 + (j - i - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::segment::segment;

    #[test]
    fn test_content_words_filters_stop_words() {
        let words = content_words("The cats are NOT sleeping, they're hunting!");
        let mut sorted: Vec<&str> = words.iter().map(String::as_str).collect();
        sorted.sort();
        assert_eq!(sorted, vec!["cats", "hunting", "sleeping", "they're"]);
    }

    #[test]
    fn test_disjoint_sentences_have_zero_similarity() {
        let sentences = segment("Cats chase mice. Rockets reach orbit.");
        let graph = SimilarityGraph::build(&sentences);
        assert_eq!(graph.weight(0, 1), 0.0);
        assert_eq!(graph.weight(1, 0), 0.0);
    }

    #[test]
    fn test_stop_word_only_sentence_has_zero_similarity() {
        let a = content_words("It is what it is.");
        let b = content_words("Cats are mammals.");
        assert!(a.is_empty());
        assert_eq!(binary_cosine(&a, &b), 0.0);
        assert_eq!(binary_cosine(&a, &a), 0.0);
    }

    #[test]
    fn test_binary_cosine_value() {
        // {cats, mammals} vs {dogs, mammals}: 1 / (sqrt2 * sqrt2)
        let a = content_words("Cats are mammals.");
        let b = content_words("Dogs are mammals too.");
        assert!((binary_cosine(&a, &b) - 0.5).abs() < 1e-12);
        // Repeated words count once
        let c = content_words("Mammals mammals cats.");
        assert!((binary_cosine(&a, &c) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_graph_is_symmetric_with_zero_diagonal() {
        let sentences = segment(
            "Solar panels convert sunlight. Sunlight powers panels daily. \
             Batteries store power. Panels and batteries form systems. Rain falls.",
        );
        let graph = SimilarityGraph::build(&sentences);
        assert_eq!(graph.len(), 5);
        for i in 0..graph.len() {
            assert_eq!(graph.weight(i, i), 0.0);
            for j in 0..graph.len() {
                assert_eq!(graph.weight(i, j), graph.weight(j, i));
                assert!(graph.weight(i, j) >= 0.0 && graph.weight(i, j) <= 1.0 + 1e-12);
            }
        }
        assert!(graph.weight(0, 1) > 0.0);
        assert_eq!(graph.strength(4), 0.0);
    }

    #[test]
    fn test_upper_triangle_indexing() {
        let graph =
            SimilarityGraph::from_upper_triangle(4, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        assert_eq!(graph.weight(0, 1), 0.1);
        assert_eq!(graph.weight(0, 3), 0.3);
        assert_eq!(graph.weight(1, 2), 0.4);
        assert_eq!(graph.weight(3, 1), 0.5);
        assert_eq!(graph.weight(2, 3), 0.6);
        assert!(SimilarityGraph::from_upper_triangle(3, vec![0.1]).is_err());
        assert!(SimilarityGraph::from_upper_triangle(2, vec![-1.0]).is_err());
    }

    #[test]
    fn test_empty_graph() {
        let graph = SimilarityGraph::build(&[]);
        assert!(graph.is_empty());
    }
}

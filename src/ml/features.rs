use crate::error::{AppError, Result};
use crate::ml::models::FeatureConfig;
use ndarray::Array1;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVec};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Tokens are runs of two or more word characters.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is a valid regex"));

/// TF-IDF vectorizer over word n-grams
///
/// Produces L2-normalised sparse rows. The vocabulary keeps the
/// `max_features` most frequent terms of the fitted corpus and is indexed
/// in alphabetical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Configuration
    config: FeatureConfig,

    /// Vocabulary mapping (term -> column)
    vocabulary: HashMap<String, usize>,

    /// Smoothed inverse document frequency per column
    idf: Array1<f64>,

    /// Is fitted (vocabulary built)
    is_fitted: bool,
}

impl TfidfVectorizer {
    /// Create a new, unfitted vectorizer
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            vocabulary: HashMap::new(),
            idf: Array1::zeros(0),
            is_fitted: false,
        }
    }

    /// Learn the vocabulary and IDF weights from a corpus
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        if documents.is_empty() {
            return Err(AppError::Training(
                "cannot fit vectorizer on an empty corpus".to_string(),
            ));
        }

        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let terms = self.analyze(document.as_ref());
            let unique: HashSet<&String> = terms.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *term_freq.entry(term).or_insert(0) += 1;
            }
        }

        if term_freq.is_empty() {
            return Err(AppError::Training(
                "empty vocabulary: documents contain no tokens".to_string(),
            ));
        }

        // Most frequent first, alphabetical among equals
        let mut ranked: Vec<(String, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.config.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        self.idf = terms
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term, idx))
            .collect();

        self.is_fitted = true;

        tracing::debug!(
            vocabulary = self.vocabulary.len(),
            documents = documents.len(),
            "Vectorizer fitted"
        );

        Ok(())
    }

    /// Transform a batch of documents into a CSR matrix (one row per document)
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<CsMat<f64>> {
        self.ensure_fitted()?;

        let mut indptr = Vec::with_capacity(documents.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);

        for document in documents {
            for (column, value) in self.weights(document.as_ref()) {
                indices.push(column);
                data.push(value);
            }
            indptr.push(indices.len());
        }

        Ok(CsMat::new(
            (documents.len(), self.n_features()),
            indptr,
            indices,
            data,
        ))
    }

    /// Transform a single document into a sparse vector
    pub fn transform_one(&self, text: &str) -> Result<CsVec<f64>> {
        self.ensure_fitted()?;

        let (indices, data): (Vec<usize>, Vec<f64>) = self.weights(text).into_iter().unzip();
        Ok(CsVec::new(self.n_features(), indices, data))
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<CsMat<f64>> {
        self.fit(documents)?;
        self.transform(documents)
    }

    /// Lowercase, tokenize and expand into the configured n-grams
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_PATTERN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let (min_n, max_n) = self.config.ngram_range;
        let mut terms = Vec::new();

        for n in min_n.max(1)..=max_n {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }

        terms
    }

    /// Number of feature columns
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Column index of a term, if it made it into the vocabulary
    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Check if the vocabulary has been built
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Check that every vocabulary column has an IDF weight
    pub fn validate(&self) -> Result<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(AppError::Artifact(format!(
                "vectorizer has {} IDF weights for {} vocabulary terms",
                self.idf.len(),
                self.vocabulary.len()
            )));
        }
        if let Some((term, column)) = self
            .vocabulary
            .iter()
            .find(|(_, &column)| column >= self.idf.len())
        {
            return Err(AppError::Artifact(format!(
                "vocabulary term '{}' maps to column {} outside {} features",
                term,
                column,
                self.idf.len()
            )));
        }
        Ok(())
    }

    /// Sorted (column, weight) pairs of the normalised TF-IDF row
    fn weights(&self, text: &str) -> Vec<(usize, f64)> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyze(text) {
            if let Some(&column) = self.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut row: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(column, tf)| (column, tf * self.idf[column]))
            .collect();

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in row.iter_mut() {
                *value /= norm;
            }
        }

        row
    }

    fn ensure_fitted(&self) -> Result<()> {
        if !self.is_fitted {
            return Err(AppError::Inference(
                "TfidfVectorizer must be fitted before transform".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "I feel anxious about the exam",
            "The exam went well and I feel great",
            "Feeling anxious and tired all day",
        ]
    }

    #[test]
    fn test_analyze_unigrams_and_bigrams() {
        let vectorizer = TfidfVectorizer::new(FeatureConfig::default());
        let terms = vectorizer.analyze("I feel VERY tired");

        // single-character tokens are dropped
        assert!(!terms.contains(&"i".to_string()));
        assert!(terms.contains(&"feel".to_string()));
        assert!(terms.contains(&"very tired".to_string()));
        assert!(terms.contains(&"feel very".to_string()));
        assert_eq!(terms.len(), 3 + 2);
    }

    #[test]
    fn test_transform_requires_fit() {
        let vectorizer = TfidfVectorizer::new(FeatureConfig::default());
        assert!(!vectorizer.is_fitted());
        assert!(vectorizer.transform(&["hello world"]).is_err());
        assert!(vectorizer.transform_one("hello world").is_err());
    }

    #[test]
    fn test_fit_builds_alphabetical_vocabulary() {
        let mut vectorizer = TfidfVectorizer::new(FeatureConfig::default());
        vectorizer.fit(&corpus()).unwrap();

        assert!(vectorizer.is_fitted());
        let about = vectorizer.column_of("about").unwrap();
        let went = vectorizer.column_of("went").unwrap();
        assert!(about < went);
        assert!(vectorizer.column_of("feel great").is_some());
    }

    #[test]
    fn test_max_features_keeps_most_frequent_terms() {
        let config = FeatureConfig {
            max_features: 2,
            ngram_range: (1, 1),
        };
        let mut vectorizer = TfidfVectorizer::new(config);
        vectorizer
            .fit(&["alpha beta", "alpha gamma", "alpha beta delta"])
            .unwrap();

        assert_eq!(vectorizer.n_features(), 2);
        assert!(vectorizer.column_of("alpha").is_some());
        assert!(vectorizer.column_of("beta").is_some());
        assert!(vectorizer.column_of("gamma").is_none());
    }

    #[test]
    fn test_rows_are_l2_normalised() {
        let mut vectorizer = TfidfVectorizer::new(FeatureConfig::default());
        let matrix = vectorizer.fit_transform(&corpus()).unwrap();

        assert_eq!(matrix.rows(), 3);
        for row in matrix.outer_iterator() {
            let norm: f64 = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unknown_terms_give_empty_vector() {
        let mut vectorizer = TfidfVectorizer::new(FeatureConfig::default());
        vectorizer.fit(&corpus()).unwrap();

        let vector = vectorizer.transform_one("zebra xylophone").unwrap();
        assert_eq!(vector.dim(), vectorizer.n_features());
        assert_eq!(vector.nnz(), 0);
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let mut vectorizer = TfidfVectorizer::new(FeatureConfig {
            max_features: 100,
            ngram_range: (1, 1),
        });
        vectorizer.fit(&["common rare", "common", "common"]).unwrap();

        let vector = vectorizer.transform_one("common rare").unwrap();
        let common = vectorizer.column_of("common").unwrap();
        let rare = vectorizer.column_of("rare").unwrap();
        let weight = |column: usize| {
            vector
                .iter()
                .find(|(idx, _)| *idx == column)
                .map(|(_, v)| *v)
                .unwrap()
        };
        assert!(weight(rare) > weight(common));
    }

    #[test]
    fn test_validate_catches_inconsistent_state() {
        let mut vectorizer = TfidfVectorizer::new(FeatureConfig::default());
        vectorizer.fit(&corpus()).unwrap();
        assert!(vectorizer.validate().is_ok());

        let mut short_idf = vectorizer.clone();
        short_idf.idf = Array1::ones(vectorizer.n_features() - 1);
        assert!(matches!(short_idf.validate(), Err(AppError::Artifact(_))));

        let mut stray_column = vectorizer.clone();
        stray_column
            .vocabulary
            .insert("exam".to_string(), vectorizer.n_features() + 5);
        assert!(matches!(stray_column.validate(), Err(AppError::Artifact(_))));
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let mut vectorizer = TfidfVectorizer::new(FeatureConfig::default());
        let empty: Vec<&str> = vec![];
        assert!(vectorizer.fit(&empty).is_err());
        assert!(vectorizer.fit(&["a b c"]).is_err());
    }
}

//! Review sentiment scoring over the VADER lexicon.
//!
//! The lexicon is process-wide read-only state behind a [`OnceLock`],
//! loaded at most once via [`ensure_loaded`]. [`SentimentScorer::new`]
//! forces the load, so a scorer handed to any fan-out later never races
//! on initialization. Scoring is pure: identical text, identical score.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::reviews::ReviewBundle;

static ANALYZER: OnceLock<SentimentIntensityAnalyzer<'static>> = OnceLock::new();

/// Initializes the shared VADER analyzer if it has not been built yet and
/// returns it. Safe to call repeatedly.
pub fn ensure_loaded() -> &'static SentimentIntensityAnalyzer<'static> {
    ANALYZER.get_or_init(|| {
        debug!("loading VADER sentiment lexicon");
        SentimentIntensityAnalyzer::new()
    })
}

/// Polarity of one text blob. `neg`/`neu`/`pos` partition the probability
/// mass; `compound` is an independent normalized aggregate in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

/// A review bundle with its polarity attached; one row of the scored
/// reviews CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredReview {
    pub yelp_id: String,
    pub review_text: String,
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

/// Sentiment scoring service. Construction forces the lexicon load.
pub struct SentimentScorer {
    analyzer: &'static SentimentIntensityAnalyzer<'static>,
}

impl SentimentScorer {
    pub fn new() -> Self {
        Self {
            analyzer: ensure_loaded(),
        }
    }

    /// Scores one text blob. Tolerates arbitrary Unicode including the
    /// empty string.
    pub fn score(&self, text: &str) -> SentimentScore {
        let scores = self.analyzer.polarity_scores(text);
        SentimentScore {
            neg: scores.get("neg").copied().unwrap_or(0.0),
            neu: scores.get("neu").copied().unwrap_or(0.0),
            pos: scores.get("pos").copied().unwrap_or(0.0),
            compound: scores.get("compound").copied().unwrap_or(0.0),
        }
    }

    /// Scores every bundle, producing the scored-reviews rows in input
    /// order.
    pub fn score_bundles(&self, bundles: &[ReviewBundle]) -> Vec<ScoredReview> {
        bundles
            .iter()
            .map(|b| {
                let s = self.score(&b.review_text);
                ScoredReview {
                    yelp_id: b.yelp_id.clone(),
                    review_text: b.review_text.clone(),
                    neg: s.neg,
                    neu: s.neu,
                    pos: s.pos,
                    compound: s.compound,
                }
            })
            .collect()
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

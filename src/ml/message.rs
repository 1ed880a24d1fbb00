use serde::{Deserialize, Serialize};
use std::fmt;

/// Canned explanation attached to every prediction.
///
/// Buckets are chosen from the predicted label and the raw success
/// probability, never from the rounded percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredictionMessage {
    HighSuccess,
    GoodPotential,
    ModeratePotential,
    HighRisk,
    LowProbability,
    UncertainOutcome,
}

impl PredictionMessage {
    /// Bucket for a label and a success probability in `[0, 1]`
    pub fn select(label: usize, probability: f64) -> Self {
        if label == 1 {
            if probability >= 0.8 {
                PredictionMessage::HighSuccess
            } else if probability >= 0.6 {
                PredictionMessage::GoodPotential
            } else {
                PredictionMessage::ModeratePotential
            }
        } else if probability <= 0.2 {
            PredictionMessage::HighRisk
        } else if probability <= 0.4 {
            PredictionMessage::LowProbability
        } else {
            PredictionMessage::UncertainOutcome
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            PredictionMessage::HighSuccess => {
                "Strong indicators suggest this app will be highly successful! 🚀"
            }
            PredictionMessage::GoodPotential => {
                "Good potential for success based on similar apps. ✅"
            }
            PredictionMessage::ModeratePotential => {
                "Moderate success potential. Consider optimizing features. 📊"
            }
            PredictionMessage::HighRisk => {
                "High risk of underperformance. Significant changes recommended. ⚠️"
            }
            PredictionMessage::LowProbability => {
                "Low success probability. Review your app strategy. 📉"
            }
            PredictionMessage::UncertainOutcome => {
                "Uncertain outcome. Consider market research. 🤔"
            }
        }
    }
}

impl fmt::Display for PredictionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

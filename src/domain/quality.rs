use serde::Serialize;

/// How many historical years backed a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    VeryLow,
    Low,
    Medium,
    High,
}

/// Share of the possible samples that actually fed one parameter's daily figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    VeryLow,
    Low,
    Medium,
    High,
}

impl Reliability {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[must_use]
pub fn evaluate_reliability(years_used: usize) -> Reliability {
    if years_used >= 15 {
        Reliability::High
    } else if years_used >= 10 {
        Reliability::Medium
    } else if years_used >= 5 {
        Reliability::Low
    } else {
        Reliability::VeryLow
    }
}

/// A zero denominator means nothing could have been sampled, which is the lowest label.
#[must_use]
pub fn evaluate_confidence(samples_used: usize, total_possible: usize) -> Confidence {
    if total_possible == 0 {
        return Confidence::VeryLow;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = samples_used as f64 / total_possible as f64;

    if ratio >= 0.9 {
        Confidence::High
    } else if ratio >= 0.7 {
        Confidence::Medium
    } else if ratio >= 0.5 {
        Confidence::Low
    } else {
        Confidence::VeryLow
    }
}

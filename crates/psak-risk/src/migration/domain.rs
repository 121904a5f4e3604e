use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Regulatory collectibility code (kolektibilitas) used as migration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CollectibilityState {
    #[serde(rename = "1")]
    Current,
    #[serde(rename = "2")]
    SpecialMention,
    #[serde(rename = "3")]
    Substandard,
    #[serde(rename = "4")]
    Doubtful,
    #[serde(rename = "5")]
    Loss,
}

impl CollectibilityState {
    pub const COUNT: usize = 5;

    pub const fn ordered() -> [Self; 5] {
        [
            Self::Current,
            Self::SpecialMention,
            Self::Substandard,
            Self::Doubtful,
            Self::Loss,
        ]
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Current => 0,
            Self::SpecialMention => 1,
            Self::Substandard => 2,
            Self::Doubtful => 3,
            Self::Loss => 4,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Current => "1",
            Self::SpecialMention => "2",
            Self::Substandard => "3",
            Self::Doubtful => "4",
            Self::Loss => "5",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "Lancar",
            Self::SpecialMention => "Dalam Perhatian Khusus",
            Self::Substandard => "Kurang Lancar",
            Self::Doubtful => "Diragukan",
            Self::Loss => "Macet",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|state| state.code() == code.trim())
    }
}

impl fmt::Display for CollectibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Observation window a matrix describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixPeriod {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl MatrixPeriod {
    pub fn new(period_start: NaiveDate, period_end: NaiveDate) -> Self {
        Self {
            period_start,
            period_end,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.period_start <= self.period_end
    }
}

impl fmt::Display for MatrixPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.period_start, self.period_end)
    }
}

/// One cell of a migration matrix as entered by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationMatrixEntry {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub from_state: CollectibilityState,
    pub to_state: CollectibilityState,
    pub probability: f64,
}

impl MigrationMatrixEntry {
    pub fn period(&self) -> MatrixPeriod {
        MatrixPeriod::new(self.period_start, self.period_end)
    }

    pub fn belongs_to(&self, period: &MatrixPeriod) -> bool {
        self.period_start == period.period_start && self.period_end == period.period_end
    }
}

/// Historical movement of one facility between collectibility codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionObservation {
    pub facility_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub from_state: CollectibilityState,
    pub to_state: CollectibilityState,
}

impl TransitionObservation {
    pub fn belongs_to(&self, period: &MatrixPeriod) -> bool {
        self.period_start == period.period_start && self.period_end == period.period_end
    }
}

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{CollectibilityState, TransitionObservation};

#[derive(Debug)]
pub enum ObservationImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidState { row: usize, value: String },
    InvalidDate { row: usize, value: String },
}

impl std::fmt::Display for ObservationImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservationImportError::Io(err) => {
                write!(f, "failed to read transition history: {}", err)
            }
            ObservationImportError::Csv(err) => {
                write!(f, "invalid transition history CSV: {}", err)
            }
            ObservationImportError::InvalidState { row, value } => write!(
                f,
                "row {}: collectibility code '{}' must be between 1 and 5",
                row, value
            ),
            ObservationImportError::InvalidDate { row, value } => {
                write!(f, "row {}: '{}' is not a YYYY-MM-DD date", row, value)
            }
        }
    }
}

impl std::error::Error for ObservationImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ObservationImportError::Io(err) => Some(err),
            ObservationImportError::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ObservationImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ObservationImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationRow {
    facility_id: String,
    period_start: String,
    period_end: String,
    from_state: String,
    to_state: String,
}

/// Read `facility_id,period_start,period_end,from_state,to_state` rows.
pub fn parse_observations<R: Read>(
    reader: R,
) -> Result<Vec<TransitionObservation>, ObservationImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut observations = Vec::new();

    for (index, record) in csv_reader.deserialize::<ObservationRow>().enumerate() {
        let row = record?;
        // header is line 1
        let line = index + 2;

        observations.push(TransitionObservation {
            facility_id: row.facility_id,
            period_start: parse_date(line, &row.period_start)?,
            period_end: parse_date(line, &row.period_end)?,
            from_state: parse_state(line, &row.from_state)?,
            to_state: parse_state(line, &row.to_state)?,
        });
    }

    Ok(observations)
}

pub fn observations_from_path<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<TransitionObservation>, ObservationImportError> {
    let file = std::fs::File::open(path)?;
    parse_observations(file)
}

fn parse_date(row: usize, value: &str) -> Result<NaiveDate, ObservationImportError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ObservationImportError::InvalidDate {
            row,
            value: value.to_string(),
        }
    })
}

fn parse_state(row: usize, value: &str) -> Result<CollectibilityState, ObservationImportError> {
    CollectibilityState::from_code(value).ok_or_else(|| ObservationImportError::InvalidState {
        row,
        value: value.to_string(),
    })
}

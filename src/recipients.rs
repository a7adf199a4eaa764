use std::collections::HashMap;
use std::io::Read;

use crate::domain::RecipientEmail;
use crate::template::ValueSource;

/// Column every dataset must carry.
pub const EMAIL_COLUMN: &str = "Email";

#[derive(thiserror::Error, Debug)]
#[error("The recipients dataset could not be read.")]
pub struct FormatError(#[from] csv::Error);

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("The recipients dataset must contain an \"Email\" column.")]
pub struct MissingColumnError;

/// One input record, keyed by column name.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RecipientRow {
    /// 1-based position among the data records, header excluded.
    pub row_number: usize,
    pub values: HashMap<String, String>,
}

impl RecipientRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

impl ValueSource for RecipientRow {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

/// A tabular dataset with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<RecipientRow>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<HashMap<String, String>>) -> Self {
        let rows = records
            .into_iter()
            .enumerate()
            .map(|(i, values)| RecipientRow {
                row_number: i + 1,
                values,
            })
            .collect();
        Self { columns, rows }
    }

    /// Reads a CSV document whose first record is the header.
    ///
    /// Short records are accepted, the columns they lack are simply absent
    /// from the row. Extra trailing fields are ignored.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, FormatError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            let values = columns
                .iter()
                .zip(record.iter())
                .map(|(column, value)| (column.clone(), value.to_owned()))
                .collect();
            records.push(values);
        }

        Ok(Self::new(columns, records))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RecipientRow] {
        &self.rows
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    InvalidEmail,
    /// Required placeholder absent from the row or blank.
    MissingField(String),
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::InvalidEmail => write!(f, "{} (Invalid)", EMAIL_COLUMN),
            RejectionReason::MissingField(name) => f.write_str(name),
        }
    }
}

impl serde::Serialize for RejectionReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A row that passed validation, with its address already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecipient {
    pub email: RecipientEmail,
    pub row: RecipientRow,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct InvalidRecipient {
    pub row: RecipientRow,
    pub reasons: Vec<RejectionReason>,
}

/// Dataset split into sendable and rejected rows, both in dataset order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub valid: Vec<ValidRecipient>,
    pub invalid: Vec<InvalidRecipient>,
}

impl ValidationReport {
    /// `false` when no row can be sent to; a run must not start then.
    pub fn is_sendable(&self) -> bool {
        !self.valid.is_empty()
    }
}

fn rejection_reasons(row: &RecipientRow, required: &[String]) -> Vec<RejectionReason> {
    let mut reasons = Vec::new();

    let has_valid_email = row
        .get(EMAIL_COLUMN)
        .map(RecipientEmail::is_valid)
        .unwrap_or(false);
    if !has_valid_email {
        reasons.push(RejectionReason::InvalidEmail);
    }

    for name in required {
        let is_blank = row
            .get(name)
            .map(|value| value.trim().is_empty())
            .unwrap_or(true);
        if is_blank {
            reasons.push(RejectionReason::MissingField(name.clone()));
        }
    }

    reasons
}

/// Splits `dataset` into rows that can be sent to and rows that cannot.
///
/// A row is rejected when its `Email` does not look like an address or when
/// any of the `required` placeholder names is missing or blank in it.
#[tracing::instrument(
    name = "Validate recipients",
    skip(dataset, required),
    fields(rows = dataset.len(), required = required.len())
)]
pub fn validate_recipients(
    dataset: &Dataset,
    required: &[String],
) -> Result<ValidationReport, MissingColumnError> {
    if !dataset.has_column(EMAIL_COLUMN) {
        return Err(MissingColumnError);
    }

    let mut report = ValidationReport::default();
    for row in dataset.rows() {
        let reasons = rejection_reasons(row, required);
        let email = row
            .get(EMAIL_COLUMN)
            .filter(|_| reasons.is_empty())
            .map(|e| RecipientEmail::parse(e.to_owned()));

        match email {
            Some(Ok(email)) => report.valid.push(ValidRecipient {
                email,
                row: row.clone(),
            }),
            _ => report.invalid.push(InvalidRecipient {
                row: row.clone(),
                reasons,
            }),
        }
    }

    tracing::info!(
        valid = report.valid.len(),
        invalid = report.invalid.len(),
        "Recipients validated"
    );
    Ok(report)
}

use thiserror::Error;

use funneldash_core::FailureReason;

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("CSV input is empty")]
    Empty,

    #[error("no valid records in CSV ({rows_read} data rows read)")]
    NoValidRecords { rows_read: usize },

    #[error("malformed CSV: {0}")]
    Malformed(#[from] csv::Error),
}

impl CsvImportError {
    #[must_use]
    pub fn reason(&self) -> FailureReason {
        match self {
            CsvImportError::Empty => FailureReason::EmptyCsv,
            CsvImportError::NoValidRecords { .. } => FailureReason::NoValidRecords,
            CsvImportError::Malformed(_) => FailureReason::MalformedCsv,
        }
    }

    /// Message shown to dashboard users.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            CsvImportError::Empty => "CSV vazio ou formato inválido".to_string(),
            CsvImportError::NoValidRecords { .. } => {
                "Nenhum registro válido encontrado no CSV".to_string()
            }
            CsvImportError::Malformed(e) => format!("Erro ao processar CSV: {e}"),
        }
    }
}

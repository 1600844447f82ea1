use thiserror::Error;

/// Fatal data-contract failures raised by the rating engine and the pregame assembler.
///
/// Data-quality gaps (cold starts, unimputable weather buckets, missing QB priors) are
/// never errors; they surface as nulls plus companion flags.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("table `{table}` is missing required column `{column}`")]
    MissingColumn { table: String, column: String },

    #[error("mandatory feature family `{family}` has no rows")]
    MissingTable { family: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("column `{column}` in table `{table}`: {detail}")]
    Schema {
        table: String,
        column: String,
        detail: String,
    },

    #[error("postcondition violated: {0}")]
    Postcondition(String),
}

impl PipelineError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        PipelineError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

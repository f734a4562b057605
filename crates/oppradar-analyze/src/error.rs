use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no API key configured for {0}")]
    MissingApiKey(&'static str),

    #[error("provider returned an empty completion")]
    EmptyCompletion,

    #[error("could not parse model response: {0}")]
    Parse(String),

    #[error(transparent)]
    Db(#[from] oppradar_db::DbError),
}

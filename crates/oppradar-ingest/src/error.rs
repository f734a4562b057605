use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("feed error: {0}")]
    Feed(String),

    #[error("unknown story kind: {0}")]
    UnknownStoryKind(String),

    #[error(transparent)]
    Db(#[from] oppradar_db::DbError),
}

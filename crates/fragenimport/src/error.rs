#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Generic {0}")]
    Generic(String),

    #[error("Source PDF not found: {0}")]
    SourceNotFound(String),

    #[error("Dataset is invalid: {0}")]
    InvalidDataset(String),
}

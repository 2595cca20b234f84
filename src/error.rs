use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a plotting run.
/// Row-level problems never show up here, they are skipped during ingestion.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be opened or read.
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input could not be decoded as csv.
    #[error("could not parse csv {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("No valid (elapsed_ms, m_dist) pairs found in CSV.")]
    EmptyDataset,

    /// plotters reports drawing errors through backend-specific types,
    /// only their message is kept.
    #[error("could not draw the chart: {0}")]
    Render(String),

    #[error("could not write the png {path}: {source}")]
    Png {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("could not open {path} in the image viewer: {source}")]
    Viewer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to create latency histogram: {source}")]
    CreateHistogram {
        #[source]
        source: hdrhistogram::CreationError,
    },
    #[error("Failed to write {format} export to '{path}': {source}")]
    Export {
        format: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

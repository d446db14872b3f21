use std::io;
use std::path::Path;

use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::MetricsError;
use crate::metrics::Report;

/// Writes one `elapsed_ms,latency_us,success` row per retained sample.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub async fn export_csv(path: &Path, report: &Report) -> Result<(), MetricsError> {
    write_csv(path, report).await.map_err(|source| MetricsError::Export {
        format: "csv",
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the whole report, samples included, as pretty JSON.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub async fn export_json(path: &Path, report: &Report) -> Result<(), MetricsError> {
    write_json(path, report).await.map_err(|source| MetricsError::Export {
        format: "json",
        path: path.to_path_buf(),
        source,
    })
}

async fn write_csv(path: &Path, report: &Report) -> Result<(), io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(b"elapsed_ms,latency_us,success\n").await?;
    for sample in &report.samples {
        let line = format!(
            "{},{},{}\n",
            sample.elapsed_ms,
            sample.latency_us,
            u8::from(sample.success)
        );
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}

async fn write_json(path: &Path, report: &Report) -> Result<(), io::Error> {
    let json = serde_json::to_vec_pretty(report).map_err(io::Error::other)?;
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await?;
    writer.flush().await?;
    Ok(())
}

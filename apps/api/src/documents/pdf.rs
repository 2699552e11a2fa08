//! HTML → PDF conversion behind a trait, so the builder can fall back to HTML and tests
//! can run without a renderer installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::files::{parent_dir, persist_temp};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF rendering is disabled")]
    Disabled,

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Renderer produced an empty file")]
    EmptyOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot store rendered PDF: {0}")]
    Persist(String),
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Converts `html` into a PDF written at `output`. Never leaves a partial file there.
    async fn render(&self, html: &str, output: &Path) -> Result<(), RenderError>;

    fn name(&self) -> &'static str;
}

/// Always fails, which sends every document down the HTML fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRenderer;

#[async_trait]
impl PdfRenderer for DisabledRenderer {
    async fn render(&self, _html: &str, _output: &Path) -> Result<(), RenderError> {
        Err(RenderError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Runs the `wkhtmltopdf` binary: A4, 0.75in margins, UTF-8, no outline.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    program: PathBuf,
}

impl WkhtmltopdfRenderer {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    fn args(input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = [
            "--quiet",
            "--page-size",
            "A4",
            "--margin-top",
            "0.75in",
            "--margin-right",
            "0.75in",
            "--margin-bottom",
            "0.75in",
            "--margin-left",
            "0.75in",
            "--encoding",
            "UTF-8",
            "--no-outline",
        ]
        .iter()
        .map(Into::into)
        .collect();
        args.push(input.into());
        args.push(output.into());
        args
    }
}

#[async_trait]
impl PdfRenderer for WkhtmltopdfRenderer {
    async fn render(&self, html: &str, output: &Path) -> Result<(), RenderError> {
        let dir = parent_dir(output);
        tokio::fs::create_dir_all(&dir).await?;

        let input = tempfile::Builder::new()
            .prefix(".render_")
            .suffix(".html")
            .tempfile_in(&dir)?;
        tokio::fs::write(input.path(), html).await?;
        let pdf = tempfile::Builder::new()
            .prefix(".render_")
            .suffix(".pdf")
            .tempfile_in(&dir)?;

        let program = self.program.display().to_string();
        debug!("Running {program} for {}", output.display());
        let result = Command::new(&self.program)
            .args(Self::args(input.path(), pdf.path()))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(RenderError::Failed {
                program,
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if tokio::fs::metadata(pdf.path()).await?.len() == 0 {
            return Err(RenderError::EmptyOutput);
        }

        persist_temp(pdf, output)
            .await
            .map_err(|e| RenderError::Persist(format!("{e:#}")))
    }

    fn name(&self) -> &'static str {
        "wkhtmltopdf"
    }
}

//! Compile endpoints

use mqlc_core::domain::job::artifact_file_name;
use mqlc_core::domain::result::Fidelity;
use mqlc_core::dto::compile::{BatchReport, FIDELITY_HEADER};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::{debug, warn};

use crate::CompilerClient;
use crate::error::{ClientError, Result};

/// An artifact returned by `POST /compile`
#[derive(Debug, Clone)]
pub struct CompiledFile {
    /// Name suggested by the server (`<stem>.ex5`)
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// `Fallback` when the bytes are the relabelled source, not real compiler output
    pub fidelity: Fidelity,
}

impl CompilerClient {
    /// Upload one source file and return the compiled artifact
    ///
    /// # Example
    /// ```no_run
    /// # use mqlc_client::CompilerClient;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = CompilerClient::new("http://localhost:3000");
    /// let compiled = client.compile_file("expert.mq5").await?;
    /// assert!(compiled.file_name.ends_with(".ex5"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledFile> {
        let path = path.as_ref();
        let (name, part) = file_part(path).await?;

        debug!("Uploading {} for compilation", name);

        let form = Form::new().part("mq5file", part);
        let response = self
            .client
            .post(self.url("/compile"))
            .multipart(form)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let headers = response.headers();
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name)
            .unwrap_or_else(|| artifact_file_name(&name));
        let fidelity = headers
            .get(FIDELITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(Fidelity::Compiled);

        let bytes = response.bytes().await?.to_vec();

        Ok(CompiledFile {
            file_name,
            bytes,
            fidelity,
        })
    }

    /// Upload several source files in one batch
    ///
    /// Files that cannot be read locally are skipped with a warning. It is an
    /// error if none are left.
    pub async fn compile_batch<P: AsRef<Path>>(&self, paths: &[P]) -> Result<BatchReport> {
        let mut form = Form::new();
        let mut count = 0;

        for path in paths {
            match file_part(path.as_ref()).await {
                Ok((_, part)) => {
                    form = form.part("mq5files", part);
                    count += 1;
                }
                Err(e) => warn!("Skipping {}: {}", path.as_ref().display(), e),
            }
        }

        if count == 0 {
            return Err(ClientError::InvalidRequest(
                "No readable files to compile".to_string(),
            ));
        }

        debug!("Uploading batch of {} file(s)", count);

        let response = self
            .client
            .post(self.url("/compile-batch"))
            .multipart(form)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch an artifact by the `downloadUrl` of a batch report
    pub async fn download(&self, url_path: &str) -> Result<Vec<u8>> {
        let response = self.client.get(self.url(url_path)).send().await?;
        let response = self.check_status(response).await?;

        Ok(response.bytes().await?.to_vec())
    }
}

async fn file_part(path: &Path) -> Result<(String, Part)> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let part = Part::bytes(bytes)
        .file_name(name.clone())
        .mime_str("application/octet-stream")?;

    Ok((name, part))
}

/// Extracts `filename` from a `Content-Disposition` value
fn disposition_file_name(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|param| {
        let name = param.strip_prefix("filename=")?;
        let name = name.trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}

//! Reading upload candidates from disk

use medassist_core::FilePayload;
use std::path::Path;

/// Read a file and guess its content type from the extension.
///
/// Unknown extensions map to `application/octet-stream`, which no category
/// allows, so such files are dropped during validation.
pub async fn read_candidate(path: impl AsRef<Path>) -> std::io::Result<FilePayload> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Ok(FilePayload::new(name, content_type, data))
}

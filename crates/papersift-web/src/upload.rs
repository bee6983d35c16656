use axum::extract::Multipart;

use papersift_core::IncomingFile;
use papersift_core::extract::detect_mime;

/// Form field carrying uploaded documents. May repeat.
const FILES_FIELD: &str = "files";

/// Collect every uploaded file from a multipart form, in form order.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<Vec<IncomingFile>, String> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        if field.name() != Some(FILES_FIELD) {
            // Ignore unknown fields
            let _ = field.bytes().await;
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read file data: {}", e))?
            .to_vec();

        let mime = detect_mime(&name, declared.as_deref(), &data);
        files.push(IncomingFile::new(name, mime, data));
    }

    if files.is_empty() {
        return Err("No file uploaded".to_string());
    }
    Ok(files)
}

//! Direct file streaming with HTTP range requests.
//!
//! One byte range per request; when a client sends several, only the first
//! is honoured. Bodies are streamed from the file, never buffered whole.

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use reelhouse_common::paths::extension_of;
use reelhouse_common::{Error, Result};
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// What a `Range` header asks for, checked against the file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No range header: send everything.
    Full,
    /// Inclusive byte span.
    Partial { start: u64, end: u64 },
    /// Malformed or outside the file.
    Unsatisfiable,
}

impl RangeRequest {
    pub fn from_headers(headers: &HeaderMap, file_size: u64) -> Self {
        match headers.get(header::RANGE) {
            None => Self::Full,
            Some(value) => match value.to_str() {
                Ok(value) => parse_range_header(value, file_size)
                    .map(|(start, end)| Self::Partial { start, end })
                    .unwrap_or(Self::Unsatisfiable),
                Err(_) => Self::Unsatisfiable,
            },
        }
    }
}

/// Parse HTTP Range header.
///
/// Supports formats:
/// - bytes=0-499
/// - bytes=500-
/// - bytes=-500 (last 500 bytes)
/// - bytes=0-99,200-299 (only the first range is used)
pub fn parse_range_header(header: &str, file_size: u64) -> Option<(u64, u64)> {
    let header = header.trim().strip_prefix("bytes=")?;
    let first = header.split(',').next()?.trim();

    let (start, end) = first.split_once('-')?;
    let start = start.trim();
    let end = end.trim();

    if file_size == 0 {
        return None;
    }

    match (start.is_empty(), end.is_empty()) {
        // bytes=-500 (last 500 bytes)
        (true, false) => {
            let suffix_len: u64 = end.parse().ok()?;
            if suffix_len == 0 {
                return None;
            }
            let start = file_size.saturating_sub(suffix_len);
            Some((start, file_size - 1))
        }
        // bytes=500- (from 500 to end)
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            if start >= file_size {
                return None;
            }
            Some((start, file_size - 1))
        }
        // bytes=0-499
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start >= file_size || start > end {
                return None;
            }
            Some((start, end.min(file_size - 1)))
        }
        // bytes=- (invalid)
        (true, true) => None,
    }
}

/// Content type from file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match extension_of(path).as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("ts") | Some("m2ts") => "video/mp2t",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("opus") => "audio/opus",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

fn build(builder: axum::http::response::Builder, body: Body) -> Result<Response> {
    builder
        .body(body)
        .map_err(|e| Error::internal(format!("failed to build response: {e}")))
}

/// Serve `path`, honouring a `Range` header.
pub async fn serve_file(path: &Path, headers: &HeaderMap) -> Result<Response> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| Error::not_found(format!("file {} is gone", path.display())))?;
    let file_size = metadata.len();
    let content_type = content_type_for(path);

    match RangeRequest::from_headers(headers, file_size) {
        RangeRequest::Unsatisfiable => build(
            Response::builder()
                .status(StatusCode::RANGE_NOT_SATISFIABLE)
                .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
                .header(header::ACCEPT_RANGES, "bytes"),
            Body::empty(),
        ),
        RangeRequest::Partial { start, end } => {
            let length = end - start + 1;

            let mut file = File::open(path).await?;
            file.seek(SeekFrom::Start(start)).await?;

            let body = Body::from_stream(ReaderStream::new(file.take(length)));
            build(
                Response::builder()
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, length.to_string())
                    .header(
                        header::CONTENT_RANGE,
                        format!("bytes {}-{}/{}", start, end, file_size),
                    )
                    .header(header::ACCEPT_RANGES, "bytes"),
                body,
            )
        }
        RangeRequest::Full => {
            let file = File::open(path).await?;
            let body = Body::from_stream(ReaderStream::new(file));
            build(
                Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, file_size.to_string())
                    .header(header::ACCEPT_RANGES, "bytes"),
                body,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use http_body_util::BodyExt;

    #[test]
    fn test_parse_range_header_full_range() {
        assert_eq!(parse_range_header("bytes=0-499", 1000), Some((0, 499)));
    }

    #[test]
    fn test_parse_range_header_open_end() {
        assert_eq!(parse_range_header("bytes=500-", 1000), Some((500, 999)));
    }

    #[test]
    fn test_parse_range_header_suffix() {
        assert_eq!(parse_range_header("bytes=-200", 1000), Some((800, 999)));
        assert_eq!(parse_range_header("bytes=-5000", 1000), Some((0, 999)));
        assert_eq!(parse_range_header("bytes=-0", 1000), None);
    }

    #[test]
    fn test_parse_range_header_clamped() {
        assert_eq!(parse_range_header("bytes=0-2000", 1000), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_header_first_of_many() {
        assert_eq!(
            parse_range_header("bytes=100-199, 300-399", 1000),
            Some((100, 199))
        );
    }

    #[test]
    fn test_parse_range_header_invalid() {
        assert_eq!(parse_range_header("bytes=1500-", 1000), None);
        assert_eq!(parse_range_header("bytes=-", 1000), None);
        assert_eq!(parse_range_header("bytes=abc-def", 1000), None);
        assert_eq!(parse_range_header("bytes=500-100", 1000), None);
        assert_eq!(parse_range_header("items=0-1", 1000), None);
        assert_eq!(parse_range_header("bytes=0-0", 0), None);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.mkv")), "video/x-matroska");
        assert_eq!(content_type_for(Path::new("a.flac")), "audio/flac");
        assert_eq!(content_type_for(Path::new("a.exe")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_serve_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=100-199"));
        let response = serve_file(&path, &headers).await.unwrap();

        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers()[header::CONTENT_RANGE],
            "bytes 100-199/1000"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], &data[100..200]);
    }

    #[tokio::test]
    async fn test_serve_unsatisfiable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 1000]).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=2000-"));
        let response = serve_file(&path, &headers).await.unwrap();

        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_serve_missing_file() {
        let result = serve_file(Path::new("/nonexistent/clip.mp4"), &HeaderMap::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}

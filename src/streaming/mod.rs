//! Media streaming.
//!
//! - **Direct**: range-request streaming of the file on disk
//! - **Compatibility**: on-the-fly remux/transcode to fragmented MP4 for
//!   containers browsers cannot play (Matroska)

pub mod compat;
pub mod direct;

pub use compat::{encoder_args, Attempt, CompatStream, CompatTranscoder};
pub use direct::{content_type_for, parse_range_header, serve_file, RangeRequest};

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use reelhouse_common::{Error, Result};

/// Wrap a started compatibility stream as a chunked MP4 response.
pub fn compat_response(stream: CompatStream) -> Result<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CACHE_CONTROL, "no-store")
        .header(header::ACCEPT_RANGES, "none")
        .body(Body::from_stream(stream))
        .map_err(|e| Error::internal(format!("failed to build response: {e}")))
}

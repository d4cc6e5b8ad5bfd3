use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::listing::MediaCategory;

const READ_CHUNK: usize = 64 * 1024;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk stream.
pub fn stream_from_bytes(data: impl Into<Bytes>) -> ByteStream {
    let data: Bytes = data.into();
    Box::pin(async_stream::stream! {
        if !data.is_empty() {
            yield Ok(data);
        }
    })
}

/// Stream an open file in 64 KiB chunks.
pub fn stream_from_file(mut file: tokio::fs::File) -> ByteStream {
    use tokio::io::AsyncReadExt;

    Box::pin(async_stream::try_stream! {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            yield Bytes::copy_from_slice(&buf[..n]);
        }
    })
}

/// Collect a stream into one buffer.
pub async fn collect_stream(mut stream: ByteStream) -> std::io::Result<Bytes> {
    use futures_util::StreamExt;

    let mut buf = bytes::BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// A stored file plus its derived metadata, as returned to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub stored_name: String,
    pub original_name: String,
    /// Epoch millis. `None` when the name carries no numeric prefix.
    pub created_at: Option<i64>,
    pub size_bytes: u64,
    pub access_url: String,
    pub category: MediaCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Blob {
    /// Display name if one was set, otherwise the original name.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.original_name)
    }
}

/// Display metadata change. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none()
    }
}

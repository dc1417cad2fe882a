//! Draining object bodies into text.

use futures::TryStreamExt;

use crate::address::StorageAddress;
use crate::error::{BackendResult, StoreError, StoreResult};
use crate::traits::ObjectBody;

/// Upper bound on the buffer reserved up front from a reported length.
const MAX_PREALLOCATE: u64 = 8 * 1024 * 1024;

/// Collect every chunk of `body` into one buffer.
///
/// The first stream error aborts the read and is returned unchanged.
pub async fn read_to_bytes(body: ObjectBody) -> BackendResult<Vec<u8>> {
    let capacity = body.content_length.unwrap_or(0).min(MAX_PREALLOCATE) as usize;
    let mut buf = Vec::with_capacity(capacity);
    let mut stream = body.stream;
    while let Some(chunk) = stream.try_next().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Collect `body` and decode it as UTF-8.
///
/// Chunks are joined before decoding, so multi-byte characters split across
/// chunk boundaries decode correctly.
pub async fn read_to_string(body: ObjectBody, address: &StorageAddress) -> StoreResult<String> {
    let bytes = read_to_bytes(body).await?;
    String::from_utf8(bytes).map_err(|e| StoreError::MalformedDocument {
        address: address.clone(),
        reason: format!("body is not valid UTF-8: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};

    fn addr() -> StorageAddress {
        StorageAddress::new("bucket", "doc.json").unwrap()
    }

    #[tokio::test]
    async fn joins_chunks_in_order() {
        let body = ObjectBody::from_chunks(vec![
            Bytes::from_static(b"{\"foo\":"),
            Bytes::from_static(b"\"bar\""),
            Bytes::from_static(b"}"),
        ]);
        assert_eq!(read_to_string(body, &addr()).await.unwrap(), r#"{"foo":"bar"}"#);
    }

    #[tokio::test]
    async fn multibyte_char_split_across_chunks() {
        let text = "\"héllo ✓\"".as_bytes();
        // Split inside the three-byte check mark.
        let split = text.len() - 3;
        let body = ObjectBody::from_chunks(vec![
            Bytes::copy_from_slice(&text[..split]),
            Bytes::copy_from_slice(&text[split..]),
        ]);
        assert_eq!(read_to_string(body, &addr()).await.unwrap(), "\"héllo ✓\"");
    }

    #[tokio::test]
    async fn empty_body_is_empty_string() {
        let body = ObjectBody::from_chunks(Vec::new());
        assert_eq!(read_to_string(body, &addr()).await.unwrap(), "");
    }

    #[tokio::test]
    async fn invalid_utf8_is_malformed() {
        let body = ObjectBody::from_bytes(vec![0x7b, 0xff, 0xfe, 0x7d]);
        let err = read_to_string(body, &addr()).await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedDocument { .. }));
    }

    #[tokio::test]
    async fn stream_error_propagates() {
        let chunks: Vec<BackendResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"{\"a\":")),
            Err(BackendError::Transport("connection reset".into())),
        ];
        let body = ObjectBody {
            stream: stream::iter(chunks).boxed(),
            content_length: None,
            e_tag: None,
        };
        let err = read_to_bytes(body).await.unwrap_err();
        assert_eq!(err, BackendError::Transport("connection reset".into()));
    }
}

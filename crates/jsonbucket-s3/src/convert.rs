//! Translation between SDK types and `jsonbucket-store` types.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::{ByteStream as SdkByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types::{Object, Tag as SdkTag, Tagging};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use jsonbucket_store::{
    BackendError, BackendResult, ByteStream, ListingResult, ObjectSummary, Owner,
    ServerSideEncryption, StorageAddress, TagSet,
};

const NO_SUCH_KEY: &str = "NoSuchKey";

/// Map an SDK failure onto [`BackendError`].
///
/// With an `address`, a `NoSuchKey` code or a 404 status becomes
/// [`BackendError::NotFound`]. Without one (bucket-level calls) a 404 stays a
/// service error.
pub(crate) fn sdk_error<E>(err: SdkError<E, HttpResponse>, address: Option<&StorageAddress>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(ctx) => {
            let service = ctx.err();
            let message = service
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            classify(service.code(), ctx.raw().status().as_u16(), message, address)
        }
        _ => BackendError::Transport(DisplayErrorContext(&err).to_string()),
    }
}

pub(crate) fn classify(
    code: Option<&str>,
    status: u16,
    message: String,
    address: Option<&StorageAddress>,
) -> BackendError {
    match address {
        Some(address) if code == Some(NO_SUCH_KEY) || status == 404 => BackendError::NotFound {
            bucket: address.bucket().to_string(),
            key: address.key().to_string(),
        },
        _ => BackendError::Service {
            code: code.map(str::to_string),
            message,
            status: Some(status),
        },
    }
}

/// Adapt the SDK body into the store's chunk stream. A read error ends the
/// stream.
pub(crate) fn body_stream(body: SdkByteStream) -> ByteStream {
    stream::unfold(Some(body), |state| async move {
        let mut body = state?;
        match body.try_next().await {
            Ok(Some(chunk)) => Some((Ok(chunk), Some(body))),
            Ok(None) => None,
            Err(e) => Some((
                Err(BackendError::Transport(format!("failed to read object body: {e}"))),
                None,
            )),
        }
    })
    .boxed()
}

pub(crate) fn encryption(sse: ServerSideEncryption) -> aws_sdk_s3::types::ServerSideEncryption {
    match sse {
        ServerSideEncryption::Aes256 => aws_sdk_s3::types::ServerSideEncryption::Aes256,
    }
}

pub(crate) fn tagging(tags: &TagSet) -> BackendResult<Tagging> {
    let tag_set = tags
        .iter()
        .map(|t| {
            SdkTag::builder()
                .key(&t.key)
                .value(&t.value)
                .build()
                .map_err(|e| BackendError::InvalidRequest(e.to_string()))
        })
        .collect::<BackendResult<Vec<_>>>()?;
    Tagging::builder()
        .set_tag_set(Some(tag_set))
        .build()
        .map_err(|e| BackendError::InvalidRequest(e.to_string()))
}

pub(crate) fn tag_set(tags: &[SdkTag]) -> TagSet {
    tags.iter().map(|t| (t.key(), t.value())).collect()
}

pub(crate) fn timestamp(dt: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn summary(object: &Object) -> ObjectSummary {
    ObjectSummary {
        key: object.key().unwrap_or_default().to_string(),
        last_modified: object.last_modified().and_then(timestamp),
        e_tag: object.e_tag().map(str::to_string),
        size: object.size().and_then(|s| u64::try_from(s).ok()),
        storage_class: object.storage_class().map(|c| c.as_str().to_string()),
        owner: object.owner().map(|o| Owner {
            display_name: o.display_name().map(str::to_string),
            id: o.id().map(str::to_string),
        }),
    }
}

pub(crate) fn listing(output: &ListObjectsV2Output) -> ListingResult {
    ListingResult {
        name: output.name().map(str::to_string),
        prefix: output.prefix().map(str::to_string),
        delimiter: output.delimiter().map(str::to_string),
        max_keys: output.max_keys(),
        key_count: output.key_count(),
        is_truncated: output.is_truncated().unwrap_or(false),
        continuation_token: output.continuation_token().map(str::to_string),
        next_continuation_token: output.next_continuation_token().map(str::to_string),
        start_after: output.start_after().map(str::to_string),
        contents: output.contents().iter().map(summary).collect(),
        common_prefixes: output
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect(),
    }
}

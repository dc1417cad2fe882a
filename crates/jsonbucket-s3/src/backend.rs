//! [`StorageBackend`] over the AWS SDK S3 client.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use jsonbucket_store::{
    BackendResult, FolderAddress, ListOptions, ListingResult, ObjectBody, PutObjectRequest,
    PutReceipt, StorageAddress, StorageBackend, TagSet,
};
use tracing::{debug, info};

use crate::config::S3Config;
use crate::convert;

/// S3 storage backend.
///
/// Cheap to clone; the SDK client shares its connection pool between clones.
#[derive(Clone, Debug)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Wrap an existing SDK client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve the AWS environment with `config` applied and build a client.
    pub async fn from_config(config: &S3Config) -> Self {
        let client = config.client().await;
        info!(
            region = ?client.config().region().map(|r| r.to_string()),
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            path_style = config.force_path_style,
            "S3 client ready"
        );
        Self::new(client)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn get_object(&self, address: &StorageAddress) -> BackendResult<ObjectBody> {
        debug!(bucket = address.bucket(), key = address.key(), "GetObject");
        let output = self
            .client
            .get_object()
            .bucket(address.bucket())
            .key(address.key())
            .send()
            .await
            .map_err(|e| convert::sdk_error(e, Some(address)))?;

        let content_length = output.content_length().and_then(|n| u64::try_from(n).ok());
        let e_tag = output.e_tag().map(str::to_string);
        Ok(ObjectBody {
            stream: convert::body_stream(output.body),
            content_length,
            e_tag,
        })
    }

    async fn put_object(&self, request: PutObjectRequest) -> BackendResult<PutReceipt> {
        let address = &request.address;
        debug!(
            bucket = address.bucket(),
            key = address.key(),
            size = request.body.len(),
            sse = %request.encryption,
            "PutObject"
        );
        let output = self
            .client
            .put_object()
            .bucket(address.bucket())
            .key(address.key())
            .body(ByteStream::from(request.body))
            .server_side_encryption(convert::encryption(request.encryption))
            .send()
            .await
            .map_err(|e| convert::sdk_error(e, None))?;

        Ok(PutReceipt {
            e_tag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
            server_side_encryption: output
                .server_side_encryption()
                .map(|s| s.as_str().to_string()),
        })
    }

    async fn put_object_tagging(&self, address: &StorageAddress, tags: &TagSet) -> BackendResult<()> {
        debug!(bucket = address.bucket(), key = address.key(), count = tags.len(), "PutObjectTagging");
        let tagging = convert::tagging(tags)?;
        self.client
            .put_object_tagging()
            .bucket(address.bucket())
            .key(address.key())
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| convert::sdk_error(e, Some(address)))?;
        Ok(())
    }

    async fn get_object_tagging(&self, address: &StorageAddress) -> BackendResult<TagSet> {
        debug!(bucket = address.bucket(), key = address.key(), "GetObjectTagging");
        let output = self
            .client
            .get_object_tagging()
            .bucket(address.bucket())
            .key(address.key())
            .send()
            .await
            .map_err(|e| convert::sdk_error(e, Some(address)))?;
        Ok(convert::tag_set(output.tag_set()))
    }

    async fn list_objects(
        &self,
        folder: &FolderAddress,
        options: &ListOptions,
    ) -> BackendResult<ListingResult> {
        debug!(bucket = folder.bucket(), prefix = folder.prefix(), ?options, "ListObjectsV2");
        let output = self
            .client
            .list_objects_v2()
            .bucket(folder.bucket())
            .prefix(folder.prefix())
            .set_max_keys(options.max_keys)
            .set_start_after(options.start_after.clone())
            .set_delimiter(options.delimiter.clone())
            .set_continuation_token(options.continuation_token.clone())
            .set_fetch_owner(options.fetch_owner)
            .send()
            .await
            .map_err(|e| convert::sdk_error(e, None))?;
        Ok(convert::listing(&output))
    }
}

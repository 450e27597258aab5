use caravel_dev::{RemoteStore, SyncError, MARKER_KEY};

use crate::aws::AwsClient;
use crate::executor::CommandExecutor;

/// Hot-reload file store backed by the service's S3 bucket.
pub struct S3RemoteStore<E: CommandExecutor> {
    aws: AwsClient<E>,
    bucket: String,
}

impl<E: CommandExecutor> S3RemoteStore<E> {
    pub fn new(aws: AwsClient<E>, bucket: impl Into<String>) -> Self {
        Self {
            aws,
            bucket: bucket.into(),
        }
    }
}

impl<E: CommandExecutor> RemoteStore for S3RemoteStore<E> {
    async fn fetch_marker(&self) -> Result<String, SyncError> {
        self.aws
            .s3_get(&self.bucket, MARKER_KEY)
            .await
            .map(|s| s.trim().to_owned())
            .map_err(|e| SyncError::Marker {
                detail: e.to_string(),
            })
    }

    async fn list_keys(&self) -> Result<Vec<String>, SyncError> {
        self.aws
            .s3_list_keys(&self.bucket)
            .await
            .map_err(|e| SyncError::List {
                detail: e.to_string(),
            })
    }

    async fn fetch_object(&self, key: &str) -> Result<String, SyncError> {
        self.aws
            .s3_get(&self.bucket, key)
            .await
            .map_err(|e| SyncError::Fetch {
                key: key.to_owned(),
                detail: e.to_string(),
            })
    }
}

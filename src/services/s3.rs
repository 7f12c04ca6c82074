use aws_config::load_from_env;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::AsyncRead;

use crate::error::DataLoadError;

pub async fn create_client() -> Client {
    let config = load_from_env().await;
    Client::new(&config)
}

pub async fn get_file_stream(
    client: &Client,
    bucket: &str,
    key: &str,
) -> Result<ByteStream, DataLoadError> {
    let response = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| DataLoadError::Remote {
            location: format!("s3://{bucket}/{key}"),
            source: Box::new(e),
        })?;

    Ok(response.body)
}

/// Open an object as a byte reader for the CSV loader.
pub async fn open_object(
    bucket: &str,
    key: &str,
) -> Result<impl AsyncRead + Unpin + Send, DataLoadError> {
    let client = create_client().await;
    let stream = get_file_stream(&client, bucket, key).await?;
    Ok(stream.into_async_read())
}

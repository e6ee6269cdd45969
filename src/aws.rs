use crate::config::AwsConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use tracing::info;

/// Load the AWS configuration shared by the S3, SQS and Rekognition clients
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()));

    // Static credentials take precedence over the default provider chain
    let loader = if let (Some(access_key), Some(secret_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        let credentials = Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "StaticCredentialsProvider",
        );
        loader.credentials_provider(credentials)
    } else {
        loader
    };

    let sdk_config = loader.load().await;
    info!("Loaded AWS configuration for region {}", config.region);
    sdk_config
}

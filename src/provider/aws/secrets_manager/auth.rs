//! # AWS Secrets Manager Authentication
//!
//! Handles AWS SDK configuration and authentication setup.

use aws_config::SdkConfig;
use tracing::info;

/// Create AWS SDK config using the default credential chain
///
/// Inside Lambda the chain resolves the execution role from the environment.
/// When `endpoint` is set, requests are routed there instead of the regional
/// AWS endpoint (local mock servers, LocalStack).
pub async fn create_sdk_config(region: &str, endpoint: Option<&str>) -> SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    if let Some(endpoint) = endpoint {
        info!(
            "Endpoint override: routing AWS Secrets Manager requests to {}",
            endpoint
        );
        builder = builder.endpoint_url(endpoint);
    }

    builder.load().await
}

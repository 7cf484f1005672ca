use aws_sdk_cloudformation::config::Credentials;

use crate::config::{CredentialSource, Settings};

/// Build an `SdkConfig` from resolved settings.
pub async fn build_aws_config(settings: &Settings) -> aws_config::SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(settings.region.clone()));

    match &settings.credentials {
        CredentialSource::Inline {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            builder = builder.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "trop-config",
            ));
        }
        CredentialSource::Profile { profile_name } => {
            builder = builder.profile_name(profile_name);
        }
        CredentialSource::DefaultChain => {}
    }

    tracing::debug!(region = %settings.region, "loading AWS configuration");
    builder.load().await
}

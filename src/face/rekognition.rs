use crate::config::FaceConfig;
use crate::face::comparison::{Comparison, FaceComparison, ImageRef};
use crate::face::error::ComparisonError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rekognition::error::SdkError;
use aws_sdk_rekognition::operation::compare_faces::CompareFacesError;
use aws_sdk_rekognition::types::{Image, S3Object};
use aws_sdk_rekognition::Client;
use tracing::{debug, info, warn};

/// Amazon Rekognition `CompareFaces` implementation of the FaceComparison trait
#[derive(Clone)]
pub struct RekognitionComparison {
    client: Client,
    similarity_threshold: f32,
}

impl RekognitionComparison {
    pub fn new(sdk_config: &SdkConfig, config: &FaceConfig) -> Self {
        let mut builder = aws_sdk_rekognition::config::Builder::from(sdk_config);
        if let Some(endpoint) = &config.endpoint {
            info!("Using custom Rekognition endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            similarity_threshold: config.similarity_threshold,
        }
    }
}

fn s3_image(image: &ImageRef) -> Image {
    Image::builder()
        .s3_object(
            S3Object::builder()
                .bucket(&image.bucket)
                .name(&image.key)
                .build(),
        )
        .build()
}

/// Invalid input means the photograph itself is unusable; retrying cannot help.
fn is_invalid_input(error: &CompareFacesError) -> bool {
    error.is_invalid_parameter_exception()
        || error.is_invalid_image_format_exception()
        || error.is_image_too_large_exception()
}

fn is_throttled(error: &CompareFacesError) -> bool {
    error.is_throttling_exception() || error.is_provisioned_throughput_exceeded_exception()
}

#[async_trait]
impl FaceComparison for RekognitionComparison {
    async fn compare(
        &self,
        reference: &ImageRef,
        candidate: &ImageRef,
    ) -> Result<Comparison, ComparisonError> {
        debug!("Comparing {} against reference {}", candidate, reference);

        let result = self
            .client
            .compare_faces()
            .source_image(s3_image(reference))
            .target_image(s3_image(candidate))
            .similarity_threshold(self.similarity_threshold)
            .send()
            .await;

        match result {
            Ok(output) => {
                let matches = output.face_matches.as_deref().unwrap_or_default().len();
                debug!("Rekognition returned {} matching face pair(s)", matches);
                Ok(if matches > 0 {
                    Comparison::Match
                } else {
                    Comparison::NoMatch
                })
            }
            Err(SdkError::ServiceError(service_err)) => {
                let err = service_err.err();
                if is_invalid_input(err) {
                    warn!(
                        "Rekognition rejected {} against {}: {}; treating as no match",
                        candidate, reference, err
                    );
                    Ok(Comparison::NoMatch)
                } else if is_throttled(err) {
                    Err(ComparisonError::Throttled(err.to_string()))
                } else {
                    Err(ComparisonError::Service(err.to_string()))
                }
            }
            Err(SdkError::TimeoutError(e)) => Err(ComparisonError::Timeout(format!("{:?}", e))),
            Err(e) => Err(ComparisonError::Unavailable(e.to_string())),
        }
    }
}

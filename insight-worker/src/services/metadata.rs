use async_trait::async_trait;
use common_types::ImageMetadata;

/// Capture details for a downloaded image
///
/// Extraction is best effort; images without usable metadata yield
/// [`ImageMetadata::default`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn extract(&self, image_id: &str, image: &[u8]) -> ImageMetadata;
}

/// Provider for deployments without EXIF or geocoding support
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetadata;

#[async_trait]
impl MetadataProvider for NoMetadata {
    async fn extract(&self, _image_id: &str, _image: &[u8]) -> ImageMetadata {
        ImageMetadata::default()
    }
}

mod digest;
mod metadata;
mod vision;

pub use digest::DigestService;
pub use metadata::{MetadataProvider, NoMetadata};
pub use vision::VisionService;
pub(crate) use vision::DOWNLOAD_BUDGET_SECS;

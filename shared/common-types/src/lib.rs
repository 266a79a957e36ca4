//! Wire types shared between the queue producer and the insight worker

mod channel;
mod digest;
mod metadata;
mod vision;

pub use channel::Channel;
pub use digest::{
    AiInsights, DigestEntry, DigestRequest, DigestResponse, EntryDigest, EntryImageDescription,
    EntryQuestion, Period,
};
pub use metadata::{ImageMetadata, Landmark, Location};
pub use vision::{ImageDescription, ImageRef, VisionRequest, VisionResponse};

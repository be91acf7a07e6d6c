pub mod dto;
pub mod jobs;
pub mod model;
pub mod repository;

pub use dto::{EncoreJob, EncoreStatus, PackagingQueueMessage};
pub use jobs::{JobError, JobSubmitter};
pub use model::{ManifestAsset, TranscodeInfo, TranscodeStatus};
pub use repository::{PackagingQueue, StoreError, TranscodeStore};

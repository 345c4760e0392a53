pub(crate) mod local_snapshot; // VACUUM INTO copy in a temp directory
pub(crate) mod logic; // snapshot -> upload -> cleanup
pub(crate) mod s3_upload; // object store seam and the S3 implementation

pub use logic::{SnapshotUploadResult, perform_snapshot_upload};
pub use s3_upload::{ObjectStore, PutObjectRequest, S3ObjectStore};

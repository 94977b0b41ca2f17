mod error;
mod registry;
mod traits;
mod upload;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod object;

pub use error::StorageError;
pub use registry::DiskRegistry;
pub use traits::{Disk, join_url, validate_key};
pub use upload::UploadedFile;

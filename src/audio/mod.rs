pub mod download;
pub mod handle;
pub mod playback;

pub use download::{derive_filename, filename_from_disposition, DownloadSink, SaveTrigger, DEFAULT_FILENAME};
pub use handle::{Blob, ObjectUrl, ObjectUrlFactory, ObjectUrlRegistry, ResourceHandle};
pub use playback::{AudioOutput, PlaybackSink};

/// Tour lifecycle: keeps tour records and their image files consistent

pub mod service;

pub use service::TourService;

use crate::blob_store::UploadedFile;

/// Decoded create/update request
///
/// Text fields are `None` when the client did not send them.
#[derive(Debug, Clone, Default)]
pub struct TourSubmission {
    pub state: Option<String>,
    pub description: Option<String>,
    pub places: Option<String>,
    pub images: Vec<UploadedFile>,
}

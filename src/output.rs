//! Values produced by a pipeline run.

use crate::pipeline::encode;
use serde::Serialize;

/// One rendered page: 1-based page number plus JPEG bytes.
///
/// Read-only after rendering. The bytes are held in memory so the scoped
/// render workspace can be deleted as soon as rendering returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub page_num: usize,
    pub jpeg: Vec<u8>,
}

impl PageImage {
    pub fn new(page_num: usize, jpeg: Vec<u8>) -> Self {
        Self { page_num, jpeg }
    }

    /// `page_<n>.jpg`, the name the page had in the render workspace.
    pub fn file_name(&self) -> String {
        encode::page_file_name(self.page_num)
    }

    /// `data:image/jpeg;base64,…` for inline display and document insertion.
    pub fn data_uri(&self) -> String {
        encode::jpeg_data_uri(&self.jpeg)
    }
}

/// One page's image paired with its description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub image: PageImage,
    pub description: String,
}

impl AnalysisResult {
    pub fn page_num(&self) -> usize {
        self.image.page_num
    }
}

/// Template-facing view of an [`AnalysisResult`].
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub page_num: usize,
    pub image_uri: String,
    pub description: String,
}

impl From<&AnalysisResult> for AnalysisView {
    fn from(r: &AnalysisResult) -> Self {
        Self {
            page_num: r.page_num(),
            image_uri: r.image.data_uri(),
            description: r.description.clone(),
        }
    }
}

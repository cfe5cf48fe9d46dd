//! PDF rasterisation: render every page to a JPEG in a scoped workspace.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-safe. `tokio::task::spawn_blocking` moves the work onto the blocking
//! pool so the request-handling workers keep serving other requests.
//!
//! ## Workspace lifetime
//!
//! Pages are written as `page_<n>.jpg` into a [`TempDir`] owned by the render
//! call, read back into memory, and the directory is removed when the call
//! returns. Because the `TempDir` is a local value, removal happens on every
//! exit path, including errors and panics in the blocking task.

use crate::config::AnalyzerConfig;
use crate::error::RenderError;
use crate::output::PageImage;
use crate::pipeline::encode;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Converts a PDF into its ordered page images.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render all pages in document order, page numbers 1..=N.
    async fn render(&self, pdf_path: &Path) -> Result<Vec<PageImage>, RenderError>;
}

/// pdfium-backed [`PageRenderer`].
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    dpi: u32,
    max_pixels: u32,
    jpeg_quality: u8,
    lib_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            jpeg_quality: config.jpeg_quality,
            lib_path: config.pdfium_lib_path.clone(),
        }
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn render(&self, pdf_path: &Path) -> Result<Vec<PageImage>, RenderError> {
        check_pdf_file(pdf_path)?;

        let workspace = TempDir::new()?;
        let path = pdf_path.to_path_buf();
        let out_dir = workspace.path().to_path_buf();
        let renderer = self.clone();

        let written = tokio::task::spawn_blocking(move || renderer.render_blocking(&path, &out_dir))
            .await
            .map_err(|e| RenderError::RasterisationFailed {
                page: 0,
                detail: format!("render task panicked: {e}"),
            })??;

        let mut pages = Vec::with_capacity(written.len());
        for (page_num, file) in written {
            let jpeg = tokio::fs::read(&file).await?;
            pages.push(PageImage::new(page_num, jpeg));
        }

        info!("Rendered {} pages from {}", pages.len(), pdf_path.display());
        Ok(pages)
    }
}

impl PdfiumRenderer {
    /// Blocking implementation. Returns `(page_num, path)` in page order.
    fn render_blocking(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
    ) -> Result<Vec<(usize, PathBuf)>, RenderError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref())?;

        let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                RenderError::PasswordRequired
            } else {
                RenderError::CorruptPdf { detail: err_str }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        if total_pages == 0 {
            return Err(RenderError::CorruptPdf {
                detail: "document has no pages".into(),
            });
        }
        debug!("PDF loaded: {} pages", total_pages);

        let mut written = Vec::with_capacity(total_pages);

        for idx in 0..total_pages {
            let page_num = idx + 1;
            let page = pages
                .get(idx as u16)
                .map_err(|e| RenderError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?;

            let target_width = (page.width().value * self.dpi as f32 / 72.0).round() as i32;
            let render_config = PdfRenderConfig::new()
                .set_target_width(target_width.max(1))
                .set_maximum_width(self.max_pixels as i32)
                .set_maximum_height(self.max_pixels as i32);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                RenderError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            let jpeg = encode::encode_jpeg(&image, self.jpeg_quality).map_err(|e| {
                RenderError::EncodeFailed {
                    page: page_num,
                    detail: e.to_string(),
                }
            })?;

            let file = out_dir.join(encode::page_file_name(page_num));
            std::fs::write(&file, &jpeg)?;
            debug!(
                "Rendered page {} → {}x{} px, {} bytes",
                page_num,
                image.width(),
                image.height(),
                jpeg.len()
            );

            written.push((page_num, file));
        }

        Ok(written)
    }
}

/// Bind to pdfium: an explicit library (file or directory) if configured,
/// otherwise whatever the system loader finds.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, RenderError> {
    let bindings = match lib_path {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
        }
        Some(p) => Pdfium::bind_to_library(p),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| RenderError::PdfiumBindingFailed(e.to_string()))?;

    Ok(Pdfium::new(bindings))
}

/// Validate that `path` exists, is readable, and starts with `%PDF`.
pub fn check_pdf_file(path: &Path) -> Result<(), RenderError> {
    let mut f = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RenderError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(RenderError::Workspace(e)),
    };

    let mut magic = Vec::with_capacity(4);
    f.by_ref().take(4).read_to_end(&mut magic)?;
    check_pdf_magic(&magic)
}

/// Validate the `%PDF` magic at the start of an in-memory upload.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), RenderError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(RenderError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

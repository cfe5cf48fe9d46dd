//! Configuration for the analysis pipeline and the web front end.
//!
//! All behaviour is controlled through [`AnalyzerConfig`], built via its
//! [`AnalyzerConfigBuilder`]. There is no configuration file: the CLI maps
//! flags and environment variables onto the builder once at start-up, and
//! per-request values (prompt, credentials) travel with the request.

use crate::credentials::ApiKey;
use crate::error::AnalyzerError;
use crate::prompts::DEFAULT_PROMPT;
use std::fmt;
use std::path::PathBuf;

/// Configuration for rendering, describing and persisting.
///
/// # Example
/// ```rust
/// use edgequake_pdf2docs::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .model("gpt-4o-mini")
///     .dpi(120)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 300);
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Vision model identifier. Default: `gpt-4o`.
    pub model: String,

    /// Maximum tokens the model may generate per page. Default: 300.
    ///
    /// Descriptions are short by intent; the bound also caps per-page cost.
    pub max_tokens: usize,

    /// Sampling temperature. Default: unset (provider default).
    pub temperature: Option<f32>,

    /// Rendering DPI. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 2000.
    ///
    /// Caps the longest edge regardless of DPI so an A0 poster does not
    /// produce a 13 000 px bitmap.
    pub max_rendered_pixels: u32,

    /// JPEG quality for rendered pages (1–100). Default: 85.
    pub jpeg_quality: u8,

    /// Display width of each inserted image, in points. Default: 400.
    pub image_width_pt: f64,

    /// Display height of each inserted image, in points. Default: 500.
    pub image_height_pt: f64,

    /// Per-call timeout for the inference provider, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Per-call timeout for the Docs API and token endpoint, in seconds. Default: 60.
    pub docs_timeout_secs: u64,

    /// Base URL of the Google Docs REST API. Default: `https://docs.googleapis.com`.
    pub docs_base_url: String,

    /// Explicit path to a pdfium shared library. If None, the system library is used.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Prompt used when a request does not supply one. Default: "Describe the page".
    pub default_prompt: String,

    /// Process-wide inference key, used when a request carries none.
    pub default_api_key: Option<ApiKey>,

    /// Upper bound on a multipart upload body, in bytes. Default: 64 MiB.
    pub max_upload_bytes: usize,

    /// Address the web front end listens on. Default: `0.0.0.0:8000`.
    pub bind_addr: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 300,
            temperature: None,
            dpi: 150,
            max_rendered_pixels: 2000,
            jpeg_quality: 85,
            image_width_pt: 400.0,
            image_height_pt: 500.0,
            api_timeout_secs: 60,
            docs_timeout_secs: 60,
            docs_base_url: "https://docs.googleapis.com".to_string(),
            pdfium_lib_path: None,
            default_prompt: DEFAULT_PROMPT.to_string(),
            default_api_key: None,
            max_upload_bytes: 64 * 1024 * 1024,
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("image_size_pt", &(self.image_width_pt, self.image_height_pt))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("docs_timeout_secs", &self.docs_timeout_secs)
            .field("docs_base_url", &self.docs_base_url)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("default_api_key", &self.default_api_key.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn image_size_pt(mut self, width: f64, height: f64) -> Self {
        self.config.image_width_pt = width;
        self.config.image_height_pt = height;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn docs_timeout_secs(mut self, secs: u64) -> Self {
        self.config.docs_timeout_secs = secs;
        self
    }

    pub fn docs_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.docs_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn default_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.default_prompt = prompt.into();
        self
    }

    pub fn default_api_key(mut self, key: Option<ApiKey>) -> Self {
        self.config.default_api_key = key;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(AnalyzerError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if !(c.image_width_pt > 0.0 && c.image_height_pt > 0.0) {
            return Err(AnalyzerError::InvalidConfig(format!(
                "image size must be positive, got {}×{} pt",
                c.image_width_pt, c.image_height_pt
            )));
        }
        if c.api_timeout_secs == 0 || c.docs_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig("timeouts must be ≥ 1s".into()));
        }
        if !(c.docs_base_url.starts_with("http://") || c.docs_base_url.starts_with("https://")) {
            return Err(AnalyzerError::InvalidConfig(format!(
                "docs_base_url must be an HTTP(S) URL, got '{}'",
                c.docs_base_url
            )));
        }
        if c.default_prompt.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig("default prompt must not be empty".into()));
        }
        Ok(self.config)
    }
}

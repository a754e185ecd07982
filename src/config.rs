//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults convert without
//! captioning, so no API key is needed unless `caption_images` is turned on.

use crate::error::Doc2MdError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used for captions when neither `model` nor `EDGEQUAKE_MODEL` is set.
pub const DEFAULT_CAPTION_MODEL: &str = "gpt-4.1-nano";

/// Configuration for a document conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doc2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .pandoc_path("/opt/pandoc/bin/pandoc")
///     .caption_images(true)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Pandoc executable, a bare name looked up on `PATH` or a full path.
    /// Default: `"pandoc"`.
    pub pandoc_path: String,

    /// Extra arguments appended to every pandoc invocation
    /// (e.g. `--wrap=none`, `-t gfm`).
    pub pandoc_args: Vec<String>,

    /// Explicit pdfium shared library. If None, tries `PDFIUM_LIB_PATH`,
    /// the working directory, then the system library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Caption every extracted image with a VLM. Default: false.
    pub caption_images: bool,

    /// Prompt sent with each image. If None, uses
    /// [`crate::prompts::DEFAULT_CAPTION_PROMPT`].
    pub caption_prompt: Option<String>,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "llava".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for captions. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate per caption. Default: 500.
    pub max_tokens: usize,

    /// Optional progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pandoc_path: "pandoc".to_string(),
            pandoc_args: Vec::new(),
            pdfium_lib_path: None,
            password: None,
            caption_images: false,
            caption_prompt: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 500,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("pandoc_path", &self.pandoc_path)
            .field("pandoc_args", &self.pandoc_args)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("caption_images", &self.caption_images)
            .field("caption_prompt", &self.caption_prompt)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn pandoc_path(mut self, path: impl Into<String>) -> Self {
        self.config.pandoc_path = path.into();
        self
    }

    pub fn pandoc_arg(mut self, arg: impl Into<String>) -> Self {
        self.config.pandoc_args.push(arg.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn caption_images(mut self, v: bool) -> Self {
        self.config.caption_images = v;
        self
    }

    pub fn caption_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.caption_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Doc2MdError> {
        let c = &self.config;
        if c.pandoc_path.trim().is_empty() {
            return Err(Doc2MdError::InvalidConfig(
                "pandoc path must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Doc2MdError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let Some(ref prompt) = c.caption_prompt {
            if prompt.trim().is_empty() {
                return Err(Doc2MdError::InvalidConfig(
                    "caption prompt must not be blank".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

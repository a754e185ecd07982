//! Image captioning: describe each extracted image with a VLM and append
//! the descriptions to the Markdown file.
//!
//! Images are captioned one at a time in path order, with a single attempt
//! each. A failure on one image is recorded in its [`CaptionResult`] and the
//! loop moves on; only I/O on the Markdown file itself is fatal. A failed
//! image adds no line to the Markdown, so the file only ever holds real
//! descriptions.
//!
//! The VLM sits behind [`ImageDescriber`] so the loop can be exercised
//! without network access. [`VlmDescriber`] is the production
//! implementation over any `edgequake_llm` provider.

use crate::config::{ConversionConfig, DEFAULT_CAPTION_MODEL};
use crate::error::{CaptionError, Doc2MdError};
use crate::output::CaptionResult;
use crate::pipeline::encode::{encode_image, mime_for_path};
use crate::pipeline::media::list_media_images;
use crate::pipeline::postprocess::clean_caption;
use crate::progress::ProgressCallback;
use crate::prompts::caption_line;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Image types sent for captioning.
pub const CAPTION_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A model's answer for one image.
#[derive(Debug, Clone, Default)]
pub struct Description {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Something that can describe an image given a prompt.
pub trait ImageDescriber: Send + Sync {
    fn describe(
        &self,
        image: ImageData,
        prompt: &str,
    ) -> impl Future<Output = Result<Description, String>> + Send;
}

/// [`ImageDescriber`] backed by an `edgequake_llm` vision provider.
pub struct VlmDescriber {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl VlmDescriber {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }

    /// Resolve the provider from `config` and wrap it.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Doc2MdError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }
}

impl ImageDescriber for VlmDescriber {
    fn describe(
        &self,
        image: ImageData,
        prompt: &str,
    ) -> impl Future<Output = Result<Description, String>> + Send {
        async move {
            let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];
            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| e.to_string())?;
            Ok(Description {
                text: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
            })
        }
    }
}

/// Build `CompletionOptions` from the conversion config.
fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Caption every image under `media_dir` and append the captions to
/// `markdown_path`.
///
/// A missing Markdown file is treated as empty and created. Returns one
/// [`CaptionResult`] per image, in the order they were processed.
pub async fn caption_media<D: ImageDescriber>(
    markdown_path: &Path,
    media_dir: &Path,
    describer: &D,
    prompt: &str,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<CaptionResult>, Doc2MdError> {
    let images = list_media_images(media_dir, Some(CAPTION_EXTENSIONS));
    let total = images.len();
    info!("Captioning {} images in {}", total, media_dir.display());

    let mut content = match tokio::fs::read_to_string(markdown_path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(Doc2MdError::OutputReadFailed {
                path: markdown_path.to_path_buf(),
                source: e,
            })
        }
    };

    let mut results = Vec::with_capacity(total);
    for (i, image) in images.into_iter().enumerate() {
        let index = i + 1;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(cb) = progress {
            cb.on_caption_start(index, total, &file_name);
        }

        let result = caption_one(describer, image, file_name, prompt).await;

        match &result.error {
            None => {
                content.push_str(&caption_line(&result.file_name, &result.description));
                if let Some(cb) = progress {
                    cb.on_caption_complete(index, total, &result.file_name, result.description.len());
                }
            }
            Some(e) => {
                warn!("{}", e);
                if let Some(cb) = progress {
                    cb.on_caption_error(index, total, &result.file_name, &e.to_string());
                }
            }
        }
        results.push(result);
    }

    tokio::fs::write(markdown_path, &content)
        .await
        .map_err(|e| Doc2MdError::OutputWriteFailed {
            path: markdown_path.to_path_buf(),
            source: e,
        })?;

    Ok(results)
}

async fn caption_one<D: ImageDescriber>(
    describer: &D,
    image: PathBuf,
    file_name: String,
    prompt: &str,
) -> CaptionResult {
    let start = Instant::now();
    let failed = |image: PathBuf, file_name: String, error: CaptionError| CaptionResult {
        image,
        file_name,
        description: String::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(error),
    };

    let bytes = match tokio::fs::read(&image).await {
        Ok(b) => b,
        Err(e) => {
            let error = CaptionError::ReadFailed {
                image: file_name.clone(),
                detail: e.to_string(),
            };
            return failed(image, file_name, error);
        }
    };
    let mime = mime_for_path(&image).unwrap_or("image/png");

    match describer.describe(encode_image(&bytes, mime), prompt).await {
        Ok(desc) => {
            let description = clean_caption(&desc.text);
            if description.is_empty() {
                let error = CaptionError::EmptyResponse {
                    image: file_name.clone(),
                };
                return failed(image, file_name, error);
            }
            debug!(
                "{}: {} input tokens, {} output tokens",
                file_name, desc.input_tokens, desc.output_tokens
            );
            CaptionResult {
                image,
                file_name,
                description,
                input_tokens: desc.input_tokens,
                output_tokens: desc.output_tokens,
                duration_ms: start.elapsed().as_millis() as u64,
                error: None,
            }
        }
        Err(detail) => {
            let error = CaptionError::LlmFailed {
                image: file_name.clone(),
                detail,
            };
            failed(image, file_name, error)
        }
    }
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Doc2MdError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Doc2MdError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`: used as-is.
/// 2. `config.provider_name` (+ `config.model`).
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
/// 4. OpenAI when `OPENAI_API_KEY` is present.
/// 5. `ProviderFactory::from_env()` auto-detection.
pub fn resolve_provider(config: &ConversionConfig) -> Result<Arc<dyn LLMProvider>, Doc2MdError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_CAPTION_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_CAPTION_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Doc2MdError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "Image captioning needs a vision model, but none could be auto-detected.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider/--model.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

//! Image loading backend abstraction.
//!
//! Decoding is delegated to an [`ImageBackend`]. The process-wide default is
//! the `image` crate backend; callers may install another one once at startup.

use std::path::Path;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::error::{PreprocessError, Result};
use crate::io::image::{ImageHandle, LoadImageOptions};

/// Decodes an image file into 8-bit pixels, converting color and resizing as
/// requested by the options.
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn load(&self, path: &Path, options: &LoadImageOptions) -> Result<ImageHandle>;
}

/// Stand-in used when the crate is built without `vision`.
#[cfg(not(feature = "vision"))]
pub struct DisabledBackend;

#[cfg(not(feature = "vision"))]
impl ImageBackend for DisabledBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn load(&self, _path: &Path, _options: &LoadImageOptions) -> Result<ImageHandle> {
        Err(PreprocessError::FeatureDisabled("vision"))
    }
}

static GLOBAL_BACKEND: OnceLock<Arc<dyn ImageBackend>> = OnceLock::new();

fn default_backend() -> Arc<dyn ImageBackend> {
    #[cfg(feature = "vision")]
    {
        Arc::new(crate::io::image::ImageCrateBackend)
    }
    #[cfg(not(feature = "vision"))]
    {
        Arc::new(DisabledBackend)
    }
}

/// Set the global image backend. Only callable once per process, and only
/// before the first image is loaded.
pub fn set_global_backend(b: Arc<dyn ImageBackend>) -> Result<()> {
    let name = b.name();
    GLOBAL_BACKEND
        .set(b)
        .map_err(|_| PreprocessError::config("global image backend already set"))?;
    log::info!("Image backend set to {}", name);
    Ok(())
}

/// Returns the global image backend, installing the default on first use.
pub fn get_global_backend() -> &'static Arc<dyn ImageBackend> {
    GLOBAL_BACKEND.get_or_init(default_backend)
}

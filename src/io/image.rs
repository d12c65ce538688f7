use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use ndarray::Array3;

use crate::backend::get_global_backend;
#[cfg(feature = "vision")]
use crate::backend::ImageBackend;
use crate::error::{PreprocessError, Result};

/// Channel layout of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    Grayscale,
    #[default]
    Rgb,
    Rgba,
}

impl ColorMode {
    pub fn channels(&self) -> usize {
        match self {
            ColorMode::Grayscale => 1,
            ColorMode::Rgb => 3,
            ColorMode::Rgba => 4,
        }
    }
}

impl FromStr for ColorMode {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grayscale" => Ok(ColorMode::Grayscale),
            "rgb" => Ok(ColorMode::Rgb),
            "rgba" => Ok(ColorMode::Rgba),
            other => Err(PreprocessError::config(format!(
                "color_mode must be one of grayscale, rgb, rgba; got \"{}\"",
                other
            ))),
        }
    }
}

/// Resampling filter used when a target size is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
    Gaussian,
}

impl FromStr for Interpolation {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nearest" => Ok(Interpolation::Nearest),
            "bilinear" => Ok(Interpolation::Bilinear),
            "bicubic" => Ok(Interpolation::Bicubic),
            "lanczos" => Ok(Interpolation::Lanczos),
            "gaussian" => Ok(Interpolation::Gaussian),
            other => Err(PreprocessError::config(format!(
                "unsupported interpolation \"{}\"; expected nearest, bilinear, bicubic, lanczos or gaussian",
                other
            ))),
        }
    }
}

#[cfg(feature = "vision")]
impl Interpolation {
    fn filter(&self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
            Interpolation::Bicubic => FilterType::CatmullRom,
            Interpolation::Lanczos => FilterType::Lanczos3,
            Interpolation::Gaussian => FilterType::Gaussian,
        }
    }
}

/// Axis order of the array produced by [`image_to_array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    /// `(height, width, channels)`
    #[default]
    ChannelsLast,
    /// `(channels, height, width)`
    ChannelsFirst,
}

impl FromStr for DataFormat {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "channels_last" => Ok(DataFormat::ChannelsLast),
            "channels_first" => Ok(DataFormat::ChannelsFirst),
            other => Err(PreprocessError::config(format!(
                "data_format must be \"channels_last\" or \"channels_first\", got \"{}\"",
                other
            ))),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataFormat::ChannelsLast => "channels_last",
            DataFormat::ChannelsFirst => "channels_first",
        })
    }
}

/// Options for [`load_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadImageOptions {
    pub color_mode: ColorMode,
    /// `(height, width)`; the image is resized to exactly this size.
    pub target_size: Option<(u32, u32)>,
    pub interpolation: Interpolation,
}

impl LoadImageOptions {
    /// Shorthand for the boolean grayscale flag: `true` selects grayscale,
    /// `false` keeps the current mode.
    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        if grayscale {
            self.color_mode = ColorMode::Grayscale;
        }
        self
    }

    pub fn with_target_size(mut self, height: u32, width: u32) -> Self {
        self.target_size = Some((height, width));
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((h, w)) = self.target_size {
            if h == 0 || w == 0 {
                return Err(PreprocessError::config(format!(
                    "target_size must be positive, got ({}, {})",
                    h, w
                )));
            }
        }
        Ok(())
    }
}

/// Decoded 8-bit image. Pixels are stored row-major with interleaved channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    width: u32,
    height: u32,
    color_mode: ColorMode,
    pixels: Vec<u8>,
}

impl ImageHandle {
    pub fn from_raw(width: u32, height: u32, color_mode: ColorMode, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * color_mode.channels();
        if pixels.len() != expected {
            return Err(PreprocessError::Image(format!(
                "pixel buffer holds {} bytes, expected {} for {}x{} {:?}",
                pixels.len(),
                expected,
                width,
                height,
                color_mode
            )));
        }
        Ok(ImageHandle {
            width,
            height,
            color_mode,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.color_mode.channels()
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Load an image through the global backend.
pub fn load_image<P: AsRef<Path>>(path: P, options: &LoadImageOptions) -> Result<ImageHandle> {
    options.validate()?;
    let backend = get_global_backend();
    let img = backend.load(path.as_ref(), options)?;
    debug!(
        "Loaded {} with {} backend: {}x{}x{}",
        path.as_ref().display(),
        backend.name(),
        img.height(),
        img.width(),
        img.channels()
    );
    Ok(img)
}

/// Load several images with the same options. The first failure is returned.
/// With `parallel` and the `parallel_io` feature, images are decoded on the
/// rayon pool; order is preserved either way.
pub fn load_image_batch<P>(paths: &[P], options: &LoadImageOptions, parallel: bool) -> Result<Vec<ImageHandle>>
where
    P: AsRef<Path> + Sync,
{
    options.validate()?;
    let images = if parallel {
        #[cfg(feature = "parallel_io")]
        {
            use rayon::prelude::*;
            paths
                .par_iter()
                .map(|p| load_image(p, options))
                .collect::<Result<Vec<_>>>()?
        }
        #[cfg(not(feature = "parallel_io"))]
        {
            paths.iter().map(|p| load_image(p, options)).collect::<Result<Vec<_>>>()?
        }
    } else {
        paths.iter().map(|p| load_image(p, options)).collect::<Result<Vec<_>>>()?
    };
    info!("Loaded image batch of {} (parallel={})", images.len(), parallel);
    Ok(images)
}

/// Convert an image to a float array of raw pixel values in `[0, 255]`.
pub fn image_to_array(img: &ImageHandle, data_format: DataFormat) -> Result<Array3<f32>> {
    let shape = (img.height as usize, img.width as usize, img.channels());
    let data: Vec<f32> = img.pixels.iter().map(|&p| p as f32).collect();
    let hwc = Array3::from_shape_vec(shape, data)
        .map_err(|e| PreprocessError::Image(format!("ndarray shape creation failed: {}", e)))?;
    Ok(match data_format {
        DataFormat::ChannelsLast => hwc,
        DataFormat::ChannelsFirst => hwc.permuted_axes([2, 0, 1]).as_standard_layout().into_owned(),
    })
}

/// Backend built on the `image` crate.
#[cfg(feature = "vision")]
pub struct ImageCrateBackend;

#[cfg(feature = "vision")]
impl ImageBackend for ImageCrateBackend {
    fn name(&self) -> &'static str {
        "image"
    }

    fn load(&self, path: &Path, options: &LoadImageOptions) -> Result<ImageHandle> {
        use image::DynamicImage;

        let img = image::open(path)
            .map_err(|e| PreprocessError::Image(format!("failed to open image {}: {}", path.display(), e)))?;
        // color conversion happens before resampling
        let img = match options.color_mode {
            ColorMode::Grayscale => DynamicImage::ImageLuma8(img.to_luma8()),
            ColorMode::Rgb => DynamicImage::ImageRgb8(img.to_rgb8()),
            ColorMode::Rgba => DynamicImage::ImageRgba8(img.into_rgba8()),
        };
        let img = match options.target_size {
            Some((h, w)) => img.resize_exact(w, h, options.interpolation.filter()),
            None => img,
        };
        let (width, height) = (img.width(), img.height());
        let pixels = match options.color_mode {
            ColorMode::Grayscale => img.into_luma8().into_raw(),
            ColorMode::Rgb => img.into_rgb8().into_raw(),
            ColorMode::Rgba => img.into_rgba8().into_raw(),
        };
        ImageHandle::from_raw(width, height, options.color_mode, pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> ImageHandle {
        let pixels = (0..height)
            .flat_map(|y| (0..width).flat_map(move |x| [x as u8, y as u8, 7]))
            .collect();
        ImageHandle::from_raw(width, height, ColorMode::Rgb, pixels).unwrap()
    }

    #[test]
    fn channels_last_keeps_raw_values() {
        let arr = image_to_array(&gradient(4, 2), DataFormat::ChannelsLast).unwrap();
        assert_eq!(arr.shape(), &[2, 4, 3]);
        assert_eq!(arr[[1, 3, 0]], 3.0);
        assert_eq!(arr[[1, 3, 1]], 1.0);
        assert_eq!(arr[[0, 0, 2]], 7.0);
    }

    #[test]
    fn channels_first_moves_channel_axis() {
        let arr = image_to_array(&gradient(4, 2), DataFormat::ChannelsFirst).unwrap();
        assert_eq!(arr.shape(), &[3, 2, 4]);
        assert_eq!(arr[[0, 1, 3]], 3.0);
        assert_eq!(arr[[1, 1, 3]], 1.0);
        assert!(arr.is_standard_layout());
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(ImageHandle::from_raw(2, 2, ColorMode::Rgba, vec![0; 12]).is_err());
    }

    #[test]
    fn option_strings_parse() {
        assert_eq!("channels_first".parse::<DataFormat>().unwrap(), DataFormat::ChannelsFirst);
        assert!("nhwc".parse::<DataFormat>().is_err());
        assert_eq!("bicubic".parse::<Interpolation>().unwrap(), Interpolation::Bicubic);
        assert!("cubic".parse::<Interpolation>().is_err());
        assert_eq!("rgba".parse::<ColorMode>().unwrap().channels(), 4);
        let opts = LoadImageOptions::default().with_grayscale(true).with_target_size(0, 3);
        assert_eq!(opts.color_mode, ColorMode::Grayscale);
        assert!(opts.validate().is_err());
    }

    #[cfg(feature = "vision")]
    #[test]
    fn image_crate_backend_loads_png() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grad.png");
        image::RgbImage::from_fn(5, 3, |x, y| image::Rgb([x as u8 * 10, y as u8 * 20, 255]))
            .save(&path)
            .unwrap();

        let img = ImageCrateBackend.load(&path, &LoadImageOptions::default()).unwrap();
        assert_eq!((img.width(), img.height(), img.channels()), (5, 3, 3));
        let arr = image_to_array(&img, DataFormat::ChannelsLast).unwrap();
        assert_eq!(arr[[2, 4, 0]], 40.0);
        assert_eq!(arr[[2, 4, 1]], 40.0);

        let small = ImageCrateBackend
            .load(&path, &LoadImageOptions::default().with_grayscale(true).with_target_size(2, 4))
            .unwrap();
        assert_eq!((small.height(), small.width(), small.channels()), (2, 4, 1));
    }

    #[cfg(feature = "vision")]
    #[test]
    fn grayscale_conversion_precedes_resize() {
        use image::imageops::FilterType;
        use image::DynamicImage;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stripes.png");
        let src = image::RgbImage::from_fn(7, 5, |x, y| {
            image::Rgb([(x * 37 % 256) as u8, (y * 61 % 256) as u8, ((x + y) * 23 % 256) as u8])
        });
        src.save(&path).unwrap();

        let opts = LoadImageOptions::default()
            .with_grayscale(true)
            .with_target_size(3, 4)
            .with_interpolation(Interpolation::Bilinear);
        let img = ImageCrateBackend.load(&path, &opts).unwrap();

        let expected = DynamicImage::ImageLuma8(DynamicImage::ImageRgb8(src).to_luma8())
            .resize_exact(4, 3, FilterType::Triangle)
            .into_luma8()
            .into_raw();
        assert_eq!(img.pixels(), expected.as_slice());
    }

    #[cfg(feature = "vision")]
    #[test]
    fn missing_file_is_an_image_error() {
        let err = ImageCrateBackend
            .load(Path::new("/nonexistent/nothing.png"), &LoadImageOptions::default())
            .unwrap_err();
        assert!(matches!(err, PreprocessError::Image(_)));
    }
}

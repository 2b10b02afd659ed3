//! The `image:build` task
//!
//! JPEG files are re-encoded lossily, PNG files losslessly at the highest
//! compression and GIF files frame by frame with a fresh palette. SVG files
//! have comments, metadata and inter-tag whitespace stripped; everything
//! else is copied. When an optimized result is not
//! smaller than its input the original bytes are written instead.

use crate::config::AssetCategory;
use crate::error::{io_at, ExecutionError, ExecutionResult};
use crate::runner::Context;
use crate::tasks::{announce, files, Inputs};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::metadata::LoopCount;
use image::{AnimationDecoder, DynamicImage, ImageError, ImageFormat};
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Palette quantization speed for GIF frames (1 best, 30 fastest)
const GIF_SPEED: i32 = 10;

static SVG_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static SVG_METADATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<metadata\b.*?</metadata>|<metadata\b[^>]*/>").unwrap());
static SVG_GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").unwrap());

/// How a file is treated, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Svg,
    Other,
}

impl ImageKind {
    pub fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => ImageKind::Jpeg,
            "png" => ImageKind::Png,
            "gif" => ImageKind::Gif,
            "svg" => ImageKind::Svg,
            _ => ImageKind::Other,
        }
    }
}

/// Optimize every image into the img build directory, in parallel
pub fn build(ctx: &Context) -> ExecutionResult<Vec<PathBuf>> {
    let Some(inputs) = Inputs::collect(ctx, AssetCategory::Img)? else {
        return Ok(Vec::new());
    };

    let quality = ctx.config.options.jpeg_quality;
    let written = inputs
        .files
        .par_iter()
        .map(|input| {
            let target = inputs.output_for(ctx, input);
            let saved = optimize_file(input, &target, quality)?;
            if saved > 0 {
                ctx.print_debug(&format!("{}: saved {} bytes", target.display(), saved));
            }
            Ok(target)
        })
        .collect::<ExecutionResult<Vec<_>>>()?;

    announce(ctx, AssetCategory::Img, &written);
    Ok(written)
}

/// Optimize one file, returning the number of bytes saved
pub fn optimize_file(input: &Path, target: &Path, quality: u8) -> ExecutionResult<usize> {
    let original = fs::read(input).map_err(io_at(input))?;

    let candidate = match ImageKind::of(input) {
        ImageKind::Jpeg => Some(reencode_jpeg(input, &original, quality)?),
        ImageKind::Png => Some(reencode_png(input, &original)?),
        ImageKind::Gif => Some(reencode_gif(input, &original)?),
        ImageKind::Svg => Some(minify_svg(&String::from_utf8_lossy(&original)).into_bytes()),
        ImageKind::Other => None,
    };

    match candidate {
        Some(smaller) if smaller.len() < original.len() => {
            files::write_file(target, &smaller)?;
            Ok(original.len() - smaller.len())
        }
        _ => {
            files::write_file(target, &original)?;
            Ok(0)
        }
    }
}

fn decode(path: &Path, bytes: &[u8], format: ImageFormat) -> ExecutionResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, format).map_err(|e| ExecutionError::Image {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

fn reencode_jpeg(path: &Path, bytes: &[u8], quality: u8) -> ExecutionResult<Vec<u8>> {
    let image = decode(path, bytes, ImageFormat::Jpeg)?;
    // JPEG has no alpha channel
    let image = match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let mut out = Vec::new();
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| ExecutionError::Image {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    Ok(out)
}

fn reencode_png(path: &Path, bytes: &[u8]) -> ExecutionResult<Vec<u8>> {
    let image = decode(path, bytes, ImageFormat::Png)?;

    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    image
        .write_with_encoder(encoder)
        .map_err(|e| ExecutionError::Image {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    Ok(out)
}

fn reencode_gif(path: &Path, bytes: &[u8]) -> ExecutionResult<Vec<u8>> {
    let image_error = |e: ImageError| ExecutionError::Image {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(image_error)?;
    let repeat = match decoder.loop_count() {
        LoopCount::Infinite => Repeat::Infinite,
        LoopCount::Finite(n) => Repeat::Finite(u16::try_from(n.get()).unwrap_or(u16::MAX)),
    };
    let frames = decoder.into_frames().collect_frames().map_err(image_error)?;

    let mut out = Vec::new();
    {
        // the trailer is written when the encoder drops
        let mut encoder = GifEncoder::new_with_speed(&mut out, GIF_SPEED);
        encoder.set_repeat(repeat).map_err(image_error)?;
        encoder.encode_frames(frames).map_err(image_error)?;
    }
    Ok(out)
}

/// Strip comments, metadata and whitespace between tags
pub fn minify_svg(svg: &str) -> String {
    let without_comments = SVG_COMMENT_RE.replace_all(svg, "");
    let without_metadata = SVG_METADATA_RE.replace_all(&without_comments, "");
    SVG_GAP_RE
        .replace_all(&without_metadata, "><")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Verbosity;
    use image::{Delay, Frame, Rgb, RgbImage, RgbaImage};
    use tempfile::TempDir;

    fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn noisy(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = ((x * 31 + y * 17) ^ (x * y)) as u8;
            Rgb([v, v.wrapping_mul(3), v.wrapping_add(80)])
        })
    }

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(ImageKind::of(Path::new("a/photo.JPG")), ImageKind::Jpeg);
        assert_eq!(ImageKind::of(Path::new("logo.png")), ImageKind::Png);
        assert_eq!(ImageKind::of(Path::new("icon.svg")), ImageKind::Svg);
        assert_eq!(ImageKind::of(Path::new("anim.gif")), ImageKind::Gif);
        assert_eq!(ImageKind::of(Path::new("photo.webp")), ImageKind::Other);
    }

    #[test]
    fn test_minify_svg() {
        let svg = "<svg>\n  <!-- generator -->\n  <metadata><rdf/></metadata>\n  <path d=\"M0 0\"/>\n</svg>\n";
        assert_eq!(minify_svg(svg), "<svg><path d=\"M0 0\"/></svg>");
    }

    #[test]
    fn test_png_stays_lossless() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.png");
        let target = dir.path().join("out/in.png");
        let original = noisy(40, 30);
        fs::write(&input, encode(&original, ImageFormat::Png)).unwrap();

        optimize_file(&input, &target, 80).unwrap();

        let written = fs::read(&target).unwrap();
        assert!(written.len() <= fs::metadata(&input).unwrap().len() as usize);
        let decoded = image::load_from_memory(&written).unwrap().to_rgb8();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_jpeg_never_grows() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.jpg");
        let target = dir.path().join("out/photo.jpg");
        let mut bytes = Vec::new();
        noisy(64, 64)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, 100))
            .unwrap();
        fs::write(&input, &bytes).unwrap();

        optimize_file(&input, &target, 80).unwrap();

        let written = fs::read(&target).unwrap();
        assert!(written.len() <= bytes.len());
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }

    #[test]
    fn test_other_files_are_copied() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("photo.webp");
        let target = dir.path().join("out/photo.webp");
        fs::write(&input, b"RIFF-not-really").unwrap();

        assert_eq!(optimize_file(&input, &target, 80).unwrap(), 0);
        assert_eq!(fs::read(&target).unwrap(), b"RIFF-not-really");
    }

    fn animation(frames: u32) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut out, 30);
            encoder.set_repeat(Repeat::Infinite).unwrap();
            for i in 0..frames {
                let pixels = RgbaImage::from_fn(24, 16, |x, y| {
                    image::Rgba([(x * 10 + i * 40) as u8, (y * 15) as u8, 120, 255])
                });
                encoder
                    .encode_frame(Frame::from_parts(pixels, 0, 0, Delay::from_numer_denom_ms(100, 1)))
                    .unwrap();
            }
        }
        out
    }

    #[test]
    fn test_gif_keeps_frames_and_never_grows() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("anim.gif");
        let target = dir.path().join("out/anim.gif");
        let bytes = animation(3);
        fs::write(&input, &bytes).unwrap();

        optimize_file(&input, &target, 80).unwrap();

        let written = fs::read(&target).unwrap();
        assert!(written.len() <= bytes.len());
        let decoder = GifDecoder::new(Cursor::new(written)).unwrap();
        assert!(matches!(decoder.loop_count(), LoopCount::Infinite));
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].buffer().dimensions(), (24, 16));
    }

    #[test]
    fn test_corrupt_gif_fails() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.gif");
        fs::write(&input, b"GIF89a-not-really").unwrap();

        assert!(matches!(
            optimize_file(&input, &dir.path().join("out.gif"), 80),
            Err(ExecutionError::Image { .. })
        ));
    }

    #[test]
    fn test_corrupt_png_fails() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.png");
        fs::write(&input, b"definitely not a png").unwrap();

        assert!(matches!(
            optimize_file(&input, &dir.path().join("out.png"), 80),
            Err(ExecutionError::Image { .. })
        ));
    }

    #[test]
    fn test_build_preserves_structure() {
        let dir = TempDir::new().unwrap();
        let icons = dir.path().join("src/img/icons");
        fs::create_dir_all(&icons).unwrap();
        fs::write(icons.join("a.svg"), "<svg>\n</svg>").unwrap();
        fs::write(dir.path().join("src/img/b.webp"), b"webp").unwrap();

        let ctx = Context::default()
            .with_root(dir.path())
            .with_verbosity(Verbosity::Silent);
        let mut written = build(&ctx).unwrap();
        written.sort();

        assert_eq!(
            written,
            vec![
                dir.path().join("build/img/b.webp"),
                dir.path().join("build/img/icons/a.svg"),
            ]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("build/img/icons/a.svg")).unwrap(),
            "<svg></svg>"
        );
    }
}

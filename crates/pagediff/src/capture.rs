//! Engine inputs and the page acquisition boundary.
//!
//! Acquiring screenshots and markup (driving a browser, reading files) happens
//! outside the engine. The engine only sees owned [`PageImage`] buffers and
//! optional [`PageMarkup`] snapshots; [`PageCapture`] is the seam where an
//! acquisition layer plugs in.

use crate::result::{PageDiffError, PageDiffResult};
use image::{imageops::FilterType, DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Owned, immutable RGBA8 raster plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    source: String,
    pixels: RgbaImage,
}

impl PageImage {
    /// Wrap an already decoded RGBA buffer
    pub fn from_rgba(source: impl Into<String>, pixels: RgbaImage) -> PageDiffResult<Self> {
        let source = source.into();
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(PageDiffError::input(format!("Image {source} is empty")));
        }
        Ok(Self { source, pixels })
    }

    /// Decode an encoded image (PNG, JPEG)
    pub fn from_bytes(source: impl Into<String>, bytes: &[u8]) -> PageDiffResult<Self> {
        let source = source.into();
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| PageDiffError::input(format!("Failed to decode {source}: {e}")))?;
        Self::from_dynamic(source, &decoded)
    }

    /// Decode an image file
    pub fn open(path: impl AsRef<Path>) -> PageDiffResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            PageDiffError::input(format!("Failed to read image {}: {e}", path.display()))
        })?;
        Self::from_dynamic(path.display().to_string(), &decoded)
    }

    fn from_dynamic(source: String, decoded: &DynamicImage) -> PageDiffResult<Self> {
        Self::from_rgba(source, decoded.to_rgba8())
    }

    /// Source path or identifier
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Underlying pixel buffer
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Resampled copy (Lanczos3). Never called implicitly by the comparator.
    #[must_use]
    pub fn resized_to(&self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let pixels = image::imageops::resize(&self.pixels, width, height, FilterType::Lanczos3);
        Self {
            source: format!("{}@{width}x{height}", self.source),
            pixels,
        }
    }
}

/// Structural snapshot of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageMarkup {
    /// Raw HTML source
    Html(String),
    /// JSON DOM snapshot (tag, attributes, text, children, bounds, styles)
    DomSnapshot(String),
}

impl PageMarkup {
    /// Pick the variant from the first non-blank character
    #[must_use]
    pub fn detect(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with('{') {
            Self::DomSnapshot(text)
        } else {
            Self::Html(text)
        }
    }

    /// Read a markup file
    pub fn open(path: impl AsRef<Path>) -> PageDiffResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PageDiffError::input(format!("Failed to read markup {}: {e}", path.display()))
        })?;
        Ok(Self::detect(text))
    }

    /// Raw text
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Html(text) | Self::DomSnapshot(text) => text,
        }
    }
}

/// A page as delivered by an acquisition layer
#[derive(Debug, Clone)]
pub struct CapturedPage {
    /// Page URL or identifier
    pub url: String,
    /// Rendered screenshot
    pub image: PageImage,
    /// Markup or DOM snapshot, if captured
    pub markup: Option<PageMarkup>,
}

/// External collaborator that renders a page and hands back its pixels and markup
pub trait PageCapture: std::fmt::Debug {
    /// Acquire one page. May block (browser automation, disk).
    fn capture(&self, url: &str) -> PageDiffResult<CapturedPage>;
}

/// Run `capture` on a worker thread and give up after `timeout`.
///
/// Failures and timeouts both come back as input validation errors. A timed
/// out worker is detached; it finishes on its own and its result is dropped.
pub fn capture_with_timeout<C>(
    capture: &Arc<C>,
    url: &str,
    timeout: Duration,
) -> PageDiffResult<CapturedPage>
where
    C: PageCapture + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(capture);
    let target = url.to_string();
    std::thread::spawn(move || {
        let _ = tx.send(worker.capture(&target));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(page)) => Ok(page),
        Ok(Err(e)) => Err(PageDiffError::input(format!("Capture of {url} failed: {e}"))),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(PageDiffError::input(format!(
            "Capture of {url} timed out after {}ms",
            timeout.as_millis()
        ))),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(PageDiffError::input(format!(
            "Capture of {url} aborted"
        ))),
    }
}

/// Reads pre-rendered pages from disk.
///
/// The `url` passed to [`PageCapture::capture`] is an image path. Markup is
/// picked up from a sibling file with the same stem and an `.html` or `.json`
/// extension when one exists.
#[derive(Debug, Clone, Default)]
pub struct FileCapture {
    markup_extensions: Vec<String>,
}

impl FileCapture {
    /// Look for `.html` then `.json` markup next to each image
    #[must_use]
    pub fn new() -> Self {
        Self {
            markup_extensions: vec!["html".to_string(), "json".to_string()],
        }
    }

    /// Ignore sibling markup files
    #[must_use]
    pub fn images_only() -> Self {
        Self {
            markup_extensions: Vec::new(),
        }
    }

    fn sibling_markup(&self, image_path: &Path) -> Option<PathBuf> {
        self.markup_extensions
            .iter()
            .map(|ext| image_path.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }
}

impl PageCapture for FileCapture {
    fn capture(&self, url: &str) -> PageDiffResult<CapturedPage> {
        let path = Path::new(url);
        let image = PageImage::open(path)?;
        let markup = match self.sibling_markup(path) {
            Some(markup_path) => Some(PageMarkup::open(markup_path)?),
            None => None,
        };
        Ok(CapturedPage {
            url: url.to_string(),
            image,
            markup,
        })
    }
}

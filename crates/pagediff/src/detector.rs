//! Difference region detection.
//!
//! The pipeline is plain connected-component analysis:
//!
//! 1. threshold the per-pixel difference into a change mask
//! 2. collect 8-connected components of changed pixels
//! 3. drop components smaller than the noise floor
//! 4. merge boxes that lie within `merge_distance` of each other until stable
//! 5. grade each box by how much of it actually changed, and guess what kind
//!    of change it is from edge density, shape, shifted-content matching and,
//!    when available, element boxes from the DOM snapshots
//!
//! Thresholds come from [`DetectorConfig`]. None of them are part of the
//! output contract; only the region shape and ordering are.

use crate::capture::PageImage;
use crate::comparator::{luma, max_channel_diff, ComparisonMetrics};
use crate::config::DetectorConfig;
use crate::result::{PageDiffError, PageDiffResult};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Axis-aligned box in image pixels, serialized as `[x, y, w, h]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl From<[u32; 4]> for BoundingBox {
    fn from([x, y, width, height]: [u32; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

impl BoundingBox {
    /// Create a new box
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in pixels
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether a point lies inside
    #[must_use]
    pub const fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Whether the box fits inside an image of the given size
    #[must_use]
    pub const fn within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }

    /// Area shared with another box
    #[must_use]
    pub fn overlap_area(&self, other: &Self) -> u64 {
        let w = self.right().min(other.right()).saturating_sub(self.x.max(other.x));
        let h = self.bottom().min(other.bottom()).saturating_sub(self.y.max(other.y));
        u64::from(w) * u64::from(h)
    }

    /// Whether the boxes share at least one pixel
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.overlap_area(other) > 0
    }

    /// Horizontal and vertical gap to another box (0 when they touch or overlap)
    #[must_use]
    pub fn gap(&self, other: &Self) -> (u32, u32) {
        let gx = other
            .x
            .saturating_sub(self.right())
            .max(self.x.saturating_sub(other.right()));
        let gy = other
            .y
            .saturating_sub(self.bottom())
            .max(self.y.saturating_sub(other.bottom()));
        (gx, gy)
    }

    /// Smallest box containing both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }

    /// Long side over short side
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        let long = self.width.max(self.height).max(1);
        let short = self.width.min(self.height).max(1);
        f64::from(long) / f64::from(short)
    }
}

/// How significant a difference region is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionSeverity {
    /// Sparse change
    Minor,
    /// Partial change
    Moderate,
    /// Most of the region changed
    Major,
}

/// Best guess at what changed inside a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Content moved or was resized
    Layout,
    /// Flat color change
    Color,
    /// Glyph-like, edge-dense change
    Text,
    /// Not enough signal to tell
    Unknown,
}

/// One spatially contiguous area of visual change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferenceRegion {
    /// Enclosing box
    pub bounding_box: BoundingBox,
    /// Severity grade
    pub severity: RegionSeverity,
    /// Change classification
    pub kind: RegionKind,
    /// Share (0-1) of the box's pixels that changed
    #[serde(default)]
    pub fill_ratio: f64,
}

/// Element position taken from a DOM snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementBox {
    /// Stable key used to pair elements across pages (id or tree path)
    pub key: String,
    /// Lowercase tag name
    pub tag: String,
    /// Rendered bounds in page pixels
    pub bounds: BoundingBox,
}

/// Element boxes of both pages, used to refine region kinds
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutHints<'a> {
    /// Elements of the reference page
    pub reference: &'a [ElementBox],
    /// Elements of the candidate page
    pub candidate: &'a [ElementBox],
}

impl LayoutHints<'_> {
    fn is_empty(&self) -> bool {
        self.reference.is_empty() && self.candidate.is_empty()
    }
}

const TEXT_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "span", "a", "label", "li", "td", "th", "em",
    "strong", "small", "blockquote", "code", "pre",
];

/// Finds and classifies regions of change between two images
#[derive(Debug, Clone, Default)]
pub struct DifferenceDetector {
    config: DetectorConfig,
}

impl DifferenceDetector {
    /// Create a detector with configuration
    #[must_use]
    pub const fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect regions using pixels alone
    pub fn detect(
        &self,
        reference: &PageImage,
        candidate: &PageImage,
        metrics: &ComparisonMetrics,
    ) -> PageDiffResult<Vec<DifferenceRegion>> {
        self.detect_with_hints(reference, candidate, metrics, LayoutHints::default())
    }

    /// Detect regions, using DOM element boxes to refine classification.
    ///
    /// Regions are sorted by descending severity, then top-to-bottom and
    /// left-to-right. Returned boxes never overlap and always lie inside the
    /// image. Identical images yield no regions.
    pub fn detect_with_hints(
        &self,
        reference: &PageImage,
        candidate: &PageImage,
        metrics: &ComparisonMetrics,
        hints: LayoutHints<'_>,
    ) -> PageDiffResult<Vec<DifferenceRegion>> {
        if reference.dimensions() != candidate.dimensions() {
            return Err(PageDiffError::DimensionMismatch {
                reference: reference.dimensions(),
                candidate: candidate.dimensions(),
            });
        }
        if metrics.ssim >= 1.0 || metrics.is_identical() {
            return Ok(Vec::new());
        }

        let (a, b) = (reference.pixels(), candidate.pixels());
        let mask = ChangeMask::build(a, b, self.config.noise_threshold);
        let components = mask.components(self.config.min_region_area);
        let component_count = components.len();
        let boxes = merge_boxes(components, self.config.merge_distance);

        let mut regions: Vec<DifferenceRegion> = boxes
            .into_iter()
            .map(|bounding_box| {
                let fill_ratio = mask.count_in(&bounding_box) as f64 / bounding_box.area() as f64;
                DifferenceRegion {
                    bounding_box,
                    severity: self.grade(fill_ratio),
                    kind: self.classify(a, b, &bounding_box, hints),
                    fill_ratio,
                }
            })
            .collect();

        regions.sort_by(|l, r| {
            r.severity
                .cmp(&l.severity)
                .then(l.bounding_box.y.cmp(&r.bounding_box.y))
                .then(l.bounding_box.x.cmp(&r.bounding_box.x))
                .then(l.bounding_box.width.cmp(&r.bounding_box.width))
                .then(l.bounding_box.height.cmp(&r.bounding_box.height))
        });

        debug!(
            changed_pixels = mask.changed,
            components = component_count,
            regions = regions.len(),
            "difference detection finished"
        );
        Ok(regions)
    }

    fn grade(&self, fill_ratio: f64) -> RegionSeverity {
        if fill_ratio > self.config.major_fill_ratio {
            RegionSeverity::Major
        } else if fill_ratio >= self.config.moderate_fill_ratio {
            RegionSeverity::Moderate
        } else {
            RegionSeverity::Minor
        }
    }

    fn classify(
        &self,
        a: &RgbaImage,
        b: &RgbaImage,
        region: &BoundingBox,
        hints: LayoutHints<'_>,
    ) -> RegionKind {
        if !hints.is_empty() {
            if let Some(kind) = classify_from_elements(region, hints) {
                return kind;
            }
        }

        // Interior gradients need at least one pixel of margin on each side
        if region.width < 3 || region.height < 3 {
            return RegionKind::Unknown;
        }

        if self.content_shifted(a, b, region) {
            return RegionKind::Layout;
        }

        // What the region shows now decides text versus color
        let candidate_edges = edge_density(b, region, self.config.edge_threshold);
        let edges = edge_density(a, region, self.config.edge_threshold).max(candidate_edges);
        if region.aspect_ratio() >= self.config.layout_aspect_ratio
            && edges >= self.config.layout_edge_density
        {
            return RegionKind::Layout;
        }
        if candidate_edges >= self.config.text_edge_density {
            RegionKind::Text
        } else {
            RegionKind::Color
        }
    }

    /// Whether the candidate's content inside `region` matches the reference
    /// displaced by a few pixels far better than it matches in place.
    fn content_shifted(&self, a: &RgbaImage, b: &RgbaImage, region: &BoundingBox) -> bool {
        let radius = self.config.shift_search_radius as i64;
        if radius == 0 {
            return false;
        }
        // Sample at most ~4096 pixels per offset
        let step = ((region.area() as f64 / 4096.0).sqrt().ceil() as u32).max(1);

        let mean_diff = |dx: i64, dy: i64| -> Option<f64> {
            let mut sum = 0u64;
            let mut count = 0u64;
            for y in (region.y..region.bottom()).step_by(step as usize) {
                for x in (region.x..region.right()).step_by(step as usize) {
                    let sx = i64::from(x) + dx;
                    let sy = i64::from(y) + dy;
                    if sx < 0 || sy < 0 || sx >= i64::from(a.width()) || sy >= i64::from(a.height())
                    {
                        continue;
                    }
                    let diff =
                        max_channel_diff(*b.get_pixel(x, y), *a.get_pixel(sx as u32, sy as u32));
                    sum += u64::from(diff);
                    count += 1;
                }
            }
            (count > 0).then(|| sum as f64 / count as f64)
        };

        let Some(in_place) = mean_diff(0, 0) else {
            return false;
        };
        if in_place <= 0.0 {
            return false;
        }

        let mut best = f64::INFINITY;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(shifted) = mean_diff(dx, dy) {
                    best = best.min(shifted);
                }
            }
        }
        best < in_place * self.config.shift_match_ratio
    }
}

fn classify_from_elements(region: &BoundingBox, hints: LayoutHints<'_>) -> Option<RegionKind> {
    // An element present on both pages whose box moved or resized
    let moved = hints.reference.iter().any(|before| {
        hints
            .candidate
            .iter()
            .find(|after| after.key == before.key)
            .is_some_and(|after| {
                after.bounds != before.bounds
                    && (after.bounds.intersects(region) || before.bounds.intersects(region))
            })
    });
    if moved {
        return Some(RegionKind::Layout);
    }

    let text_overlap: u64 = hints
        .candidate
        .iter()
        .chain(hints.reference.iter())
        .filter(|element| TEXT_TAGS.contains(&element.tag.as_str()))
        .map(|element| element.bounds.overlap_area(region))
        .max()
        .unwrap_or(0);
    (text_overlap * 2 >= region.area()).then_some(RegionKind::Text)
}

/// Fraction of interior pixels whose luma gradient exceeds `threshold`
fn edge_density(image: &RgbaImage, region: &BoundingBox, threshold: f64) -> f64 {
    let l = |x: u32, y: u32| luma(*image.get_pixel(x, y));
    let mut edges = 0u64;
    let mut total = 0u64;
    for y in region.y + 1..region.bottom() - 1 {
        for x in region.x + 1..region.right() - 1 {
            let gx = l(x + 1, y) - l(x - 1, y);
            let gy = l(x, y + 1) - l(x, y - 1);
            if (gx * gx + gy * gy).sqrt() > threshold {
                edges += 1;
            }
            total += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        edges as f64 / total as f64
    }
}

struct ChangeMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
    changed: usize,
}

impl ChangeMask {
    fn build(a: &RgbaImage, b: &RgbaImage, threshold: u8) -> Self {
        let bits: Vec<bool> = a
            .pixels()
            .zip(b.pixels())
            .map(|(pa, pb)| max_channel_diff(*pa, *pb) > threshold)
            .collect();
        let changed = bits.iter().filter(|&&bit| bit).count();
        Self {
            width: a.width(),
            height: a.height(),
            bits,
            changed,
        }
    }

    fn at(&self, x: u32, y: u32) -> bool {
        self.bits[(y * self.width + x) as usize]
    }

    fn count_in(&self, region: &BoundingBox) -> usize {
        (region.y..region.bottom())
            .map(|y| (region.x..region.right()).filter(|&x| self.at(x, y)).count())
            .sum()
    }

    /// Bounding boxes of 8-connected components with at least `min_area` pixels,
    /// in scan order of their first pixel.
    fn components(&self, min_area: u32) -> Vec<BoundingBox> {
        let (w, h) = (self.width, self.height);
        let mut visited = vec![false; self.bits.len()];
        let mut stack: Vec<(u32, u32)> = Vec::new();
        let mut boxes = Vec::new();

        for start_y in 0..h {
            for start_x in 0..w {
                let start = (start_y * w + start_x) as usize;
                if !self.bits[start] || visited[start] {
                    continue;
                }

                visited[start] = true;
                stack.push((start_x, start_y));
                let (mut min_x, mut min_y, mut max_x, mut max_y) =
                    (start_x, start_y, start_x, start_y);
                let mut pixels = 0u32;

                while let Some((x, y)) = stack.pop() {
                    pixels += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);

                    for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                        for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                            let index = (ny * w + nx) as usize;
                            if self.bits[index] && !visited[index] {
                                visited[index] = true;
                                stack.push((nx, ny));
                            }
                        }
                    }
                }

                if pixels >= min_area {
                    boxes.push(BoundingBox::new(
                        min_x,
                        min_y,
                        max_x - min_x + 1,
                        max_y - min_y + 1,
                    ));
                }
            }
        }
        boxes
    }
}

/// Repeatedly union boxes whose gap is within `distance` on both axes.
///
/// On return no two boxes overlap or sit within `distance` of each other.
fn merge_boxes(mut boxes: Vec<BoundingBox>, distance: u32) -> Vec<BoundingBox> {
    loop {
        let mut merged_any = false;
        let mut i = 0;
        while i < boxes.len() {
            let mut j = i + 1;
            while j < boxes.len() {
                let (gx, gy) = boxes[i].gap(&boxes[j]);
                let close = gx <= distance && gy <= distance;
                if close || boxes[i].intersects(&boxes[j]) {
                    let other = boxes.remove(j);
                    boxes[i] = boxes[i].union(&other);
                    merged_any = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !merged_any {
            return boxes;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::comparator::ImageComparator;
    use image::Rgba;
    use proptest::prelude::*;

    const BACKGROUND: Rgba<u8> = Rgba([245, 245, 245, 255]);

    fn page(pixels: RgbaImage) -> PageImage {
        PageImage::from_rgba("test", pixels).unwrap()
    }

    fn fill(pixels: &mut RgbaImage, rect: BoundingBox, color: Rgba<u8>) {
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                pixels.put_pixel(x, y, color);
            }
        }
    }

    fn detect(a: &PageImage, b: &PageImage) -> Vec<DifferenceRegion> {
        let metrics = ImageComparator::default().compare(a, b).unwrap();
        DifferenceDetector::default().detect(a, b, &metrics).unwrap()
    }

    mod bounding_box_tests {
        use super::*;

        #[test]
        fn test_geometry() {
            let a = BoundingBox::new(10, 10, 20, 10);
            assert_eq!(a.right(), 30);
            assert_eq!(a.bottom(), 20);
            assert_eq!(a.area(), 200);
            assert!(a.contains(10, 10));
            assert!(!a.contains(30, 10));
            assert!(a.within(30, 20));
            assert!(!a.within(29, 20));
            assert!((a.aspect_ratio() - 2.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_gap_and_union() {
            let a = BoundingBox::new(0, 0, 10, 10);
            let b = BoundingBox::new(15, 2, 5, 5);
            assert_eq!(a.gap(&b), (5, 0));
            assert_eq!(b.gap(&a), (5, 0));
            assert!(!a.intersects(&b));
            assert_eq!(a.union(&b), BoundingBox::new(0, 0, 20, 10));
            assert_eq!(a.overlap_area(&BoundingBox::new(5, 5, 10, 10)), 25);
        }

        #[test]
        fn test_serializes_as_array() {
            let json = serde_json::to_string(&BoundingBox::new(1, 2, 3, 4)).unwrap();
            assert_eq!(json, "[1,2,3,4]");
            let back: BoundingBox = serde_json::from_str("[5,6,7,8]").unwrap();
            assert_eq!(back, BoundingBox::new(5, 6, 7, 8));
        }
    }

    mod merge_tests {
        use super::*;

        #[test]
        fn test_close_boxes_merge() {
            let merged = merge_boxes(
                vec![BoundingBox::new(0, 0, 10, 10), BoundingBox::new(14, 0, 10, 10)],
                8,
            );
            assert_eq!(merged, vec![BoundingBox::new(0, 0, 24, 10)]);
        }

        #[test]
        fn test_distant_boxes_stay_apart() {
            let boxes = vec![BoundingBox::new(0, 0, 10, 10), BoundingBox::new(40, 0, 10, 10)];
            assert_eq!(merge_boxes(boxes.clone(), 8), boxes);
        }

        #[test]
        fn test_chain_merge_is_transitive() {
            // a and c are far apart, but both are close to b once a and b merge
            let merged = merge_boxes(
                vec![
                    BoundingBox::new(0, 0, 10, 10),
                    BoundingBox::new(40, 40, 10, 10),
                    BoundingBox::new(5, 5, 40, 40),
                ],
                0,
            );
            assert_eq!(merged, vec![BoundingBox::new(0, 0, 50, 50)]);
        }
    }

    mod detection_tests {
        use super::*;

        #[test]
        fn test_identical_images_have_no_regions() {
            let a = page(RgbaImage::from_pixel(64, 64, BACKGROUND));
            assert!(detect(&a, &a.clone()).is_empty());
        }

        #[test]
        fn test_identical_metrics_short_circuit() {
            let a = page(RgbaImage::from_pixel(8, 8, BACKGROUND));
            let b = page(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
            let regions = DifferenceDetector::default()
                .detect(&a, &b, &ComparisonMetrics::identical())
                .unwrap();
            assert!(regions.is_empty());
        }

        #[test]
        fn test_single_block_change() {
            let a = page(RgbaImage::from_pixel(800, 600, BACKGROUND));
            let mut pixels = a.pixels().clone();
            let block = BoundingBox::new(300, 200, 50, 50);
            fill(&mut pixels, block, Rgba([200, 30, 30, 255]));

            let regions = detect(&a, &page(pixels));
            assert_eq!(regions.len(), 1);
            let region = &regions[0];
            assert_eq!(region.bounding_box, block);
            assert_eq!(region.severity, RegionSeverity::Major);
            assert_eq!(region.kind, RegionKind::Color);
            assert!((region.fill_ratio - 1.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_block_over_texture_is_color() {
            let mut before = RgbaImage::from_pixel(400, 300, Rgba([255, 255, 255, 255]));
            for x in (0..400).step_by(4) {
                fill(&mut before, BoundingBox::new(x, 0, 2, 300), Rgba([30, 30, 30, 255]));
            }
            let block = BoundingBox::new(100, 100, 50, 50);
            let mut after = before.clone();
            fill(&mut after, block, Rgba([200, 30, 30, 255]));

            let regions = detect(&page(before), &page(after));
            assert_eq!(regions.len(), 1);
            assert_eq!(regions[0].bounding_box, block);
            assert_eq!(regions[0].severity, RegionSeverity::Major);
            assert_eq!(regions[0].kind, RegionKind::Color);
        }

        #[test]
        fn test_small_noise_is_ignored() {
            let a = page(RgbaImage::from_pixel(100, 100, BACKGROUND));
            let mut pixels = a.pixels().clone();
            fill(&mut pixels, BoundingBox::new(10, 10, 2, 2), Rgba([0, 0, 0, 255]));
            assert!(detect(&a, &page(pixels)).is_empty());
        }

        #[test]
        fn test_ordering_by_severity_then_reading_order() {
            let a = page(RgbaImage::from_pixel(200, 200, BACKGROUND));
            let mut pixels = a.pixels().clone();
            // Sparse grid of dots (minor) at the top
            for y in (10..40).step_by(12) {
                for x in (10..40).step_by(12) {
                    fill(&mut pixels, BoundingBox::new(x, y, 4, 4), Rgba([0, 0, 0, 255]));
                }
            }
            // Two solid blocks (major) lower down, right one first in x order
            fill(&mut pixels, BoundingBox::new(120, 150, 20, 20), Rgba([0, 0, 200, 255]));
            fill(&mut pixels, BoundingBox::new(20, 150, 20, 20), Rgba([0, 0, 200, 255]));

            let regions = detect(&a, &page(pixels));
            assert_eq!(regions.len(), 3);
            assert_eq!(regions[0].bounding_box.x, 20);
            assert_eq!(regions[1].bounding_box.x, 120);
            assert_eq!(regions[0].severity, RegionSeverity::Major);
            assert_eq!(regions[2].severity, RegionSeverity::Minor);
            assert_eq!(regions[2].bounding_box, BoundingBox::new(10, 10, 28, 28));
        }

        #[test]
        fn test_moved_block_is_layout() {
            let mut before = RgbaImage::from_pixel(200, 120, BACKGROUND);
            let mut after = before.clone();
            fill(&mut before, BoundingBox::new(40, 30, 60, 40), Rgba([20, 60, 160, 255]));
            fill(&mut after, BoundingBox::new(45, 30, 60, 40), Rgba([20, 60, 160, 255]));

            let regions = detect(&page(before), &page(after));
            assert!(!regions.is_empty());
            assert!(regions.iter().all(|r| r.kind == RegionKind::Layout));
        }

        #[test]
        fn test_striped_change_is_text() {
            let a = page(RgbaImage::from_pixel(120, 60, Rgba([255, 255, 255, 255])));
            let mut pixels = a.pixels().clone();
            // Two-pixel strokes with two-pixel gaps, like rendered glyphs
            for x in (20..80).step_by(4) {
                fill(&mut pixels, BoundingBox::new(x, 20, 2, 20), Rgba([0, 0, 0, 255]));
            }
            let regions = detect(&a, &page(pixels));
            assert_eq!(regions.len(), 1);
            assert_eq!(regions[0].kind, RegionKind::Text);
        }

        #[test]
        fn test_dimension_mismatch() {
            let a = page(RgbaImage::from_pixel(10, 10, BACKGROUND));
            let b = page(RgbaImage::from_pixel(10, 12, BACKGROUND));
            let metrics = ComparisonMetrics {
                ssim: 0.5,
                mse: 1.0,
                psnr: 48.0,
                pixel_diff_percent: 1.0,
            };
            assert!(DifferenceDetector::default().detect(&a, &b, &metrics).is_err());
        }
    }

    mod hint_tests {
        use super::*;

        fn element(key: &str, tag: &str, bounds: BoundingBox) -> ElementBox {
            ElementBox {
                key: key.to_string(),
                tag: tag.to_string(),
                bounds,
            }
        }

        #[test]
        fn test_moved_element_marks_layout() {
            let region = BoundingBox::new(10, 10, 20, 20);
            let reference = [element("#hero", "div", BoundingBox::new(0, 0, 40, 40))];
            let candidate = [element("#hero", "div", BoundingBox::new(0, 8, 40, 40))];
            let kind = classify_from_elements(
                &region,
                LayoutHints {
                    reference: &reference,
                    candidate: &candidate,
                },
            );
            assert_eq!(kind, Some(RegionKind::Layout));
        }

        #[test]
        fn test_text_element_marks_text() {
            let region = BoundingBox::new(10, 10, 20, 20);
            let boxes = [element("p:0", "p", BoundingBox::new(0, 0, 100, 25))];
            let kind = classify_from_elements(
                &region,
                LayoutHints {
                    reference: &boxes,
                    candidate: &boxes,
                },
            );
            assert_eq!(kind, Some(RegionKind::Text));
        }

        #[test]
        fn test_unrelated_elements_defer_to_pixels() {
            let region = BoundingBox::new(10, 10, 20, 20);
            let boxes = [element("#nav", "nav", BoundingBox::new(200, 0, 100, 25))];
            let kind = classify_from_elements(
                &region,
                LayoutHints {
                    reference: &boxes,
                    candidate: &boxes,
                },
            );
            assert_eq!(kind, None);
        }
    }

    fn arb_blocks() -> impl Strategy<Value = Vec<(u32, u32, u32, u32)>> {
        proptest::collection::vec((0u32..90, 0u32..70, 1u32..30, 1u32..30), 0..6)
    }

    proptest! {
        #[test]
        fn prop_regions_in_bounds_disjoint_and_deterministic(blocks in arb_blocks()) {
            let a = page(RgbaImage::from_pixel(100, 80, BACKGROUND));
            let mut pixels = a.pixels().clone();
            for (x, y, w, h) in blocks {
                let w = w.min(100 - x);
                let h = h.min(80 - y);
                fill(&mut pixels, BoundingBox::new(x, y, w, h), Rgba([10, 10, 10, 255]));
            }
            let b = page(pixels);

            let first = detect(&a, &b);
            let second = detect(&a, &b);
            prop_assert_eq!(&first, &second);

            for (i, region) in first.iter().enumerate() {
                prop_assert!(region.bounding_box.within(100, 80));
                for other in &first[i + 1..] {
                    prop_assert!(!region.bounding_box.intersects(&other.bounding_box));
                }
            }
        }
    }
}

//! Segmentation artifacts: a label mask and its intensity image.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, ImageBuffer, ImageReader, Luma};
use imageproc::contours::{BorderType, find_contours};

use crate::error::{CellTrackError, Result};
use crate::geometry::{BoundingBox, CellFrame, Pixel};
use crate::stack::{FrameId, MASK_SUFFIX, parse_frame_id};

/// Per-pixel cell labels, 0 is background.
pub type LabelImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Stem suffix of the intensity image paired with a mask.
pub const INTENSITY_SUFFIX: &str = "_img";

/// Traced outlines this short are recorded as empty placeholders.
const MAX_PLACEHOLDER_POINTS: usize = 4;

/// One mask file with its intensity image, both of the same size.
#[derive(Debug, Clone)]
pub struct MaskArtifact {
    frame_id: FrameId,
    labels: LabelImage,
    intensity: GrayImage,
}

impl MaskArtifact {
    pub fn new(frame_id: FrameId, labels: LabelImage, intensity: GrayImage) -> Result<Self> {
        if labels.dimensions() != intensity.dimensions() {
            return Err(CellTrackError::input(
                frame_id.to_string(),
                format!(
                    "label image is {:?} but intensity image is {:?}",
                    labels.dimensions(),
                    intensity.dimensions()
                ),
            ));
        }
        Ok(Self {
            frame_id,
            labels,
            intensity,
        })
    }

    /// Read `<stem>_masks.<ext>` and its sibling `<stem>_img.<ext>`.
    ///
    /// # Errors
    /// `InputFormat` for a malformed name, a missing intensity image or
    /// mismatched sizes; `Io`/`Image` when a file cannot be read or decoded.
    pub fn load(mask_path: &Path) -> Result<Self> {
        let frame_id = parse_frame_id(mask_path)?;
        let labels = read_labels(mask_path)?;
        let intensity = read_image(&intensity_path(mask_path)?)?.into_luma8();
        Self::new(frame_id, labels, intensity).map_err(|err| match err {
            CellTrackError::InputFormat { reason, .. } => CellTrackError::input(mask_path, reason),
            other => other,
        })
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn size(&self) -> (u32, u32) {
        self.labels.dimensions()
    }

    pub fn labels(&self) -> &LabelImage {
        &self.labels
    }

    pub fn intensity(&self) -> &GrayImage {
        &self.intensity
    }

    pub fn into_intensity(self) -> GrayImage {
        self.intensity
    }

    /// Outline of every labelled cell, by ascending label value.
    ///
    /// Cells whose traced boundary has 4 points or fewer yield an empty outline.
    pub fn outlines(&self) -> Vec<Vec<Pixel>> {
        label_extents(&self.labels)
            .into_iter()
            .map(|(label, extent)| trace_outline(&self.labels, label, extent))
            .collect()
    }

    pub fn cell_frame(&self) -> CellFrame {
        CellFrame::build(self.outlines(), self.size(), self.frame_id)
    }
}

/// Locate the intensity image paired with `mask_path`.
pub fn intensity_path(mask_path: &Path) -> Result<PathBuf> {
    let stem = mask_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| CellTrackError::input(mask_path, "file name is not valid UTF-8"))?;
    let base = stem
        .len()
        .checked_sub(MASK_SUFFIX.len())
        .filter(|&cut| stem.is_char_boundary(cut) && stem[cut..].eq_ignore_ascii_case(MASK_SUFFIX))
        .map(|cut| &stem[..cut])
        .ok_or_else(|| CellTrackError::input(mask_path, "file stem does not end with _masks"))?;
    let wanted = format!("{base}{INTENSITY_SUFFIX}");

    let dir = match mask_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let entries = std::fs::read_dir(dir).map_err(|err| CellTrackError::io(dir, err))?;
    let mut candidates = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| CellTrackError::io(dir, err))?.path();
        let matches = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.eq_ignore_ascii_case(&wanted));
        if matches && path.is_file() {
            candidates.push(path);
        }
    }
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        CellTrackError::input(
            mask_path,
            format!("no intensity image {wanted}.* next to the mask"),
        )
    })
}

fn read_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .map_err(|err| CellTrackError::io(path, err))?
        .with_guessed_format()
        .map_err(|err| CellTrackError::io(path, err))?;
    Ok(reader.decode()?)
}

fn read_labels(path: &Path) -> Result<LabelImage> {
    Ok(match read_image(path)? {
        DynamicImage::ImageLuma16(labels) => labels,
        // Widen without rescaling so label values stay as written.
        DynamicImage::ImageLuma8(labels) => ImageBuffer::from_fn(labels.width(), labels.height(), |x, y| {
            Luma([u16::from(labels.get_pixel(x, y).0[0])])
        }),
        other => other.into_luma16(),
    })
}

/// Bounding box of every non-zero label.
fn label_extents(labels: &LabelImage) -> BTreeMap<u16, BoundingBox> {
    let mut extents: BTreeMap<u16, BoundingBox> = BTreeMap::new();
    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        let (x, y) = (x as i32, y as i32);
        extents
            .entry(label)
            .and_modify(|bbox| {
                bbox.min = (bbox.min.0.min(x), bbox.min.1.min(y));
                bbox.max = (bbox.max.0.max(x), bbox.max.1.max(y));
            })
            .or_insert(BoundingBox {
                min: (x, y),
                max: (x, y),
            });
    }
    extents
}

/// Longest outer boundary of `label`, traced on a padded crop around `extent`.
fn trace_outline(labels: &LabelImage, label: u16, extent: BoundingBox) -> Vec<Pixel> {
    let (x0, y0) = extent.min;
    let width = (extent.max.0 - x0 + 1) as u32;
    let height = (extent.max.1 - y0 + 1) as u32;

    // One background pixel of padding on every side keeps borders closed.
    let mask = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        let inside = (1..=width).contains(&x)
            && (1..=height).contains(&y)
            && labels.get_pixel(x - 1 + x0 as u32, y - 1 + y0 as u32).0[0] == label;
        Luma([if inside { 255 } else { 0 }])
    });

    let outline: Vec<Pixel> = find_contours::<i32>(&mask)
        .into_iter()
        .filter(|contour| contour.border_type == BorderType::Outer)
        .max_by_key(|contour| contour.points.len())
        .map(|contour| {
            contour
                .points
                .into_iter()
                .map(|point| (point.x + x0 - 1, point.y + y0 - 1))
                .collect()
        })
        .unwrap_or_default();

    if outline.len() <= MAX_PLACEHOLDER_POINTS {
        Vec::new()
    } else {
        outline
    }
}

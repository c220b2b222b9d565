// Annotation sources: where detector boxes and OCR regions come from
//
// The detector and the OCR engine are external. What they leave behind per image is
// a YOLO-style label file and an OCR document; a source turns both into ImageAnnotations.

use crate::config::PlanfuseConfig;
use crate::error::PlanfuseError;
use crate::geometry::PixelBox;
use crate::types::{DetectionBox, ImageAnnotations, OcrReading};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything that can hand out per-image annotations.
pub trait AnnotationSource {
    /// Image names in batch order.
    fn image_names(&self) -> Result<Vec<String>>;

    fn load(&self, image: &str) -> Result<ImageAnnotations>;
}

/// OCR collaborator output for one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrDocument {
    pub image: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub regions: Vec<OcrReading>,
}

impl OcrDocument {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read OCR document {}", path.display()))?;
        let document: OcrDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse OCR document {}", path.display()))?;
        Ok(document)
    }
}

/// Parse one label line `class_id cx cy w h [confidence]` against the image size.
///
/// Tokens after the confidence are ignored. Returns `None` for lines with fewer than
/// 5 fields, non-numeric fields, or boxes that collapse to nothing in pixel space.
pub fn parse_label_line(
    line: &str,
    width: u32,
    height: u32,
    config: &PlanfuseConfig,
) -> Option<DetectionBox> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 5 {
        return None;
    }
    let fields: Vec<f64> = tokens[..5]
        .iter()
        .map(|f| f.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    let confidence = match tokens.get(5) {
        Some(token) => token.parse::<f64>().ok()?,
        None => 1.0,
    };
    if fields[0] < 0.0 {
        return None;
    }

    let class_id = fields[0] as u32;
    let (cx, cy, w, h) = (fields[1], fields[2], fields[3], fields[4]);
    let (width, height) = (f64::from(width), f64::from(height));

    let bbox = PixelBox::new(
        ((cx - w / 2.0) * width) as i32,
        ((cy - h / 2.0) * height) as i32,
        ((cx + w / 2.0) * width) as i32,
        ((cy + h / 2.0) * height) as i32,
    );
    if !bbox.is_proper() {
        return None;
    }

    Some(DetectionBox {
        class_id,
        class_name: config.class_name(class_id),
        bbox,
        confidence,
    })
}

/// Parse a whole label file body; malformed lines are skipped.
pub fn parse_label_file(
    content: &str,
    width: u32,
    height: u32,
    config: &PlanfuseConfig,
) -> Vec<DetectionBox> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let parsed = parse_label_line(line, width, height, config);
            if parsed.is_none() {
                debug!("skipping label line '{}'", line.trim());
            }
            parsed
        })
        .collect()
}

/// Filesystem layout: `<ocr_dir>/<stem>.json` and `<labels_dir>/<stem>.txt`.
///
/// The batch is every stem that has an OCR document or a label file, in stem order.
/// Images named by an OCR document are listed once, under that name.
pub struct DirectorySource {
    labels_dir: PathBuf,
    ocr_dir: PathBuf,
    config: PlanfuseConfig,
}

impl DirectorySource {
    pub fn new(labels_dir: impl Into<PathBuf>, ocr_dir: impl Into<PathBuf>, config: PlanfuseConfig) -> Self {
        Self {
            labels_dir: labels_dir.into(),
            ocr_dir: ocr_dir.into(),
            config,
        }
    }

    fn ocr_documents(&self) -> Result<Vec<PathBuf>> {
        files_with_extension(&self.ocr_dir, "json")
            .with_context(|| format!("Failed to list OCR directory {}", self.ocr_dir.display()))
    }

    fn label_files(&self) -> Result<Vec<PathBuf>> {
        if !self.labels_dir.is_dir() {
            return Ok(Vec::new());
        }
        files_with_extension(&self.labels_dir, "txt")
            .with_context(|| format!("Failed to list labels directory {}", self.labels_dir.display()))
    }

    fn document_path(&self, image: &str) -> PathBuf {
        self.ocr_dir.join(format!("{}.json", stem_of(image)))
    }

    fn label_path(&self, image: &str) -> PathBuf {
        self.labels_dir.join(format!("{}.txt", stem_of(image)))
    }
}

impl AnnotationSource for DirectorySource {
    fn image_names(&self) -> Result<Vec<String>> {
        let mut by_stem: BTreeMap<String, String> = BTreeMap::new();
        for path in self.ocr_documents()? {
            let name = match OcrDocument::load_from_file(&path) {
                Ok(doc) => doc.image,
                // Still listed so the batch can warn about it by name.
                Err(_) => file_name_of(&path),
            };
            by_stem.insert(file_stem_of(&path), name);
        }
        // Labels without an OCR document are listed too; loading them reports the gap.
        for path in self.label_files()? {
            let stem = file_stem_of(&path);
            by_stem.entry(stem.clone()).or_insert(stem);
        }

        let mut seen = HashSet::new();
        let names = by_stem
            .into_values()
            .filter(|name| {
                let first = seen.insert(name.clone());
                if !first {
                    debug!("image {} is named by more than one OCR document", name);
                }
                first
            })
            .collect();
        Ok(names)
    }

    fn load(&self, image: &str) -> Result<ImageAnnotations> {
        let document_path = self.document_path(image);
        if !document_path.is_file() {
            return Err(PlanfuseError::MissingOcr {
                image: image.to_string(),
            }
            .into());
        }
        let document = OcrDocument::load_from_file(&document_path)?;
        if document.width == 0 || document.height == 0 {
            return Err(PlanfuseError::InvalidAnnotation {
                image: image.to_string(),
                reason: format!("image size {}x{}", document.width, document.height),
            }
            .into());
        }

        let label_path = self.label_path(image);
        if !label_path.is_file() {
            return Err(PlanfuseError::MissingLabels {
                image: image.to_string(),
            }
            .into());
        }
        let content = std::fs::read_to_string(&label_path)
            .with_context(|| format!("Failed to read labels {}", label_path.display()))?;
        let detections = parse_label_file(&content, document.width, document.height, &self.config);

        Ok(ImageAnnotations {
            image: image.to_string(),
            width: document.width,
            height: document.height,
            detections,
            readings: document.regions,
        })
    }
}

fn stem_of(image: &str) -> String {
    Path::new(image)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.to_string())
}

fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn file_stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

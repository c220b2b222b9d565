use crate::geometry::overlap_ratio;
use crate::types::{DetectionBox, OcrRegion};

/// The region that won a detection, with its overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMatch<'a> {
    pub region: &'a OcrRegion,
    pub overlap: f64,
}

/// Best-overlapping cleaned region for one detection.
///
/// A region must overlap strictly more than `threshold` and strictly more than the
/// best seen so far, so on equal overlap the earlier region keeps the match.
/// Regions without a cleaned keyword or without vertices never match.
pub fn best_region<'a>(
    detection: &DetectionBox,
    regions: &'a [OcrRegion],
    threshold: f64,
) -> Option<RegionMatch<'a>> {
    let mut best: Option<RegionMatch<'a>> = None;

    for region in regions {
        if region.text_clean.is_none() {
            continue;
        }
        let Some(region_box) = region.bounding_box() else {
            continue;
        };

        let overlap = overlap_ratio(&detection.bbox, &region_box);
        let best_overlap = best.map(|b| b.overlap).unwrap_or(0.0);
        if overlap > threshold && overlap > best_overlap {
            best = Some(RegionMatch { region, overlap });
        }
    }

    best
}

/// Winning region (or none) for every detection of one image, in detection order.
pub fn match_regions<'a>(
    detections: &[DetectionBox],
    regions: &'a [OcrRegion],
    threshold: f64,
) -> Vec<Option<RegionMatch<'a>>> {
    detections
        .iter()
        .map(|detection| best_region(detection, regions, threshold))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PixelBox;
    use crate::text::OcrKeyword;

    fn detection(x1: i32, y1: i32, x2: i32, y2: i32) -> DetectionBox {
        DetectionBox {
            class_id: 0,
            class_name: "exit".to_string(),
            bbox: PixelBox::new(x1, y1, x2, y2),
            confidence: 0.9,
        }
    }

    fn region(x1: f64, y1: f64, x2: f64, y2: f64, text: &str) -> OcrRegion {
        OcrRegion {
            polygon: vec![[x1, y1], [x2, y1], [x2, y2], [x1, y2]],
            text_raw: text.to_string(),
            text_clean: Some(OcrKeyword::Exit),
            score: 0.9,
        }
    }

    #[test]
    fn picks_highest_overlap_above_threshold() {
        let det = detection(0, 0, 100, 100);
        let regions = vec![
            region(50.0, 50.0, 150.0, 150.0, "weak"),
            region(5.0, 5.0, 95.0, 95.0, "strong"),
        ];
        let best = best_region(&det, &regions, 0.3).unwrap();
        assert_eq!(best.region.text_raw, "strong");
        assert!((best.overlap - 0.81).abs() < 1e-3);
    }

    #[test]
    fn nothing_above_threshold_means_no_match() {
        let det = detection(0, 0, 100, 100);
        let regions = vec![region(50.0, 50.0, 150.0, 150.0, "weak")];
        assert!(best_region(&det, &regions, 0.3).is_none());
    }

    #[test]
    fn equal_overlap_keeps_first_region() {
        let det = detection(0, 0, 100, 100);
        let regions = vec![
            region(0.0, 0.0, 100.0, 50.0, "first"),
            region(0.0, 50.0, 100.0, 100.0, "second"),
        ];
        let best = best_region(&det, &regions, 0.3).unwrap();
        assert_eq!(best.region.text_raw, "first");
    }

    #[test]
    fn uncleaned_regions_are_ignored() {
        let det = detection(0, 0, 100, 100);
        let mut noise = region(0.0, 0.0, 100.0, 100.0, "HYDRANT");
        noise.text_clean = None;
        assert!(best_region(&det, &[noise], 0.3).is_none());
    }

    #[test]
    fn one_result_per_detection() {
        let dets = vec![detection(0, 0, 100, 100), detection(500, 500, 600, 600)];
        let regions = vec![region(0.0, 0.0, 100.0, 100.0, "EXIT")];
        let matches = match_regions(&dets, &regions, 0.3);
        assert_eq!(matches.len(), 2);
        assert!(matches[0].is_some());
        assert!(matches[1].is_none());
    }
}

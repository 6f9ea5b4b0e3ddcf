use anyhow::{Context, Result};
use image::imageops;
use image::{ImageBuffer, Luma};
use img_hash::{HashAlg, HasherConfig, ImageHash};
use std::path::Path;

use crate::store::PhotoRecord;

/// Image analysis capability used by the photo handlers. Kept behind a trait
/// so the handlers can be exercised with stub scores and groupings.
pub trait ImageAnalyzer: Send + Sync {
    /// Average perceptual hash of the image at `path`, in base64 string form.
    fn ahash(&self, path: &Path) -> Result<String>;

    /// Sharpness estimate; higher means sharper.
    fn blur_score(&self, path: &Path) -> Result<f64>;

    /// Partition records into visual-similarity groups. Group order is
    /// first-seen order and members keep their input order.
    fn group_similar(&self, records: &[PhotoRecord]) -> Vec<Vec<String>>;
}

pub struct PerceptualAnalyzer {
    hash_size: u32,
    similarity_threshold: u32,
}

const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

impl PerceptualAnalyzer {
    pub fn new(hash_size: u32, similarity_threshold: u32) -> Self {
        Self {
            hash_size,
            similarity_threshold,
        }
    }

    fn hasher(&self) -> img_hash::Hasher {
        HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .hash_size(self.hash_size, self.hash_size)
            .to_hasher()
    }
}

impl ImageAnalyzer for PerceptualAnalyzer {
    fn ahash(&self, path: &Path) -> Result<String> {
        // img_hash carries its own image-crate version; load through its
        // re-export so the pixel types line up.
        let img = img_hash::image::open(path)
            .with_context(|| format!("failed to load image {}", path.display()))?;
        Ok(self.hasher().hash_image(&img).to_base64())
    }

    fn blur_score(&self, path: &Path) -> Result<f64> {
        let gray = image::open(path)
            .with_context(|| format!("failed to load image {}", path.display()))?
            .to_luma32f();
        let response: ImageBuffer<Luma<f32>, Vec<f32>> = imageops::filter3x3(&gray, &LAPLACIAN);
        Ok(variance(response.as_raw()))
    }

    fn group_similar(&self, records: &[PhotoRecord]) -> Vec<Vec<String>> {
        let mut groups: Vec<(Option<ImageHash>, Vec<String>)> = Vec::new();

        'records: for rec in records {
            // A hash that no longer parses can never match anything; the
            // record still gets represented, as its own group.
            let hash = ImageHash::from_base64(&rec.ahash).ok();

            if let Some(ref h) = hash {
                for (anchor, members) in groups.iter_mut() {
                    if let Some(a) = anchor {
                        if a.dist(h) <= self.similarity_threshold {
                            members.push(rec.filename.clone());
                            continue 'records;
                        }
                    }
                }
            }
            groups.push((hash, vec![rec.filename.clone()]));
        }

        groups.into_iter().map(|(_, members)| members).collect()
    }
}

/// Variance of the Laplacian response, the usual sharpness proxy: flat or
/// blurred images produce a near-constant response, sharp edges spread it.
fn variance(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|v| f64::from(*v)).sum::<f64>() / n;
    values
        .iter()
        .map(|v| {
            let d = f64::from(*v) - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

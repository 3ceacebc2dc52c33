use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{info, warn};

use super::map::AdjointMap;
use super::persist::{region_name, write_json_new};
use crate::types::{Result, SegmentId};

/// A segment id present in more than one merged region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Collision {
    /// The duplicated id.
    pub id: SegmentId,
    /// Region whose entry was kept.
    pub kept_from: String,
    /// Region whose entry was discarded.
    pub dropped_from: String,
}

/// Summary of a completed merge.
#[derive(Clone, Debug, Serialize)]
pub struct MergeReport {
    /// Written file.
    pub output: PathBuf,
    /// Number of region dictionaries merged.
    pub regions: usize,
    /// Number of entries in the merged dictionary.
    pub segments: usize,
    /// Ids found in more than one region.
    pub collisions: Vec<Collision>,
}

/// Result of [`merge_regions`].
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// The merged dictionary was written.
    Merged(MergeReport),
    /// The output already existed; no input was read.
    Skipped {
        /// Existing file.
        output: PathBuf,
    },
}

/// Unions labelled dictionaries in iteration order.
///
/// The first entry seen for an id wins; later ones are reported as
/// collisions.
pub fn merge_maps<I>(maps: I) -> (AdjointMap, Vec<Collision>)
where
    I: IntoIterator<Item = (String, AdjointMap)>,
{
    let mut merged = AdjointMap::new();
    let mut labels: Vec<String> = Vec::new();
    let mut owner_of: FxHashMap<SegmentId, usize> = FxHashMap::default();
    let mut collisions = Vec::new();

    for (label, map) in maps {
        let label_idx = labels.len();
        labels.push(label);
        for (id, chain) in map.iter() {
            match owner_of.get(&id) {
                Some(&kept) => collisions.push((id, kept, label_idx)),
                None => {
                    owner_of.insert(id, label_idx);
                    merged.insert(id, chain.to_vec());
                }
            }
        }
    }

    let collisions = collisions
        .into_iter()
        .map(|(id, kept, dropped)| Collision {
            id,
            kept_from: labels[kept].clone(),
            dropped_from: labels[dropped].clone(),
        })
        .collect();
    (merged, collisions)
}

/// Merges per-region dictionary files into a single file at `output`.
///
/// Inputs are loaded in parallel and merged in the order given. Nothing is
/// read when `output` already exists.
///
/// # Errors
///
/// Fails if any input cannot be read or decoded, or the output cannot be
/// written.
pub fn merge_regions(inputs: &[PathBuf], output: &Path) -> Result<MergeOutcome> {
    if output.exists() {
        info!(output = %output.display(), "merged output already present, skipping");
        return Ok(MergeOutcome::Skipped {
            output: output.to_path_buf(),
        });
    }

    let maps = inputs
        .par_iter()
        .map(|path| Ok((region_name(path), AdjointMap::read_json(path)?)))
        .collect::<Result<Vec<_>>>()?;

    let regions = maps.len();
    let (merged, collisions) = merge_maps(maps);
    if !collisions.is_empty() {
        warn!(
            collisions = collisions.len(),
            first = collisions[0].id,
            "segment ids present in more than one region; kept the first"
        );
    }

    if !write_json_new(output, &merged)? {
        return Ok(MergeOutcome::Skipped {
            output: output.to_path_buf(),
        });
    }
    info!(
        output = %output.display(),
        regions,
        segments = merged.len(),
        "merged region dictionaries"
    );
    Ok(MergeOutcome::Merged(MergeReport {
        output: output.to_path_buf(),
        regions,
        segments: merged.len(),
        collisions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(SegmentId, Vec<SegmentId>)>) -> AdjointMap {
        entries.into_iter().collect()
    }

    #[test]
    fn disjoint_maps_are_unioned_in_order() {
        let (merged, collisions) = merge_maps(vec![
            ("a".to_string(), map(vec![(1, vec![1]), (2, vec![2, 1])])),
            ("b".to_string(), map(vec![(10, vec![10])])),
        ]);
        assert_eq!(merged.keys(), &[1, 2, 10]);
        assert!(collisions.is_empty());
    }

    #[test]
    fn first_region_wins_on_collision() {
        let (merged, collisions) = merge_maps(vec![
            ("a".to_string(), map(vec![(1, vec![1, 2])])),
            ("b".to_string(), map(vec![(1, vec![1]), (3, vec![3])])),
        ]);
        assert_eq!(merged.get(1), Some(&[1, 2][..]));
        assert_eq!(merged.len(), 2);
        assert_eq!(
            collisions,
            vec![Collision {
                id: 1,
                kept_from: "a".into(),
                dropped_from: "b".into(),
            }]
        );
    }
}

use crate::sequence::Candidate;
use std::collections::HashSet;

/// Default largest ID step that keeps two candidates in one cluster
pub const DEFAULT_GAP_TOLERANCE: u64 = 1;

/// Recovers the ordered content sequence from a noisy candidate set
///
/// Assets uploaded together (one chapter's pages) get a tight block of
/// consecutive storage IDs, while unrelated site assets sit far away in the
/// ID space. The largest run of adjacent IDs is therefore taken as the
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceReconstructor {
    gap_tolerance: u64,
}

impl Default for SequenceReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_TOLERANCE)
    }
}

/// A deduplicated candidate that has an ID
#[derive(Debug, Clone, Copy)]
struct Placed<'c> {
    url: &'c str,
    id: u64,
    page_number: Option<u32>,
}

impl SequenceReconstructor {
    pub fn new(gap_tolerance: u64) -> Self {
        Self { gap_tolerance }
    }

    pub fn gap_tolerance(&self) -> u64 {
        self.gap_tolerance
    }

    /// Returns the URLs of the dominant cluster in reading order
    ///
    /// # Algorithm
    ///
    /// 1. Drop repeated URLs (first occurrence wins) and candidates without an ID
    /// 2. Sort by numeric ID
    /// 3. Split wherever consecutive IDs differ by more than the gap tolerance
    /// 4. Keep the largest cluster; on a tie, the one with the lowest IDs
    /// 5. Order by page number if every member has one, otherwise by ID
    ///
    /// Never fails: no usable candidate yields an empty list. Colliding page
    /// numbers are kept in ID order without further checks.
    ///
    /// # Example
    ///
    /// ```
    /// use page_sieve::sequence::{Candidate, SequenceReconstructor};
    ///
    /// let candidates = vec![
    ///     Candidate::new("https://cdn.example.com/media/11/b.webp", 11),
    ///     Candidate::new("https://cdn.example.com/media/3/logo.webp", 3),
    ///     Candidate::new("https://cdn.example.com/media/10/a.webp", 10),
    /// ];
    ///
    /// let pages = SequenceReconstructor::default().reconstruct(&candidates);
    /// assert_eq!(
    ///     pages,
    ///     vec![
    ///         "https://cdn.example.com/media/10/a.webp",
    ///         "https://cdn.example.com/media/11/b.webp",
    ///     ]
    /// );
    /// ```
    pub fn reconstruct(&self, candidates: &[Candidate]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut placed: Vec<Placed<'_>> = candidates
            .iter()
            .filter(|candidate| seen.insert(candidate.url.as_str()))
            .filter_map(|candidate| {
                candidate.numeric_id.map(|id| Placed {
                    url: &candidate.url,
                    id,
                    page_number: candidate.page_number,
                })
            })
            .collect();

        if placed.is_empty() {
            return Vec::new();
        }

        placed.sort_by_key(|p| p.id);

        let mut cluster_count = 0usize;
        let mut dominant: &[Placed<'_>] = &[];
        for cluster in split_clusters(&placed, self.gap_tolerance) {
            cluster_count += 1;
            if cluster.len() > dominant.len() {
                dominant = cluster;
            }
        }

        tracing::debug!(
            "{} candidates form {} clusters, largest has {}",
            placed.len(),
            cluster_count,
            dominant.len()
        );

        let mut ordered = dominant.to_vec();
        if ordered.iter().all(|p| p.page_number.is_some()) {
            ordered.sort_by_key(|p| p.page_number);
        }

        ordered.into_iter().map(|p| p.url.to_string()).collect()
    }
}

/// Maximal runs of an ID-sorted slice whose neighbours differ by at most `gap_tolerance`
fn split_clusters<'s, 'c>(
    sorted: &'s [Placed<'c>],
    gap_tolerance: u64,
) -> impl Iterator<Item = &'s [Placed<'c>]> {
    sorted.chunk_by(move |prev, next| next.id.saturating_sub(prev.id) <= gap_tolerance)
}

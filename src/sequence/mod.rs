//! Sequence reconstruction
//!
//! Given the candidate asset references found in one page, recover the
//! contiguous, ordered subsequence that is the actual content. Pure and
//! synchronous; safe to call from any number of tasks at once.

mod candidate;
mod reconstruct;

pub use candidate::Candidate;
pub use reconstruct::{SequenceReconstructor, DEFAULT_GAP_TOLERANCE};

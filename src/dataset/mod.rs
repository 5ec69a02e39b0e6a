//! Dataset module for CIFAR-10 data handling
//!
//! This module provides:
//! - Downloading and decoding the CIFAR-10 binary distribution
//! - The fixed per-channel normalization shared by training and inference
//! - A Burn batcher producing normalized image tensors
//! - A restartable, optionally shuffled batch loader
//!
//! Images are kept as raw channel-major bytes until they are batched, so the whole
//! training split (50 000 × 3072 bytes) stays comfortably in memory.

pub mod batcher;
pub mod cifar10;
pub mod loader;
pub mod normalize;

// Re-export main types for convenience
pub use batcher::{Cifar10Batch, Cifar10Batcher};
pub use cifar10::{Cifar10Dataset, Cifar10Item};
pub use loader::{BatchIter, BatchLoader};
pub use normalize::Normalizer;

/// Number of classes in CIFAR-10
pub const NUM_CLASSES: usize = 10;

/// Image side length in pixels
pub const IMAGE_SIZE: usize = 32;

/// Number of color channels
pub const CHANNELS: usize = 3;

/// Bytes per image (3 × 32 × 32)
pub const IMAGE_BYTES: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// Class names, indexed by label
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "plane", "car", "bird", "cat", "deer", "dog", "frog", "horse", "ship", "truck",
];

/// Train or test half of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name() {
        assert_eq!(class_name(0), Some("plane"));
        assert_eq!(class_name(9), Some("truck"));
        assert_eq!(class_name(10), None);
    }

    #[test]
    fn test_image_bytes() {
        assert_eq!(IMAGE_BYTES, 3072);
    }
}

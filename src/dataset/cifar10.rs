//! CIFAR-10 dataset loader
//!
//! Downloads the binary distribution from the Toronto mirror, unpacks it and
//! decodes the fixed-size records. CIFAR-10 consists of 60,000 32x32 color images in
//! 10 classes: 50,000 for training (5 files) and 10,000 for testing (1 file).

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Split, IMAGE_BYTES, NUM_CLASSES};
use crate::utils::error::{ClassifierError, Result};

const URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";
const ARCHIVE_NAME: &str = "cifar-10-binary.tar.gz";
const EXTRACTED_DIR: &str = "cifar-10-batches-bin";
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";

/// One record: label byte followed by the red, green and blue planes
const RECORD_SIZE: usize = 1 + IMAGE_BYTES;
const RECORDS_PER_FILE: usize = 10_000;

/// A single labeled image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cifar10Item {
    /// Raw pixels in CHW order (3072 bytes: R plane, G plane, B plane)
    pub image: Vec<u8>,
    /// Class label (0-9)
    pub label: usize,
}

impl Cifar10Item {
    pub fn new(image: Vec<u8>, label: usize) -> Self {
        Self { image, label }
    }
}

/// CIFAR-10 split held in memory
#[derive(Clone, Debug)]
pub struct Cifar10Dataset {
    items: Vec<Cifar10Item>,
}

impl Cifar10Dataset {
    /// Download (optionally) and load one split from `root`
    pub fn new(root: impl AsRef<Path>, split: Split, download: bool) -> Result<Self> {
        let root = root.as_ref();
        if download {
            Self::download(root)?;
        }
        Self::load(root, split)
    }

    /// Build a dataset from items already in memory
    pub fn from_items(items: Vec<Cifar10Item>) -> Result<Self> {
        for (i, item) in items.iter().enumerate() {
            if item.image.len() != IMAGE_BYTES {
                return Err(ClassifierError::InvalidInput(format!(
                    "item {} has {} bytes, expected {}",
                    i,
                    item.image.len(),
                    IMAGE_BYTES
                )));
            }
            if item.label >= NUM_CLASSES {
                return Err(ClassifierError::InvalidInput(format!(
                    "item {} has label {}, expected < {}",
                    i, item.label, NUM_CLASSES
                )));
            }
        }
        Ok(Self { items })
    }

    /// Load a split from an already extracted distribution
    pub fn load(root: impl AsRef<Path>, split: Split) -> Result<Self> {
        let dir = root.as_ref().join(EXTRACTED_DIR);
        let files: Vec<&str> = match split {
            Split::Train => TRAIN_FILES.to_vec(),
            Split::Test => vec![TEST_FILE],
        };

        let mut items = Vec::with_capacity(files.len() * RECORDS_PER_FILE);
        for name in files {
            let path = dir.join(name);
            let mut buffer = Vec::new();
            File::open(&path)
                .and_then(|mut f| f.read_to_end(&mut buffer))
                .map_err(|e| ClassifierError::Decode(path.clone(), e.to_string()))?;

            items.extend(decode_records(&buffer, &path)?);
            debug!("Decoded {}", path.display());
        }

        info!("Loaded {} {} images from {}", items.len(), split, dir.display());
        Ok(Self { items })
    }

    /// Fetch and unpack the archive into `root`, skipping steps already done
    pub fn download(root: impl AsRef<Path>) -> Result<PathBuf> {
        let root = root.as_ref();
        let extracted = root.join(EXTRACTED_DIR);
        if extracted.exists() {
            debug!("CIFAR-10 already extracted at {}", extracted.display());
            return Ok(extracted);
        }

        fs::create_dir_all(root)?;
        let archive = root.join(ARCHIVE_NAME);

        if !archive.exists() {
            info!("Downloading CIFAR-10 from {}", URL);
            let bytes = reqwest::blocking::get(URL)
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.bytes())
                .map_err(|e| ClassifierError::Download {
                    url: URL.to_string(),
                    reason: e.to_string(),
                })?;

            // Write to a temporary name so an interrupted download is not mistaken
            // for a complete archive next time.
            let partial = root.join(format!("{}.part", ARCHIVE_NAME));
            File::create(&partial)?.write_all(&bytes)?;
            fs::rename(&partial, &archive)?;
            info!("Download complete ({} bytes)", bytes.len());
        }

        info!("Extracting {}", archive.display());
        let decoder = GzDecoder::new(File::open(&archive)?);
        tar::Archive::new(decoder)
            .unpack(root)
            .map_err(|e| ClassifierError::Decode(archive.clone(), e.to_string()))?;

        Ok(extracted)
    }

    /// Items in dataset order
    pub fn items(&self) -> &[Cifar10Item] {
        &self.items
    }

    /// Count of items per class
    pub fn class_distribution(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0; NUM_CLASSES];
        for item in &self.items {
            counts[item.label] += 1;
        }
        counts
    }
}

impl Dataset<Cifar10Item> for Cifar10Dataset {
    fn get(&self, index: usize) -> Option<Cifar10Item> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Decode a buffer of fixed-size binary records
pub fn decode_records(buffer: &[u8], path: &Path) -> Result<Vec<Cifar10Item>> {
    if buffer.is_empty() || buffer.len() % RECORD_SIZE != 0 {
        return Err(ClassifierError::Decode(
            path.to_path_buf(),
            format!(
                "size {} is not a multiple of the {}-byte record size",
                buffer.len(),
                RECORD_SIZE
            ),
        ));
    }

    buffer
        .chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0] as usize;
            if label >= NUM_CLASSES {
                return Err(ClassifierError::Decode(
                    path.to_path_buf(),
                    format!("record {} has label {}", i, label),
                ));
            }
            Ok(Cifar10Item::new(record[1..].to_vec(), label))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut r = vec![label];
        r.extend(std::iter::repeat(fill).take(IMAGE_BYTES));
        r
    }

    #[test]
    fn test_decode_records() {
        let mut buffer = record(3, 10);
        buffer.extend(record(9, 200));

        let items = decode_records(&buffer, Path::new("test_batch.bin")).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, 3);
        assert_eq!(items[1].label, 9);
        assert_eq!(items[1].image.len(), IMAGE_BYTES);
        assert!(items[1].image.iter().all(|&p| p == 200));
    }

    #[test]
    fn test_decode_rejects_truncated_file() {
        let mut buffer = record(1, 0);
        buffer.pop();
        let err = decode_records(&buffer, Path::new("bad.bin")).unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_, _)));
    }

    #[test]
    fn test_decode_rejects_out_of_range_label() {
        let buffer = record(10, 0);
        assert!(decode_records(&buffer, Path::new("bad.bin")).is_err());
    }

    #[test]
    fn test_load_test_split_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let batches = dir.path().join(EXTRACTED_DIR);
        fs::create_dir_all(&batches).unwrap();

        let mut buffer = Vec::new();
        for label in 0..10u8 {
            buffer.extend(record(label, label * 20));
        }
        fs::write(batches.join(TEST_FILE), &buffer).unwrap();

        // Extracted directory exists, so no network access happens
        let dataset = Cifar10Dataset::new(dir.path(), Split::Test, true).unwrap();
        assert_eq!(dataset.len(), 10);
        assert_eq!(dataset.get(4).unwrap().label, 4);
        assert_eq!(dataset.class_distribution(), [1; NUM_CLASSES]);
    }

    #[test]
    fn test_missing_split_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Cifar10Dataset::load(dir.path(), Split::Train).unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_, _)));
    }

    #[test]
    fn test_from_items_validates_shape_and_label() {
        assert!(Cifar10Dataset::from_items(vec![Cifar10Item::new(vec![0; 10], 0)]).is_err());
        assert!(Cifar10Dataset::from_items(vec![Cifar10Item::new(vec![0; IMAGE_BYTES], 10)]).is_err());

        let ok = Cifar10Dataset::from_items(vec![Cifar10Item::new(vec![0; IMAGE_BYTES], 2)]).unwrap();
        assert_eq!(ok.len(), 1);
    }
}

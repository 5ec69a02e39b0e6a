//! Restartable batch iteration over an in-memory split
//!
//! Batches are assembled lazily from a per-epoch index order. With shuffling enabled the
//! order is derived from `(seed, epoch)`, so the same epoch always visits samples in the
//! same order and the loader can be re-iterated freely.
//!
//! With workers enabled, batch `k` of a pass is built on worker `k % workers` and the
//! consumer reads the workers round-robin, so the batch sequence is the same as with
//! inline loading.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::{Cifar10Batch, Cifar10Batcher, Cifar10Dataset};

/// Batches each worker may hold ready before the consumer catches up
const PREFETCH_PER_WORKER: usize = 2;

/// Produces batches for one split
pub struct BatchLoader<B: Backend> {
    dataset: Arc<Cifar10Dataset>,
    batcher: Cifar10Batcher,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    num_workers: usize,
    device: B::Device,
}

impl<B: Backend> BatchLoader<B> {
    /// Sequential loader; `batch_size` is clamped to at least 1
    pub fn new(
        dataset: Arc<Cifar10Dataset>,
        batcher: Cifar10Batcher,
        batch_size: usize,
        device: B::Device,
    ) -> Self {
        Self {
            dataset,
            batcher,
            batch_size: batch_size.max(1),
            shuffle: false,
            seed: 0,
            num_workers: 0,
            device,
        }
    }

    /// Reorder samples every epoch from a seeded generator
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    /// Assemble batches on `num_workers` background threads; 0 loads inline
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn dataset(&self) -> &Cifar10Dataset {
        &self.dataset
    }

    pub fn batcher(&self) -> &Cifar10Batcher {
        &self.batcher
    }

    /// Batches per pass; the final partial batch counts
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Sample order for one epoch
    pub fn epoch_indices(&self, epoch: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            indices.shuffle(&mut rng);
        }
        indices
    }

    /// Sample indices of every batch of one epoch
    fn epoch_chunks(&self, epoch: usize) -> Vec<Vec<usize>> {
        self.epoch_indices(epoch)
            .chunks(self.batch_size)
            .map(<[usize]>::to_vec)
            .collect()
    }

    /// Start a fresh pass for the given epoch
    pub fn iter(&self, epoch: usize) -> BatchIter<'_, B> {
        let chunks = self.epoch_chunks(epoch);
        let remaining = chunks.len();
        let workers = self.num_workers.min(remaining);

        let source = if workers == 0 {
            Source::Inline {
                loader: self,
                chunks,
                position: 0,
            }
        } else {
            debug!("Prefetching {} batches on {} workers", remaining, workers);
            Source::Prefetch {
                receivers: self.spawn_workers(Arc::new(chunks), workers),
                next: 0,
            }
        };

        BatchIter { source, remaining }
    }

    fn spawn_workers(&self, chunks: Arc<Vec<Vec<usize>>>, workers: usize) -> Vec<Receiver<Cifar10Batch<B>>> {
        (0..workers)
            .map(|worker| {
                let (sender, receiver) = mpsc::sync_channel(PREFETCH_PER_WORKER);
                let chunks = Arc::clone(&chunks);
                let dataset = Arc::clone(&self.dataset);
                let batcher = self.batcher.clone();
                let device = self.device.clone();

                // Exits once its share is sent or the iterator is dropped
                thread::spawn(move || {
                    for chunk in chunks.iter().skip(worker).step_by(workers) {
                        let batch = build_batch::<B>(&dataset, &batcher, chunk, &device);
                        if sender.send(batch).is_err() {
                            break;
                        }
                    }
                });

                receiver
            })
            .collect()
    }
}

fn build_batch<B: Backend>(
    dataset: &Cifar10Dataset,
    batcher: &Cifar10Batcher,
    chunk: &[usize],
    device: &B::Device,
) -> Cifar10Batch<B> {
    let items: Vec<_> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
    Batcher::<B, _, _>::batch(batcher, items, device)
}

enum Source<'a, B: Backend> {
    Inline {
        loader: &'a BatchLoader<B>,
        chunks: Vec<Vec<usize>>,
        position: usize,
    },
    Prefetch {
        receivers: Vec<Receiver<Cifar10Batch<B>>>,
        next: usize,
    },
}

/// One pass over a [`BatchLoader`]
pub struct BatchIter<'a, B: Backend> {
    source: Source<'a, B>,
    remaining: usize,
}

impl<B: Backend> Iterator for BatchIter<'_, B> {
    type Item = Cifar10Batch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let batch = match &mut self.source {
            Source::Inline {
                loader,
                chunks,
                position,
            } => {
                let chunk = chunks.get(*position)?;
                *position += 1;
                build_batch::<B>(&loader.dataset, &loader.batcher, chunk, &loader.device)
            }
            Source::Prefetch { receivers, next } => {
                let receiver = receivers.get(*next % receivers.len())?;
                *next += 1;
                receiver.recv().ok()?
            }
        };

        self.remaining -= 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<B: Backend> ExactSizeIterator for BatchIter<'_, B> {}

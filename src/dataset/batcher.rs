//! Burn batcher for CIFAR-10 items

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::{ElementConversion, TensorData},
};

use super::{Cifar10Item, Normalizer, CHANNELS, IMAGE_SIZE};

/// A batch of normalized images and their labels
#[derive(Clone, Debug)]
pub struct Cifar10Batch<B: Backend> {
    /// Images with shape `[N, 3, 32, 32]`
    pub images: Tensor<B, 4>,
    /// Labels with shape `[N]`
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Cifar10Batch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stacks items into tensors and applies the fixed normalization
#[derive(Clone, Debug, Default)]
pub struct Cifar10Batcher {
    normalizer: Normalizer,
}

impl Cifar10Batcher {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

impl<B: Backend> Batcher<B, Cifar10Item, Cifar10Batch<B>> for Cifar10Batcher {
    fn batch(&self, items: Vec<Cifar10Item>, device: &B::Device) -> Cifar10Batch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().map(|&p| p as f32 / 255.0))
            .collect();

        let labels: Vec<B::IntElem> = items
            .iter()
            .map(|item| (item.label as i64).elem::<B::IntElem>())
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        );
        let images = self.normalizer.normalize_tensor(images);

        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);

        Cifar10Batch { images, targets }
    }
}

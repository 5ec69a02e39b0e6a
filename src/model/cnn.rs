//! CNN architecture for CIFAR-10 classification
//!
//! A small LeNet-style network: two convolution + max-pool stages followed by three
//! fully connected layers. Input is a normalized `[N, 3, 32, 32]` batch, output is one
//! score per class.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::dataset::CHANNELS;

const CONV1_FILTERS: usize = 6;
const CONV2_FILTERS: usize = 16;
const KERNEL_SIZE: usize = 5;
/// Spatial size after both conv + pool stages: 32 → 28 → 14 → 10 → 5
const FEATURE_SIZE: usize = 5;
const FLAT_FEATURES: usize = CONV2_FILTERS * FEATURE_SIZE * FEATURE_SIZE;
const FC1_UNITS: usize = 100;
const FC2_UNITS: usize = 84;

/// Configuration for [`Cifar10Net`]
#[derive(Config, Debug)]
pub struct Cifar10NetConfig {
    /// Number of output classes
    #[config(default = "10")]
    pub num_classes: usize,

    /// Clamp the final scores at zero
    ///
    /// Saved parameters only reproduce their outputs with the setting they were trained with.
    #[config(default = "true")]
    pub relu_on_logits: bool,
}

impl Default for Cifar10NetConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Cifar10NetConfig {
    /// Create a new model instance from this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> Cifar10Net<B> {
        Cifar10Net::new(self, device)
    }

    /// Parameter shapes the fixed topology requires, in declaration order
    pub fn expected_layer_shapes(&self) -> Vec<(String, Vec<usize>)> {
        vec![
            ("conv1.weight".into(), vec![CONV1_FILTERS, CHANNELS, KERNEL_SIZE, KERNEL_SIZE]),
            ("conv1.bias".into(), vec![CONV1_FILTERS]),
            ("conv2.weight".into(), vec![CONV2_FILTERS, CONV1_FILTERS, KERNEL_SIZE, KERNEL_SIZE]),
            ("conv2.bias".into(), vec![CONV2_FILTERS]),
            ("fc1.weight".into(), vec![FLAT_FEATURES, FC1_UNITS]),
            ("fc1.bias".into(), vec![FC1_UNITS]),
            ("fc2.weight".into(), vec![FC1_UNITS, FC2_UNITS]),
            ("fc2.bias".into(), vec![FC2_UNITS]),
            ("fc3.weight".into(), vec![FC2_UNITS, self.num_classes]),
            ("fc3.bias".into(), vec![self.num_classes]),
        ]
    }
}

/// CIFAR-10 classifier
///
/// Architecture:
/// - conv1 3→6 (5×5) → ReLU → max-pool 2×2
/// - conv2 6→16 (5×5) → ReLU → max-pool 2×2
/// - flatten 16·5·5 → fc1 (100) → ReLU → fc2 (84) → ReLU → fc3 (classes)
/// - optional ReLU on the scores
#[derive(Module, Debug)]
pub struct Cifar10Net<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pool: MaxPool2d,
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub fc3: Linear<B>,
    activation: Relu,
    relu_on_logits: bool,
}

impl<B: Backend> Cifar10Net<B> {
    /// Create a new network with randomly initialized parameters
    pub fn new(config: &Cifar10NetConfig, device: &B::Device) -> Self {
        let conv1 = Conv2dConfig::new([CHANNELS, CONV1_FILTERS], [KERNEL_SIZE, KERNEL_SIZE]).init(device);
        let conv2 = Conv2dConfig::new([CONV1_FILTERS, CONV2_FILTERS], [KERNEL_SIZE, KERNEL_SIZE]).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        let fc1 = LinearConfig::new(FLAT_FEATURES, FC1_UNITS).init(device);
        let fc2 = LinearConfig::new(FC1_UNITS, FC2_UNITS).init(device);
        let fc3 = LinearConfig::new(FC2_UNITS, config.num_classes).init(device);

        Self {
            conv1,
            conv2,
            pool,
            fc1,
            fc2,
            fc3,
            activation: Relu::new(),
            relu_on_logits: config.relu_on_logits,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Normalized images of shape [batch_size, 3, 32, 32]
    ///
    /// # Returns
    /// * Scores of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(x)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));

        let [batch_size, _, _, _] = x.dims();
        let x = x.reshape([batch_size, FLAT_FEATURES]);

        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.activation.forward(self.fc2.forward(x));
        let x = self.fc3.forward(x);

        if self.relu_on_logits {
            self.activation.forward(x)
        } else {
            x
        }
    }

    /// Index of the highest score per sample
    pub fn predict(&self, x: Tensor<B, 4>) -> Tensor<B, 1, burn::tensor::Int> {
        self.forward(x).argmax(1).squeeze::<1>(1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.fc3.weight.val().dims()[1]
    }

    /// Whether the scores pass through a final ReLU
    pub fn relu_on_logits(&self) -> bool {
        self.relu_on_logits
    }

    /// Actual parameter shapes, in the same order as
    /// [`Cifar10NetConfig::expected_layer_shapes`]
    pub fn layer_shapes(&self) -> Vec<(String, Vec<usize>)> {
        fn bias_dims<B: Backend>(bias: &Option<burn::module::Param<Tensor<B, 1>>>) -> Vec<usize> {
            bias.as_ref().map(|b| b.val().dims().to_vec()).unwrap_or_default()
        }

        vec![
            ("conv1.weight".into(), self.conv1.weight.val().dims().to_vec()),
            ("conv1.bias".into(), bias_dims(&self.conv1.bias)),
            ("conv2.weight".into(), self.conv2.weight.val().dims().to_vec()),
            ("conv2.bias".into(), bias_dims(&self.conv2.bias)),
            ("fc1.weight".into(), self.fc1.weight.val().dims().to_vec()),
            ("fc1.bias".into(), bias_dims(&self.fc1.bias)),
            ("fc2.weight".into(), self.fc2.weight.val().dims().to_vec()),
            ("fc2.bias".into(), bias_dims(&self.fc2.bias)),
            ("fc3.weight".into(), self.fc3.weight.val().dims().to_vec()),
            ("fc3.bias".into(), bias_dims(&self.fc3.bias)),
        ]
    }

    /// Text description of the layer graph
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Cifar10Net".to_string(),
            format!("  input            [N, {}, 32, 32]", CHANNELS),
            format!("  conv1 + relu     [N, {}, 28, 28]", CONV1_FILTERS),
            format!("  maxpool 2x2      [N, {}, 14, 14]", CONV1_FILTERS),
            format!("  conv2 + relu     [N, {}, 10, 10]", CONV2_FILTERS),
            format!("  maxpool 2x2      [N, {}, {}, {}]", CONV2_FILTERS, FEATURE_SIZE, FEATURE_SIZE),
            format!("  flatten          [N, {}]", FLAT_FEATURES),
            format!("  fc1 + relu       [N, {}]", FC1_UNITS),
            format!("  fc2 + relu       [N, {}]", FC2_UNITS),
            format!(
                "  fc3{}      [N, {}]",
                if self.relu_on_logits { " + relu" } else { "       " },
                self.num_classes()
            ),
            String::new(),
            "Parameters".to_string(),
        ];

        for (name, shape) in self.layer_shapes() {
            lines.push(format!("  {:<14} {:?}", name, shape));
        }
        lines.push(format!("  total          {}", self.num_params()));

        lines.join("\n")
    }
}

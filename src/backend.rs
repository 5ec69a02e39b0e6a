//! Backend abstraction
//!
//! Device placement is decided once at compile time: NdArray (CPU) by default,
//! WGPU when the `wgpu` feature is enabled.

use burn::backend::Autodiff;

// --------------------------------------------------------------------------------
// BACKEND SELECTION: WGPU (opt-in) or NdArray (default)
// --------------------------------------------------------------------------------

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn_ndarray::NdArray<f32>;

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Get the default device
pub fn default_device() -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    <DefaultBackend as burn::tensor::backend::Backend>::Device::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "WGPU (GPU)"
    }

    #[cfg(not(feature = "wgpu"))]
    {
        "NdArray (CPU)"
    }
}

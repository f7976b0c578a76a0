//! Weight and priority vector seam.
//!
//! Priorities enter the buffer and importance weights leave it as flat,
//! rank-1, 32-bit float vectors. The buffer does not mandate a tensor
//! library; it requires only the handful of operations below, so a plain
//! `Vec<f32>` works out of the box and tensor backends can plug in their
//! own type.

use std::fmt;
use std::str::FromStr;

/// Target device for importance weight vectors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Device {
    /// Host memory.
    #[default]
    Cpu,
    /// CUDA device with the given index.
    Cuda(usize),
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            other => match other.strip_prefix("cuda:") {
                Some(idx) => idx
                    .parse()
                    .map(Device::Cuda)
                    .map_err(|_| format!("invalid cuda index in device '{}'", other)),
                None => Err(format!("unknown device '{}'", other)),
            },
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(idx) => write!(f, "cuda:{}", idx),
        }
    }
}

/// Flat rank-1 float vector used for priorities and importance weights.
///
/// The replay core uses these operations and nothing else: element-wise
/// power for the `priority^alpha` transform, scalar multiply/divide and
/// maximum reduction for the importance-sampling correction, and device
/// transfer for handing weights to an accelerator-resident trainer.
pub trait WeightVector: Clone + Send + 'static {
    /// Build a vector from host values.
    fn from_vec(values: Vec<f32>) -> Self;

    /// Host view of the values.
    fn as_slice(&self) -> &[f32];

    /// Number of elements.
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the vector is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element-wise power.
    fn powf(&self, exp: f32) -> Self;

    /// Multiply every element by a scalar.
    fn mul_scalar(&self, s: f32) -> Self;

    /// Divide every element by a scalar.
    fn div_scalar(&self, s: f32) -> Self;

    /// Maximum reduction. Implementations may return any value for an
    /// empty vector; the core never reduces an empty one.
    fn max(&self) -> f32;

    /// Move the vector to the requested device.
    fn to_device(self, device: &Device) -> Self;
}

/// CPU-resident reference implementation.
///
/// `to_device` is the identity here; backends with real device memory
/// implement the transfer in their own `WeightVector` type.
impl WeightVector for Vec<f32> {
    fn from_vec(values: Vec<f32>) -> Self {
        values
    }

    fn as_slice(&self) -> &[f32] {
        self
    }

    fn powf(&self, exp: f32) -> Self {
        self.iter().map(|w| w.powf(exp)).collect()
    }

    fn mul_scalar(&self, s: f32) -> Self {
        self.iter().map(|w| w * s).collect()
    }

    fn div_scalar(&self, s: f32) -> Self {
        self.iter().map(|w| w / s).collect()
    }

    fn max(&self) -> f32 {
        self.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }

    fn to_device(self, _device: &Device) -> Self {
        self
    }
}

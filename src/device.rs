//! Explicit compute placement for networks
//!
//! Every network carries a [`ComputeTarget`] in its configuration. It is
//! resolved to a `tch::Device` exactly once, when the network is built.

use serde::{Deserialize, Serialize};
use tch::{Cuda, Device};

use crate::error::{CoreError, Result};

/// Where a network's parameters live and its math runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeTarget {
    /// Host CPU
    #[default]
    Cpu,
    /// CUDA device with the given ordinal
    Accelerator(usize),
}

impl ComputeTarget {
    /// Resolve to a concrete device, failing if the accelerator is absent
    pub fn resolve(self) -> Result<Device> {
        match self {
            ComputeTarget::Cpu => Ok(Device::Cpu),
            ComputeTarget::Accelerator(index) => {
                if !Cuda::is_available() {
                    return Err(CoreError::UnavailableDevice(format!(
                        "accelerator {index} requested but CUDA is not available"
                    )));
                }
                let count = Cuda::device_count() as usize;
                if index >= count {
                    return Err(CoreError::UnavailableDevice(format!(
                        "accelerator {index} requested but only {count} device(s) present"
                    )));
                }
                Ok(Device::Cuda(index))
            }
        }
    }
}

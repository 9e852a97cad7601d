//! Simulator configuration.
//!
//! Supports loading from YAML or JSON:
//!
//! ```yaml
//! precision: single
//! devices:
//!   "/GPU:0": 2
//!   "/GPU:1": 2
//! global_policy: least-touched
//! norm_tolerance: 1.0e-6
//! ```
//!
//! A configuration is immutable once handed to a
//! [`Simulator`](crate::simulator::Simulator); build a new one to change
//! precision or devices.

use std::path::Path;

use qshard_ir::QubitId;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::partition::DeviceMap;
use crate::precision::Precision;

/// Built-in global-qubit policies selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Highest-indexed qubits.
    #[default]
    Highest,
    /// Qubits touched by the fewest gates.
    LeastTouched,
}

/// Simulator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Amplitude precision.
    #[serde(default)]
    precision: Precision,

    /// Device id to piece count; empty for a single piece.
    #[serde(default)]
    devices: DeviceMap,

    /// Explicit global qubits, overriding `global_policy`.
    #[serde(default)]
    global_qubits: Option<Vec<QubitId>>,

    /// Policy used when no explicit global set is given.
    #[serde(default)]
    global_policy: PolicyKind,

    /// Maximum allowed `|‖ψ‖ - 1|` at callback barriers.
    #[serde(default)]
    norm_tolerance: Option<f64>,

    /// Run pieces on the rayon pool.
    #[serde(default = "default_true")]
    parallel: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            devices: DeviceMap::default(),
            global_qubits: None,
            global_policy: PolicyKind::default(),
            norm_tolerance: None,
            parallel: default_true(),
        }
    }
}

impl SimConfig {
    /// Default configuration: double precision, one piece.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: SimConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the device map, global override and tolerance.
    pub fn validate(&self) -> SimResult<()> {
        let pieces = self.devices.num_pieces()?;

        if let Some(global) = &self.global_qubits {
            let expected = pieces.trailing_zeros() as usize;
            if global.len() != expected {
                return Err(SimError::InvalidGlobalQubits(format!(
                    "{pieces} pieces need {expected} global qubits, got {}",
                    global.len()
                )));
            }
        }

        if let Some(tol) = self.norm_tolerance {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "norm tolerance must be a non-negative number, got {tol}"
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Builder
    // =========================================================================

    /// Set the precision.
    #[must_use]
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Set the device descriptor.
    #[must_use]
    pub fn with_devices(mut self, devices: DeviceMap) -> Self {
        self.devices = devices;
        self
    }

    /// Spread the state over `pieces` pieces on one default device.
    #[must_use]
    pub fn with_pieces(self, pieces: usize) -> Self {
        self.with_devices(DeviceMap::new().with_device("default", pieces))
    }

    /// Fix the global qubits.
    #[must_use]
    pub fn with_global_qubits(mut self, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        self.global_qubits = Some(qubits.into_iter().collect());
        self
    }

    /// Select a built-in global-qubit policy.
    #[must_use]
    pub fn with_global_policy(mut self, policy: PolicyKind) -> Self {
        self.global_policy = policy;
        self
    }

    /// Check the norm at every callback barrier.
    #[must_use]
    pub fn with_norm_tolerance(mut self, tolerance: f64) -> Self {
        self.norm_tolerance = Some(tolerance);
        self
    }

    /// Enable or disable parallel piece execution.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Amplitude precision.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Device descriptor.
    pub fn devices(&self) -> &DeviceMap {
        &self.devices
    }

    /// Explicit global qubits, if any.
    pub fn global_qubits(&self) -> Option<&[QubitId]> {
        self.global_qubits.as_deref()
    }

    /// Built-in policy used without an explicit global set.
    pub fn global_policy(&self) -> PolicyKind {
        self.global_policy
    }

    /// Norm check tolerance, if enabled.
    pub fn norm_tolerance(&self) -> Option<f64> {
        self.norm_tolerance
    }

    /// Whether pieces run in parallel.
    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

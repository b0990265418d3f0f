//! DSP effect unit types and their float parameters.

use serde::{Deserialize, Serialize};

/// Built-in DSP effect types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DspType {
    /// Delay line with feedback.
    Echo,
    /// Waveshaping distortion.
    Distortion,
    /// Resonant highpass filter.
    Highpass,
    /// Resonant lowpass filter.
    Lowpass,
    /// Flanger.
    Flange,
}

/// Echo parameter indices.
pub mod echo {
    /// Delay in milliseconds (1-5000, default 500).
    pub const DELAY: usize = 0;
    /// Feedback percentage (0-100, default 50).
    pub const FEEDBACK: usize = 1;
    /// Dry level in dB (-80-10, default 0).
    pub const DRY_LEVEL: usize = 2;
    /// Wet level in dB (-80-10, default 0).
    pub const WET_LEVEL: usize = 3;
}

/// Distortion parameter indices.
pub mod distortion {
    /// Distortion level (0-1, default 0.5).
    pub const LEVEL: usize = 0;
}

/// Highpass parameter indices.
pub mod highpass {
    /// Cutoff frequency in Hz (1-22000, default 5000).
    pub const CUTOFF: usize = 0;
    /// Resonance (1-10, default 1).
    pub const RESONANCE: usize = 1;
}

/// Lowpass parameter indices.
pub mod lowpass {
    /// Cutoff frequency in Hz (1-22000, default 5000).
    pub const CUTOFF: usize = 0;
    /// Resonance (1-10, default 1).
    pub const RESONANCE: usize = 1;
}

/// Flange parameter indices.
pub mod flange {
    /// Wet mix percentage (0-100, default 50).
    pub const MIX: usize = 0;
    /// Modulation depth (0.01-1, default 1).
    pub const DEPTH: usize = 1;
    /// Modulation rate in Hz (0-20, default 0.1).
    pub const RATE: usize = 2;
}

/// Range and default of a single float parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterDesc {
    /// Parameter name.
    pub name: &'static str,
    /// Smallest accepted value.
    pub min: f32,
    /// Largest accepted value.
    pub max: f32,
    /// Value on creation.
    pub default: f32,
}

const fn param(name: &'static str, min: f32, max: f32, default: f32) -> ParameterDesc {
    ParameterDesc {
        name,
        min,
        max,
        default,
    }
}

const ECHO_PARAMS: [ParameterDesc; 4] = [
    param("delay", 1.0, 5000.0, 500.0),
    param("feedback", 0.0, 100.0, 50.0),
    param("dry_level", -80.0, 10.0, 0.0),
    param("wet_level", -80.0, 10.0, 0.0),
];
const DISTORTION_PARAMS: [ParameterDesc; 1] = [param("level", 0.0, 1.0, 0.5)];
const FILTER_PARAMS: [ParameterDesc; 2] = [
    param("cutoff", 1.0, 22000.0, 5000.0),
    param("resonance", 1.0, 10.0, 1.0),
];
const FLANGE_PARAMS: [ParameterDesc; 3] = [
    param("mix", 0.0, 100.0, 50.0),
    param("depth", 0.01, 1.0, 1.0),
    param("rate", 0.0, 20.0, 0.1),
];

impl DspType {
    /// Parameter table for this effect.
    #[must_use]
    pub const fn parameters(self) -> &'static [ParameterDesc] {
        match self {
            Self::Echo => &ECHO_PARAMS,
            Self::Distortion => &DISTORTION_PARAMS,
            Self::Highpass | Self::Lowpass => &FILTER_PARAMS,
            Self::Flange => &FLANGE_PARAMS,
        }
    }

    /// Default values for every parameter, in index order.
    #[must_use]
    pub fn default_parameters(self) -> Vec<f32> {
        self.parameters().iter().map(|p| p.default).collect()
    }

    /// Index of a parameter by name.
    #[must_use]
    pub fn parameter_index(self, name: &str) -> Option<usize> {
        self.parameters().iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_tables() {
        assert_eq!(DspType::Distortion.default_parameters(), vec![0.5]);
        assert_eq!(DspType::Highpass.default_parameters(), vec![5000.0, 1.0]);
        assert_eq!(DspType::Echo.default_parameters().len(), 4);
    }

    #[test]
    fn test_parameter_lookup() {
        assert_eq!(DspType::Highpass.parameter_index("cutoff"), Some(highpass::CUTOFF));
        assert_eq!(DspType::Flange.parameter_index("rate"), Some(flange::RATE));
        assert_eq!(DspType::Distortion.parameter_index("cutoff"), None);
    }
}

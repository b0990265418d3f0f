//! Reverb property sets and named acoustic presets.

use serde::{Deserialize, Serialize};

/// Physical reverb model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReverbProperties {
    /// Reverberation decay time in ms.
    pub decay_time: f32,
    /// Initial reflection delay in ms.
    pub early_delay: f32,
    /// Late reverberation delay relative to the initial reflection, in ms.
    pub late_delay: f32,
    /// Reference high frequency in Hz.
    pub hf_reference: f32,
    /// High-frequency to mid-frequency decay time ratio, in percent.
    pub hf_decay_ratio: f32,
    /// Echo density in the late reverberation decay, in percent.
    pub diffusion: f32,
    /// Modal density in the late reverberation decay, in percent.
    pub density: f32,
    /// Reference low frequency in Hz.
    pub low_shelf_frequency: f32,
    /// Relative room effect level at low frequencies, in dB.
    pub low_shelf_gain: f32,
    /// Relative room effect level at high frequencies, in Hz.
    pub high_cut: f32,
    /// Early reflections level relative to room effect, in percent.
    pub early_late_mix: f32,
    /// Room effect level at mid frequencies, in dB.
    pub wet_level: f32,
}

/// Named acoustic environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    /// Narrow urban alley.
    Alley,
    /// Sports arena.
    Arena,
    /// Auditorium.
    Auditorium,
    /// Tiled bathroom.
    Bathroom,
    /// Carpeted hallway.
    CarpettedHallway,
    /// Cave.
    Cave,
    /// Open city street.
    City,
    /// Concert hall.
    ConcertHall,
    /// Forest.
    Forest,
    /// Generic room.
    Generic,
    /// Hallway.
    Hallway,
    /// Aircraft hangar.
    Hangar,
    /// Living room.
    LivingRoom,
    /// Mountain range.
    Mountains,
    /// Reverb disabled.
    Off,
    /// Padded cell.
    PaddedCell,
    /// Parking lot.
    ParkingLot,
    /// Open plain.
    Plain,
    /// Stone quarry.
    Quarry,
    /// Small room.
    Room,
    /// Sewer pipe.
    SewerPipe,
    /// Stone corridor.
    StoneCorridor,
    /// Stone room.
    StoneRoom,
    /// Underwater.
    Underwater,
    /// All-zero properties: no effect at all.
    #[default]
    None,
}

#[allow(clippy::too_many_arguments)]
const fn props(
    decay_time: f32,
    early_delay: f32,
    late_delay: f32,
    hf_reference: f32,
    hf_decay_ratio: f32,
    diffusion: f32,
    density: f32,
    low_shelf_frequency: f32,
    low_shelf_gain: f32,
    high_cut: f32,
    early_late_mix: f32,
    wet_level: f32,
) -> ReverbProperties {
    ReverbProperties {
        decay_time,
        early_delay,
        late_delay,
        hf_reference,
        hf_decay_ratio,
        diffusion,
        density,
        low_shelf_frequency,
        low_shelf_gain,
        high_cut,
        early_late_mix,
        wet_level,
    }
}

impl ReverbPreset {
    /// Every preset, in declaration order.
    pub const ALL: [Self; 25] = [
        Self::Alley,
        Self::Arena,
        Self::Auditorium,
        Self::Bathroom,
        Self::CarpettedHallway,
        Self::Cave,
        Self::City,
        Self::ConcertHall,
        Self::Forest,
        Self::Generic,
        Self::Hallway,
        Self::Hangar,
        Self::LivingRoom,
        Self::Mountains,
        Self::Off,
        Self::PaddedCell,
        Self::ParkingLot,
        Self::Plain,
        Self::Quarry,
        Self::Room,
        Self::SewerPipe,
        Self::StoneCorridor,
        Self::StoneRoom,
        Self::Underwater,
        Self::None,
    ];

    /// Engine reverb properties for this preset.
    #[must_use]
    pub const fn properties(self) -> ReverbProperties {
        match self {
            Self::Off => props(1000.0, 7.0, 11.0, 5000.0, 100.0, 100.0, 100.0, 250.0, 0.0, 20.0, 96.0, -80.0),
            Self::Generic => props(1500.0, 7.0, 11.0, 5000.0, 83.0, 100.0, 100.0, 250.0, 0.0, 14500.0, 96.0, -8.0),
            Self::PaddedCell => props(170.0, 1.0, 2.0, 5000.0, 10.0, 100.0, 100.0, 250.0, 0.0, 160.0, 84.0, -7.8),
            Self::Room => props(400.0, 2.0, 3.0, 5000.0, 83.0, 100.0, 100.0, 250.0, 0.0, 6050.0, 88.0, -9.4),
            Self::Bathroom => props(1500.0, 7.0, 11.0, 5000.0, 54.0, 100.0, 60.0, 250.0, 0.0, 2900.0, 83.0, 0.5),
            Self::LivingRoom => props(500.0, 3.0, 4.0, 5000.0, 10.0, 100.0, 100.0, 250.0, 0.0, 160.0, 58.0, -19.0),
            Self::StoneRoom => props(2300.0, 12.0, 17.0, 5000.0, 64.0, 100.0, 100.0, 250.0, 0.0, 7800.0, 71.0, -8.5),
            Self::Auditorium => props(4300.0, 20.0, 30.0, 5000.0, 59.0, 100.0, 100.0, 250.0, 0.0, 5850.0, 64.0, -11.7),
            Self::ConcertHall => props(3900.0, 20.0, 29.0, 5000.0, 70.0, 100.0, 100.0, 250.0, 0.0, 5650.0, 80.0, -9.8),
            Self::Cave => props(2900.0, 15.0, 22.0, 5000.0, 100.0, 100.0, 100.0, 250.0, 0.0, 20000.0, 59.0, -11.3),
            Self::Arena => props(7200.0, 20.0, 30.0, 5000.0, 33.0, 100.0, 100.0, 250.0, 0.0, 4500.0, 80.0, -9.6),
            Self::Hangar => props(10000.0, 20.0, 30.0, 5000.0, 23.0, 100.0, 100.0, 250.0, 0.0, 3400.0, 72.0, -7.4),
            Self::CarpettedHallway => props(300.0, 2.0, 30.0, 5000.0, 10.0, 100.0, 100.0, 250.0, 0.0, 500.0, 56.0, -24.0),
            Self::Hallway => props(1500.0, 7.0, 11.0, 5000.0, 59.0, 100.0, 100.0, 250.0, 0.0, 7800.0, 87.0, -5.5),
            Self::StoneCorridor => props(270.0, 13.0, 20.0, 5000.0, 79.0, 100.0, 100.0, 250.0, 0.0, 9000.0, 86.0, -6.0),
            Self::Alley => props(1500.0, 7.0, 11.0, 5000.0, 86.0, 100.0, 100.0, 250.0, 0.0, 8300.0, 80.0, -9.8),
            Self::Forest => props(1500.0, 162.0, 88.0, 5000.0, 54.0, 79.0, 100.0, 250.0, 0.0, 760.0, 94.0, -12.3),
            Self::City => props(1500.0, 7.0, 11.0, 5000.0, 67.0, 50.0, 100.0, 250.0, 0.0, 4050.0, 66.0, -26.0),
            Self::Mountains => props(1500.0, 300.0, 100.0, 5000.0, 21.0, 27.0, 100.0, 250.0, 0.0, 1220.0, 82.0, -24.0),
            Self::Quarry => props(1500.0, 61.0, 25.0, 5000.0, 83.0, 100.0, 100.0, 250.0, 0.0, 3400.0, 100.0, -5.0),
            Self::Plain => props(1500.0, 179.0, 100.0, 5000.0, 50.0, 21.0, 100.0, 250.0, 0.0, 1670.0, 65.0, -28.0),
            Self::ParkingLot => props(1700.0, 8.0, 12.0, 5000.0, 100.0, 100.0, 100.0, 250.0, 0.0, 20000.0, 56.0, -19.5),
            Self::SewerPipe => props(2800.0, 14.0, 21.0, 5000.0, 14.0, 80.0, 60.0, 250.0, 0.0, 3400.0, 66.0, 1.2),
            Self::Underwater => props(1500.0, 7.0, 11.0, 5000.0, 10.0, 100.0, 100.0, 250.0, 0.0, 500.0, 92.0, 7.0),
            Self::None => props(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
        }
    }
}

impl From<ReverbPreset> for ReverbProperties {
    fn from(preset: ReverbPreset) -> Self {
        preset.properties()
    }
}

//! Handle types for engine-side audio objects.
//!
//! Every handle pairs a slot index with the generation the slot had when the
//! handle was issued. When the engine recycles a slot it bumps the
//! generation, so stale handles fail lookups instead of silently addressing
//! the new occupant.

use std::fmt;

macro_rules! engine_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $name {
            /// Creates a handle from a slot index and generation.
            #[must_use]
            pub const fn new(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            /// Returns the slot index.
            #[must_use]
            pub const fn index(self) -> u32 {
                self.index
            }

            /// Returns the slot generation this handle was issued for.
            #[must_use]
            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.index, self.generation)
            }
        }
    };
}

engine_handle!(
    /// A loaded sound asset.
    SoundId
);
engine_handle!(
    /// A live playback channel.
    ChannelId
);
engine_handle!(
    /// A mixer channel group.
    ChannelGroupId
);
engine_handle!(
    /// A DSP effect unit.
    DspId
);
engine_handle!(
    /// An occlusion geometry object.
    GeometryId
);
engine_handle!(
    /// A 3D reverb region.
    ReverbId
);

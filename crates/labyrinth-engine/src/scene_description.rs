//! Scene description files.
//!
//! A scene is a TOML document listing in-memory clips, mixer groups,
//! positional sounds with their effect chains, occluders, reverb zones and
//! doors. Descriptions are validated as a whole before anything is created in
//! the audio engine.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use labyrinth_audio::dsp::{distortion, highpass};
use labyrinth_audio::{
    ClipInfo, DspType, GeometryShape, OcclusionMaterial, ReverbPreset, SoundParams,
};
use labyrinth_common::{AudioError, Transform};

/// Distortion level of the radio effect.
pub const RADIO_DISTORTION_LEVEL: f32 = 0.85;

/// Highpass cutoff of the radio effect, in Hz.
pub const RADIO_HIGHPASS_CUTOFF: f32 = 2000.0;

/// Seconds between playback start and the radio effect being attached.
pub const RADIO_DELAY_SECONDS: f32 = 0.1;

/// Errors raised while loading or building a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The scene file could not be read.
    #[error("failed to read scene {path}: {source}")]
    Io {
        /// Scene file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The scene file is not valid TOML for a scene.
    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two objects of the same kind share a name.
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName {
        /// Object kind.
        kind: &'static str,
        /// Repeated name.
        name: String,
    },

    /// A sound names a group that is not declared.
    #[error("sound '{sound}' references unknown group '{group}'")]
    UnknownGroup {
        /// Sound name.
        sound: String,
        /// Missing group.
        group: String,
    },

    /// A name does not match any sound in the scene.
    #[error("unknown sound '{0}'")]
    UnknownSound(String),

    /// An effect sets a parameter its DSP type does not have.
    #[error("{kind:?} has no parameter '{name}'")]
    UnknownParameter {
        /// Effect type.
        kind: DspType,
        /// Parameter name.
        name: String,
    },

    /// The audio engine refused an object.
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Scene result type.
pub type SceneResult<T> = Result<T, SceneError>;

/// A clip served from memory instead of disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDesc {
    /// Sound name, as referenced by [`SoundDesc::clip`].
    pub name: String,
    /// Length in milliseconds; unknown lengths never finish on their own.
    #[serde(default)]
    pub length_ms: Option<u32>,
    /// Native sample rate in Hz.
    #[serde(default)]
    pub frequency: Option<f32>,
}

impl ClipDesc {
    /// Engine-side clip metadata.
    #[must_use]
    pub fn info(&self) -> ClipInfo {
        let mut info = self
            .length_ms
            .map_or_else(ClipInfo::unbounded, ClipInfo::with_length);
        if let Some(frequency) = self.frequency {
            info.frequency = frequency;
        }
        info
    }
}

/// A mixer group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDesc {
    /// Group name.
    pub name: String,
    /// Group volume.
    pub volume: f32,
    /// Group pitch multiplier.
    pub pitch: f32,
    /// Start muted.
    pub mute: bool,
}

impl Default for GroupDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            volume: 1.0,
            pitch: 1.0,
            mute: false,
        }
    }
}

/// One DSP unit in a sound's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDesc {
    /// Effect type.
    pub kind: DspType,
    /// Fixed ticks to wait before attaching (0 = at creation).
    #[serde(default)]
    pub delay_ticks: u64,
    /// Parameter values by name; unset parameters keep their defaults.
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
}

impl EffectDesc {
    /// An effect attached at creation with default parameters.
    #[must_use]
    pub fn new(kind: DspType) -> Self {
        Self {
            kind,
            delay_ticks: 0,
            parameters: BTreeMap::new(),
        }
    }

    /// Set a parameter by name.
    #[must_use]
    pub fn with_parameter(mut self, name: &str, value: f32) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }

    /// Attach after `ticks` fixed ticks.
    #[must_use]
    pub const fn delayed(mut self, ticks: u64) -> Self {
        self.delay_ticks = ticks;
        self
    }

    /// Parameters as `(index, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownParameter`] for a name the type lacks.
    pub fn resolved_parameters(&self) -> SceneResult<Vec<(usize, f32)>> {
        self.parameters
            .iter()
            .map(|(name, &value)| {
                self.kind
                    .parameter_index(name)
                    .map(|index| (index, value))
                    .ok_or_else(|| SceneError::UnknownParameter {
                        kind: self.kind,
                        name: name.clone(),
                    })
            })
            .collect()
    }
}

/// The radio chain: distortion then highpass, attached shortly after start.
#[must_use]
pub fn radio_effects(fixed_dt: f32) -> Vec<EffectDesc> {
    let delay = (RADIO_DELAY_SECONDS / fixed_dt.max(f32::EPSILON)).round().max(1.0) as u64;
    let distortion_level = DspType::Distortion.parameters()[distortion::LEVEL].name;
    let cutoff = DspType::Highpass.parameters()[highpass::CUTOFF].name;
    vec![
        EffectDesc::new(DspType::Distortion)
            .with_parameter(distortion_level, RADIO_DISTORTION_LEVEL)
            .delayed(delay),
        EffectDesc::new(DspType::Highpass)
            .with_parameter(cutoff, RADIO_HIGHPASS_CUTOFF)
            .delayed(delay),
    ]
}

/// A positional sound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundDesc {
    /// Scene-unique name; defaults to the clip name.
    pub name: String,
    /// Sound asset name.
    pub clip: String,
    /// World transform.
    pub transform: Transform,
    /// Channel parameters.
    pub params: SoundParams,
    /// Mixer group to join.
    pub group: Option<String>,
    /// Start playing after the scene's auto-play delay.
    pub auto_play: bool,
    /// Effect chain, in order.
    pub effects: Vec<EffectDesc>,
    /// Append the radio chain (see [`radio_effects`]) when presets are
    /// expanded.
    pub radio: bool,
    /// Walking speed at which this sound plays at natural pitch. When set,
    /// the sound follows the listener and its pitch tracks listener speed.
    pub footstep_speed: Option<f32>,
}

impl SoundDesc {
    /// Name used to look the sound up in the scene.
    #[must_use]
    pub fn key(&self) -> &str {
        if self.name.is_empty() {
            &self.clip
        } else {
            &self.name
        }
    }
}

/// A static occluder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryDesc {
    /// Scene-unique name.
    #[serde(default)]
    pub name: String,
    /// Shape to register.
    pub shape: GeometryShape,
    /// Occlusion coefficients.
    #[serde(default)]
    pub material: OcclusionMaterial,
    /// World transform.
    #[serde(default)]
    pub transform: Transform,
    /// Whether the occluder starts enabled.
    #[serde(default = "default_true")]
    pub active: bool,
}

const fn default_true() -> bool {
    true
}

/// A reverb zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbDesc {
    /// Scene-unique name.
    pub name: String,
    /// Reverb preset.
    pub preset: ReverbPreset,
    /// Radius of full effect.
    pub min_radius: f32,
    /// Radius where the effect fades out.
    pub max_radius: f32,
    /// Sphere center.
    pub position: Vec3,
}

impl Default for ReverbDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            preset: ReverbPreset::Generic,
            min_radius: 1.0,
            max_radius: 10.0,
            position: Vec3::ZERO,
        }
    }
}

/// A door that blocks sound until opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorDesc {
    /// Scene-unique name.
    pub name: String,
    /// World transform of the slab center.
    pub transform: Transform,
    /// Slab extents.
    pub size: Vec3,
    /// Occlusion coefficients of the slab.
    pub material: OcclusionMaterial,
    /// Scene sound played when the door opens.
    pub cue: Option<String>,
}

impl Default for DoorDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            size: Vec3::new(2.0, 3.0, 0.2),
            material: OcclusionMaterial::default(),
            cue: None,
        }
    }
}

/// A complete scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Scene name for logs.
    pub name: String,
    /// Fixed ticks between creation and auto-play.
    pub auto_play_delay_ticks: u64,
    /// Initial listener transform.
    pub listener: Transform,
    /// In-memory clips.
    pub clips: Vec<ClipDesc>,
    /// Mixer groups.
    pub groups: Vec<GroupDesc>,
    /// Positional sounds.
    pub sounds: Vec<SoundDesc>,
    /// Occluders.
    pub geometry: Vec<GeometryDesc>,
    /// Reverb zones.
    pub reverbs: Vec<ReverbDesc>,
    /// Doors.
    pub doors: Vec<DoorDesc>,
}

impl SceneDescription {
    /// Read and validate a scene file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from<P: AsRef<Path>>(path: P) -> SceneResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scene = Self::from_toml_str(&contents)?;
        info!(
            "Loaded scene '{}' from {}: {} sounds, {} occluders, {} reverb zones",
            scene.name,
            path.display(),
            scene.sounds.len(),
            scene.geometry.len(),
            scene.reverbs.len()
        );
        Ok(scene)
    }

    /// Parse and validate a scene document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or inconsistent.
    pub fn from_toml_str(contents: &str) -> SceneResult<Self> {
        let scene: Self = toml::from_str(contents)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Turn preset flags into concrete effects for a tick of `fixed_dt`
    /// seconds. Expanding twice adds nothing.
    pub fn expand_presets(&mut self, fixed_dt: f32) {
        for sound in &mut self.sounds {
            if std::mem::take(&mut sound.radio) {
                sound.effects.extend(radio_effects(fixed_dt));
            }
        }
    }

    /// In-memory clips to register with the engine.
    pub fn clip_infos(&self) -> impl Iterator<Item = (&str, ClipInfo)> + '_ {
        self.clips.iter().map(|clip| (clip.name.as_str(), clip.info()))
    }

    /// Check names, references and effect parameters.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> SceneResult<()> {
        let groups = unique_names("group", self.groups.iter().map(|g| g.name.as_str()))?;
        let sounds = unique_names("sound", self.sounds.iter().map(SoundDesc::key))?;
        unique_names("geometry", self.geometry.iter().map(|g| g.name.as_str()))?;
        unique_names("reverb", self.reverbs.iter().map(|r| r.name.as_str()))?;
        unique_names("door", self.doors.iter().map(|d| d.name.as_str()))?;

        for sound in &self.sounds {
            if let Some(group) = &sound.group {
                if !groups.contains(group.as_str()) {
                    return Err(SceneError::UnknownGroup {
                        sound: sound.key().to_string(),
                        group: group.clone(),
                    });
                }
            }
            for effect in &sound.effects {
                effect.resolved_parameters()?;
            }
        }

        for cue in self.doors.iter().filter_map(|d| d.cue.as_deref()) {
            if !sounds.contains(cue) {
                return Err(SceneError::UnknownSound(cue.to_string()));
            }
        }
        Ok(())
    }
}

/// Collect non-empty names, failing on the first repeat.
fn unique_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> SceneResult<HashSet<&'a str>> {
    let mut seen = HashSet::new();
    for name in names.filter(|n| !n.is_empty()) {
        if !seen.insert(name) {
            return Err(SceneError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCENE: &str = r#"
name = "corridor"
auto_play_delay_ticks = 2

[listener]
position = [0.0, 1.0, 0.0]

[[clips]]
name = "drip"
length_ms = 1500

[[clips]]
name = "hum"

[[groups]]
name = "ambience"
volume = 0.5

[[sounds]]
clip = "drip"
group = "ambience"
auto_play = true
transform = { position = [2.0, 0.0, 4.0] }
params = { looping = true, volume = 0.8 }

[[sounds]]
name = "radio"
clip = "hum"

[[sounds.effects]]
kind = "distortion"
delay_ticks = 5
parameters = { level = 0.85 }

[[geometry]]
name = "wall"
shape = { kind = "box", center = [0.0, 0.0, 0.0], size = [4.0, 3.0, 0.5] }
material = { direct = 0.6, reverb = 0.4 }

[[reverbs]]
name = "hall"
preset = "stone_corridor"
min_radius = 2.0
max_radius = 12.0

[[doors]]
name = "exit"
cue = "radio"
"#;

    #[test]
    fn test_parse_full_scene() {
        let scene = SceneDescription::from_toml_str(SCENE).expect("valid scene");
        assert_eq!(scene.name, "corridor");
        assert_eq!(scene.auto_play_delay_ticks, 2);
        assert_eq!(scene.listener.position, Vec3::Y);
        assert_eq!(scene.clips[0].info(), ClipInfo::with_length(1500));
        assert_eq!(scene.clips[1].info(), ClipInfo::unbounded());

        let drip = &scene.sounds[0];
        assert_eq!(drip.key(), "drip");
        assert!(drip.params.looping);
        assert!(!drip.params.play_on_awake);
        assert_eq!(drip.params.pitch, 1.0);

        let radio = &scene.sounds[1];
        assert_eq!(radio.key(), "radio");
        assert_eq!(
            radio.effects[0].resolved_parameters().expect("params"),
            vec![(distortion::LEVEL, 0.85)]
        );

        assert!(scene.geometry[0].active);
        assert!(scene.geometry[0].material.double_sided);
        assert_eq!(scene.reverbs[0].preset, ReverbPreset::StoneCorridor);
        assert_eq!(scene.doors[0].size, Vec3::new(2.0, 3.0, 0.2));
    }

    #[test]
    fn test_unknown_group_is_rejected() {
        let err = SceneDescription::from_toml_str(
            "[[sounds]]\nclip = \"drip\"\ngroup = \"nowhere\"\n",
        )
        .expect_err("missing group");
        assert!(matches!(err, SceneError::UnknownGroup { .. }));
    }

    #[test]
    fn test_duplicate_sound_names_are_rejected() {
        let err = SceneDescription::from_toml_str(
            "[[sounds]]\nclip = \"drip\"\n\n[[sounds]]\nclip = \"drip\"\n",
        )
        .expect_err("duplicate");
        assert!(matches!(err, SceneError::DuplicateName { kind: "sound", .. }));
    }

    #[test]
    fn test_unknown_parameter_is_rejected() {
        let err = SceneDescription::from_toml_str(
            "[[sounds]]\nclip = \"drip\"\n[[sounds.effects]]\nkind = \"echo\"\nparameters = { level = 1.0 }\n",
        )
        .expect_err("echo has no level");
        assert!(matches!(err, SceneError::UnknownParameter { kind: DspType::Echo, .. }));
    }

    #[test]
    fn test_door_cue_must_exist() {
        let err = SceneDescription::from_toml_str("[[doors]]\nname = \"exit\"\ncue = \"creak\"\n")
            .expect_err("missing cue");
        assert!(matches!(err, SceneError::UnknownSound(name) if name == "creak"));
    }

    #[test]
    fn test_radio_effects() {
        let chain = radio_effects(0.02);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].kind, DspType::Distortion);
        assert_eq!(chain[1].kind, DspType::Highpass);
        assert!(chain.iter().all(|e| e.delay_ticks == 5));
        assert_eq!(
            chain[1].resolved_parameters().expect("params"),
            vec![(highpass::CUTOFF, RADIO_HIGHPASS_CUTOFF)]
        );
    }

    #[test]
    fn test_radio_flag_expands_once() {
        let mut scene = SceneDescription::from_toml_str(
            "[[sounds]]\nclip = \"hum\"\nradio = true\n\n[[sounds.effects]]\nkind = \"echo\"\n",
        )
        .expect("valid scene");
        assert!(scene.sounds[0].radio);

        scene.expand_presets(0.02);
        scene.expand_presets(0.02);
        let kinds: Vec<_> = scene.sounds[0].effects.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![DspType::Echo, DspType::Distortion, DspType::Highpass]);
        assert!(!scene.sounds[0].radio);
        assert_eq!(scene.sounds[0].effects[1].delay_ticks, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("scene.toml");
        fs::write(&path, SCENE).expect("write scene");
        let scene = SceneDescription::load_from(&path).expect("load");
        assert_eq!(scene.sounds.len(), 2);

        let err = SceneDescription::load_from(dir.path().join("missing.toml"))
            .expect_err("missing file");
        assert!(matches!(err, SceneError::Io { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let scene = SceneDescription::from_toml_str(SCENE).expect("valid scene");
        let text = toml::to_string_pretty(&scene).expect("serialize");
        assert_eq!(SceneDescription::from_toml_str(&text).expect("reparse"), scene);
    }
}

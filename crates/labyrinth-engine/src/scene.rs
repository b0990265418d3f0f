//! Runtime scene: the composition root for the audio components.
//!
//! `AudioScene` creates the engine objects a [`SceneDescription`] lists, in a
//! fixed order (occluders, reverb zones, sounds, groups, doors), and drives
//! them from the fixed tick. Each tick pushes the listener, then occluder and
//! reverb transforms, then every sound, runs deferred work and finally lets
//! the engine advance.

use std::sync::Arc;

use glam::Vec3;
use tracing::{debug, info, warn};

use labyrinth_audio::{
    pitch_for_speed, AcousticGeometry, AudioConfig, AudioSystem, DspType, Occlusion, ReverbZone,
    Sound3D, SoundGroup3D, SoundState,
};
use labyrinth_common::{AudioResult, Transform};

use crate::interaction::{Door, Interactable};
use crate::scene_description::{EffectDesc, SceneDescription, SceneResult};
use crate::scheduler::TickScheduler;

/// Work deferred to a later tick.
#[derive(Debug, Clone, PartialEq)]
enum SceneTask {
    Play {
        sound: usize,
    },
    AttachEffect {
        sound: usize,
        kind: DspType,
        parameters: Vec<(usize, f32)>,
    },
}

#[derive(Debug)]
struct SceneSound {
    name: String,
    transform: Transform,
    footstep_speed: Option<f32>,
    sound: Sound3D,
}

#[derive(Debug)]
struct SceneGeometry {
    name: String,
    transform: Transform,
    geometry: AcousticGeometry,
}

#[derive(Debug)]
struct SceneReverb {
    name: String,
    position: Vec3,
    zone: ReverbZone,
}

/// Live audio objects of one scene.
#[derive(Debug)]
pub struct AudioScene {
    name: String,
    system: Arc<AudioSystem>,
    listener: Transform,
    previous_listener: Vec3,
    interactables: Vec<Box<dyn Interactable>>,
    sounds: Vec<SceneSound>,
    groups: Vec<SoundGroup3D>,
    reverbs: Vec<SceneReverb>,
    geometry: Vec<SceneGeometry>,
    scheduler: TickScheduler<SceneTask>,
}

impl AudioScene {
    /// Start a software engine with the scene's in-memory clips and build
    /// the scene on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start or any object fails.
    pub fn with_software_engine(config: AudioConfig, desc: &SceneDescription) -> SceneResult<Self> {
        let system = Arc::new(AudioSystem::software_with_clips(config, desc.clip_infos())?);
        Self::build(system, desc)
    }

    /// Create every object in `desc` on `system`.
    ///
    /// # Errors
    ///
    /// Returns an error if the description is inconsistent or the engine
    /// refuses an object. Objects created before the failure are released.
    pub fn build(system: Arc<AudioSystem>, desc: &SceneDescription) -> SceneResult<Self> {
        desc.validate()?;

        let mut scene = Self {
            name: desc.name.clone(),
            system: Arc::clone(&system),
            listener: desc.listener,
            previous_listener: desc.listener.position,
            interactables: Vec::new(),
            sounds: Vec::new(),
            groups: Vec::new(),
            reverbs: Vec::new(),
            geometry: Vec::new(),
            scheduler: TickScheduler::new(),
        };

        for g in &desc.geometry {
            let geometry = AcousticGeometry::new(Arc::clone(&system), g.shape, g.material, &g.transform)?;
            if !g.active {
                geometry.set_active(false)?;
            }
            scene.geometry.push(SceneGeometry {
                name: g.name.clone(),
                transform: g.transform,
                geometry,
            });
        }

        for r in &desc.reverbs {
            let zone = ReverbZone::new(
                Arc::clone(&system),
                r.preset,
                r.min_radius,
                r.max_radius,
                r.position,
            )?;
            scene.reverbs.push(SceneReverb {
                name: r.name.clone(),
                position: r.position,
                zone,
            });
        }

        for s in &desc.sounds {
            let index = scene.sounds.len();
            let mut sound = Sound3D::new(Arc::clone(&system), &s.clip, s.params.clone(), &s.transform)?;
            for effect in &s.effects {
                scene.add_effect(&mut sound, index, effect)?;
            }
            if s.auto_play {
                scene
                    .scheduler
                    .schedule(desc.auto_play_delay_ticks, SceneTask::Play { sound: index });
            }
            scene.sounds.push(SceneSound {
                name: s.key().to_string(),
                transform: s.transform,
                footstep_speed: s.footstep_speed,
                sound,
            });
        }

        for g in &desc.groups {
            let group = SoundGroup3D::new(Arc::clone(&system), &g.name)?;
            group.set_volume(g.volume)?;
            group.set_pitch(g.pitch)?;
            group.set_mute(g.mute)?;
            for (s, member) in desc.sounds.iter().zip(scene.sounds.iter_mut()) {
                if s.group.as_deref() == Some(g.name.as_str()) {
                    group.add(&mut member.sound)?;
                }
            }
            scene.groups.push(group);
        }

        for d in &desc.doors {
            let door = Door::new(
                Arc::clone(&system),
                &d.name,
                d.transform,
                d.size,
                d.material,
                d.cue.clone(),
            )?;
            scene.interactables.push(Box::new(door));
        }

        info!(
            "Scene '{}' ready: {} sounds, {} groups, {} occluders, {} reverb zones, {} interactables",
            scene.name,
            scene.sounds.len(),
            scene.groups.len(),
            scene.geometry.len(),
            scene.reverbs.len(),
            scene.interactables.len()
        );
        Ok(scene)
    }

    /// Attach now or schedule, depending on the effect's delay.
    fn add_effect(&mut self, sound: &mut Sound3D, index: usize, effect: &EffectDesc) -> SceneResult<()> {
        let parameters = effect.resolved_parameters()?;
        if effect.delay_ticks == 0 {
            sound.add_effect_of(effect.kind, &parameters)?;
        } else {
            self.scheduler.schedule(
                effect.delay_ticks,
                SceneTask::AttachEffect {
                    sound: index,
                    kind: effect.kind,
                    parameters,
                },
            );
        }
        Ok(())
    }

    /// Run one fixed tick of `dt` seconds.
    ///
    /// A failing listener, occluder, interactable or reverb zone is logged and
    /// skipped for this tick; everything else still runs.
    ///
    /// # Errors
    ///
    /// Returns an error only if the engine update itself fails.
    pub fn tick(&mut self, dt: f32) -> AudioResult<()> {
        let velocity = if dt > 0.0 {
            (self.listener.position - self.previous_listener) / dt
        } else {
            Vec3::ZERO
        };
        self.previous_listener = self.listener.position;
        if let Err(e) = self.system.set_listener(
            self.listener.position,
            velocity,
            self.listener.forward,
            self.listener.up,
        ) {
            warn!("Listener update failed: {e}");
        }

        for g in &self.geometry {
            if let Err(e) = g.geometry.fixed_update(&g.transform) {
                warn!("Occluder '{}' update failed: {e}", g.name);
            }
        }
        for interactable in &mut self.interactables {
            if let Err(e) = interactable.fixed_update() {
                warn!("Interactable '{}' update failed: {e}", interactable.name());
            }
        }
        for r in &self.reverbs {
            if let Err(e) = r.zone.fixed_update(r.position) {
                warn!("Reverb zone '{}' update failed: {e}", r.name);
            }
        }
        let listener_speed = velocity.length();
        for s in &mut self.sounds {
            if let Some(walk_speed) = s.footstep_speed {
                s.transform.position = self.listener.position;
                s.sound.params.pitch = pitch_for_speed(listener_speed, walk_speed);
            }
            s.sound.fixed_update(&s.transform, dt);
        }

        for task in self.scheduler.tick() {
            self.run_task(task);
        }

        self.system.update(dt)
    }

    fn run_task(&mut self, task: SceneTask) {
        match task {
            SceneTask::Play { sound } => {
                if let Some(s) = self.sounds.get_mut(sound) {
                    debug!("Auto-play '{}'", s.name);
                    if let Err(e) = s.sound.play() {
                        warn!("Auto-play of '{}' failed: {e}", s.name);
                    }
                }
            },
            SceneTask::AttachEffect {
                sound,
                kind,
                parameters,
            } => {
                if let Some(s) = self.sounds.get_mut(sound) {
                    debug!("Attaching {kind:?} to '{}'", s.name);
                    if let Err(e) = s.sound.add_effect_of(kind, &parameters) {
                        warn!("Attaching {kind:?} to '{}' failed: {e}", s.name);
                    }
                }
            },
        }
    }

    // ============================================
    // Interaction
    // ============================================

    /// Use the closest interactable within `reach` of the listener.
    ///
    /// Plays the object's cue, drops it if it is used up, and returns its
    /// name. `Ok(None)` when nothing is in reach.
    ///
    /// # Errors
    ///
    /// Returns an error if the interaction or its cue fails.
    pub fn interact_nearest(&mut self, reach: f32) -> AudioResult<Option<String>> {
        let origin = self.listener.position;
        let nearest = self
            .interactables
            .iter()
            .enumerate()
            .map(|(i, it)| (i, it.position().distance(origin)))
            .filter(|&(_, distance)| distance <= reach)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        let Some(index) = nearest else {
            return Ok(None);
        };

        let outcome = self.interactables[index].interact()?;
        let name = self.interactables[index].name().to_string();
        if let Some(cue) = &outcome.cue {
            if let Some(sound) = self.sound_mut(cue) {
                sound.play()?;
            }
        }
        if outcome.remove {
            self.interactables.remove(index);
        }
        Ok(Some(name))
    }

    // ============================================
    // Accessors
    // ============================================

    /// Scene name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared audio system.
    #[must_use]
    pub fn system(&self) -> &Arc<AudioSystem> {
        &self.system
    }

    /// Fixed ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.scheduler.current_tick()
    }

    /// Listener transform.
    #[must_use]
    pub fn listener(&self) -> &Transform {
        &self.listener
    }

    /// Move the listener; velocity is derived on the next tick.
    pub fn set_listener(&mut self, transform: Transform) {
        self.listener = transform;
    }

    /// Sound by scene name.
    #[must_use]
    pub fn sound(&self, name: &str) -> Option<&Sound3D> {
        self.sounds.iter().find(|s| s.name == name).map(|s| &s.sound)
    }

    /// Mutable sound by scene name.
    pub fn sound_mut(&mut self, name: &str) -> Option<&mut Sound3D> {
        self.sounds
            .iter_mut()
            .find(|s| s.name == name)
            .map(|s| &mut s.sound)
    }

    /// Move a sound. Returns `false` if there is no such sound.
    pub fn set_sound_transform(&mut self, name: &str, transform: Transform) -> bool {
        match self.sounds.iter_mut().find(|s| s.name == name) {
            Some(s) => {
                s.transform = transform;
                true
            },
            None => false,
        }
    }

    /// Group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&SoundGroup3D> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// Occluder by name.
    #[must_use]
    pub fn geometry(&self, name: &str) -> Option<&AcousticGeometry> {
        self.geometry
            .iter()
            .find(|g| g.name == name)
            .map(|g| &g.geometry)
    }

    /// Move an occluder. Returns `false` if there is no such occluder.
    pub fn set_geometry_transform(&mut self, name: &str, transform: Transform) -> bool {
        match self.geometry.iter_mut().find(|g| g.name == name) {
            Some(g) => {
                g.transform = transform;
                true
            },
            None => false,
        }
    }

    /// Reverb zone by name.
    #[must_use]
    pub fn reverb(&self, name: &str) -> Option<&ReverbZone> {
        self.reverbs.iter().find(|r| r.name == name).map(|r| &r.zone)
    }

    /// Names of the remaining interactables.
    pub fn interactables(&self) -> impl Iterator<Item = &str> + '_ {
        self.interactables.iter().map(|i| i.name())
    }

    /// Occlusion between the listener and a sound.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine query fails.
    pub fn occlusion_of(&self, name: &str) -> AudioResult<Option<Occlusion>> {
        self.sounds
            .iter()
            .find(|s| s.name == name)
            .map(|s| self.system.occlusion(self.listener.position, s.transform.position))
            .transpose()
    }

    /// Sounds currently in the playing state.
    #[must_use]
    pub fn playing_count(&self) -> usize {
        self.sounds
            .iter()
            .filter(|s| s.sound.state() == SoundState::Playing)
            .count()
    }

    /// Nothing is scheduled and no sound channel is running.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.scheduler.is_idle()
            && self
                .sounds
                .iter()
                .all(|s| !matches!(s.sound.is_paused(), Ok(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_description::{SceneError, SoundDesc};
    use labyrinth_audio::ReverbPreset;

    const DT: f32 = 0.02;

    const SCENE: &str = r#"
name = "test"
auto_play_delay_ticks = 2

[[clips]]
name = "drip"
length_ms = 100

[[clips]]
name = "hum"

[[clips]]
name = "creak"
length_ms = 500

[[groups]]
name = "ambience"
volume = 0.5

[[sounds]]
clip = "drip"
group = "ambience"
auto_play = true
transform = { position = [0.1, 0.2, 10.0] }

[[sounds]]
name = "radio"
clip = "hum"
auto_play = true

[[sounds.effects]]
kind = "echo"

[[sounds.effects]]
kind = "lowpass"
delay_ticks = 3
parameters = { cutoff = 800.0 }

[[sounds]]
clip = "creak"

[[geometry]]
name = "wall"
shape = { kind = "box", center = [0.0, 0.0, 0.0], size = [4.0, 4.0, 0.5] }
transform = { position = [0.0, 0.0, 5.0] }
material = { direct = 0.5, reverb = 0.25 }

[[reverbs]]
name = "hall"
preset = "stone_corridor"
min_radius = 2.0
max_radius = 12.0

[[doors]]
name = "exit"
transform = { position = [0.0, 0.0, 2.0] }
cue = "creak"
"#;

    fn scene() -> AudioScene {
        let desc = SceneDescription::from_toml_str(SCENE).expect("valid scene");
        AudioScene::with_software_engine(AudioConfig::default(), &desc).expect("scene")
    }

    fn run(scene: &mut AudioScene, ticks: usize) {
        for _ in 0..ticks {
            scene.tick(DT).expect("tick");
        }
    }

    #[test]
    fn test_build_creates_every_object() {
        let scene = scene();
        assert_eq!(scene.name(), "test");
        assert!(scene.sound("drip").is_some());
        assert!(scene.sound("radio").is_some());
        assert!(scene.group("ambience").is_some());
        assert!(scene.geometry("wall").is_some());
        assert_eq!(
            scene.reverb("hall").expect("reverb").preset(),
            ReverbPreset::StoneCorridor
        );
        assert_eq!(scene.interactables().collect::<Vec<_>>(), vec!["exit"]);
        assert_eq!(scene.sound("radio").expect("radio").effects().len(), 1);
        assert_eq!(
            scene.sound("drip").expect("drip").channel_group(),
            Some(scene.group("ambience").expect("group").id())
        );
    }

    #[test]
    fn test_auto_play_waits_for_its_delay() {
        let mut scene = scene();
        run(&mut scene, 1);
        assert_eq!(scene.playing_count(), 0);
        assert!(!scene.is_quiet());

        // Play runs at the end of tick 2; the probe sees it on tick 3
        run(&mut scene, 2);
        assert_eq!(scene.playing_count(), 2);
        assert_eq!(scene.ticks(), 3);
    }

    #[test]
    fn test_delayed_effect_is_attached() {
        let mut scene = scene();
        run(&mut scene, 2);
        assert_eq!(scene.sound("radio").expect("radio").effects().len(), 1);
        run(&mut scene, 1);
        assert_eq!(scene.sound("radio").expect("radio").effects().len(), 2);
        assert_eq!(scene.system().failure_count(), 0);
    }

    #[test]
    fn test_finite_clip_finishes_and_returns_to_ready() {
        let mut scene = scene();
        // drip is 100 ms, i.e. 5 ticks after it starts
        run(&mut scene, 3);
        assert_eq!(scene.sound("drip").expect("drip").state(), SoundState::Playing);
        run(&mut scene, 8);
        assert_eq!(scene.sound("drip").expect("drip").state(), SoundState::Ready);
        // hum has no length and keeps going
        assert_eq!(scene.sound("radio").expect("radio").state(), SoundState::Playing);
        assert!(!scene.is_quiet());
    }

    #[test]
    fn test_wall_and_door_occlude() {
        let mut scene = scene();
        run(&mut scene, 1);
        let occlusion = scene.occlusion_of("drip").expect("query").expect("known sound");
        // Door slab fully blocks; wall passes through two faces at 0.5 each
        assert!((occlusion.direct - 1.0).abs() < 1e-5);

        scene.set_listener(Transform::from_position(Vec3::new(0.1, 0.2, 0.0)));
        assert_eq!(scene.interact_nearest(1.0).expect("interact"), None);
        assert_eq!(
            scene.interact_nearest(3.0).expect("interact"),
            Some("exit".to_string())
        );
        assert_eq!(scene.interactables().count(), 0);

        let occlusion = scene.occlusion_of("drip").expect("query").expect("known sound");
        assert!((occlusion.direct - 0.75).abs() < 1e-5);
        assert!(scene.occlusion_of("nothing").expect("query").is_none());
    }

    #[test]
    fn test_door_cue_plays() {
        let mut scene = scene();
        scene.set_listener(Transform::from_position(Vec3::new(0.0, 0.0, 1.0)));
        scene.interact_nearest(3.0).expect("interact");
        run(&mut scene, 1);
        assert_eq!(scene.sound("creak").expect("creak").state(), SoundState::Playing);
    }

    #[test]
    fn test_moving_geometry_opens_the_path() {
        let mut scene = scene();
        scene.set_listener(Transform::from_position(Vec3::new(0.1, 0.2, 0.0)));
        scene.interact_nearest(3.0).expect("open door");
        assert!(scene.set_geometry_transform(
            "wall",
            Transform::from_position(Vec3::new(50.0, 0.0, 5.0))
        ));
        assert!(!scene.set_geometry_transform("nothing", Transform::default()));
        run(&mut scene, 1);
        let occlusion = scene.occlusion_of("drip").expect("query").expect("known sound");
        assert_eq!(occlusion.direct, 0.0);
    }

    #[test]
    fn test_broken_occluder_does_not_stall_the_tick() {
        let mut scene = scene();
        run(&mut scene, 1);

        let moved = Vec3::new(5.0, 0.0, 0.0);
        assert!(scene.set_sound_transform("drip", Transform::from_position(moved)));
        assert!(scene.set_geometry_transform(
            "wall",
            Transform {
                forward: Vec3::ZERO,
                ..Transform::from_position(Vec3::new(0.0, 0.0, 5.0))
            }
        ));
        scene.tick(DT).expect("tick survives a bad occluder");

        let channel = scene.sound("drip").expect("drip").channel_id().expect("channel");
        let (position, _) = scene
            .system()
            .channel(channel)
            .attributes_3d()
            .expect("attributes");
        assert_eq!(position, moved);
        assert_eq!(scene.ticks(), 2);
        assert!(scene.system().failure_count() > 0);
    }

    #[test]
    fn test_footsteps_follow_listener_speed() {
        let desc = SceneDescription::from_toml_str(
            "[[clips]]\nname = \"steps\"\n\n[[sounds]]\nclip = \"steps\"\nfootstep_speed = 4.0\n",
        )
        .expect("valid scene");
        let mut scene =
            AudioScene::with_software_engine(AudioConfig::default(), &desc).expect("scene");
        run(&mut scene, 1);
        let standing = scene.sound("steps").expect("steps").params.pitch;
        assert!((standing - 0.5).abs() < f32::EPSILON);

        let stride = Vec3::new(0.08, 0.0, 0.0);
        scene.set_listener(Transform::from_position(stride));
        run(&mut scene, 1);
        let steps = scene.sound("steps").expect("steps");
        assert!((steps.params.pitch - 1.0).abs() < 1e-3);
        let channel = steps.channel_id().expect("channel");
        let ctl = scene.system().channel(channel);
        assert!((ctl.pitch().expect("pitch") - steps.params.pitch).abs() < f32::EPSILON);
        assert_eq!(ctl.attributes_3d().expect("attributes").0, stride);
    }

    #[test]
    fn test_quiet_after_everything_finishes() {
        let mut desc = SceneDescription::from_toml_str(
            "[[clips]]\nname = \"drip\"\nlength_ms = 60\n\n[[sounds]]\nclip = \"drip\"\nauto_play = true\n",
        )
        .expect("valid scene");
        desc.auto_play_delay_ticks = 1;
        let mut scene =
            AudioScene::with_software_engine(AudioConfig::default(), &desc).expect("scene");
        assert!(!scene.is_quiet());
        run(&mut scene, 1);
        assert!(!scene.is_quiet());
        run(&mut scene, 6);
        assert!(scene.is_quiet());
    }

    #[test]
    fn test_radio_chain_attaches_after_delay() {
        let mut desc = SceneDescription::default();
        desc.clips.push(crate::scene_description::ClipDesc {
            name: "hum".to_string(),
            length_ms: None,
            frequency: None,
        });
        desc.sounds.push(SoundDesc {
            clip: "hum".to_string(),
            auto_play: true,
            radio: true,
            ..SoundDesc::default()
        });
        desc.expand_presets(DT);
        let mut scene =
            AudioScene::with_software_engine(AudioConfig::default(), &desc).expect("scene");

        run(&mut scene, 4);
        assert!(scene.sound("hum").expect("hum").effects().is_empty());
        run(&mut scene, 1);
        let effects = scene.sound("hum").expect("hum").effects().to_vec();
        assert_eq!(effects.len(), 2);
        assert_eq!(scene.system().dsp(effects[0]).kind().expect("kind"), DspType::Distortion);
        assert_eq!(scene.system().dsp(effects[1]).kind().expect("kind"), DspType::Highpass);
    }

    #[test]
    fn test_maze_scene_runs_clean() {
        let mut desc = SceneDescription::from_toml_str(include_str!("../../../scenes/maze.toml"))
            .expect("maze scene");
        desc.expand_presets(DT);
        let mut scene =
            AudioScene::with_software_engine(AudioConfig::default(), &desc).expect("scene");
        run(&mut scene, 12);
        assert_eq!(scene.playing_count(), 3);
        assert_eq!(scene.sound("radio").expect("radio").effects().len(), 2);
        assert_eq!(scene.sound("trap").expect("trap").effects().len(), 1);

        let trap = scene.sound_mut("trap").expect("trap");
        let mut steps = 0;
        while trap.raise_pitch(1.0, labyrinth_audio::PITCH_CEILING) {
            steps += 1;
        }
        assert_eq!(steps, 4);
        run(&mut scene, 1);
        assert_eq!(scene.system().failure_count(), 0);
    }

    #[test]
    fn test_missing_clip_fails_the_build() {
        let desc = SceneDescription::from_toml_str("[[sounds]]\nclip = \"absent\"\n")
            .expect("valid scene");
        let config = AudioConfig::default().with_audio_root("/nonexistent");
        let err = AudioScene::with_software_engine(config, &desc).expect_err("no asset");
        assert!(matches!(err, SceneError::Audio(_)));
    }
}

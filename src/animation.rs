use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::model::Buffers;
use crate::scene_graph::object3d::ObjectId;
use crate::scene_graph::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

pub enum ChannelValues {
    Translations(Vec<Vec3>),
    Rotations(Vec<Quat>),
    // Uniform scale, like the rest of the scene graph.
    Scales(Vec<f32>),
}

pub struct Channel {
    pub target: ObjectId,
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

/// Extracts every clip in the document, retargeted onto the spawned
/// objects through `node_map`. Channels pointing at nodes that were not
/// spawned are skipped.
pub fn clips_from_gltf(
    document: &gltf::Document,
    buffers: Buffers,
    node_map: &HashMap<usize, ObjectId>,
) -> Vec<AnimationClip> {
    let mut clips = Vec::new();

    for (index, animation) in document.animations().enumerate() {
        let name = animation
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("clip {}", index));

        let mut duration = 0.0f32;
        let mut channels = Vec::new();

        for channel in animation.channels() {
            let Some(&target) = node_map.get(&channel.target().node().index()) else {
                continue;
            };

            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            let Some(outputs) = reader.read_outputs() else {
                continue;
            };

            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => Interpolation::Step,
                // Cubic tangents are dropped; the value keys still play.
                _ => Interpolation::Linear,
            };
            let cubic = channel.sampler().interpolation()
                == gltf::animation::Interpolation::CubicSpline;

            let values = match outputs {
                gltf::animation::util::ReadOutputs::Translations(iter) => {
                    ChannelValues::Translations(strided(iter.map(Vec3::from), cubic))
                }
                gltf::animation::util::ReadOutputs::Rotations(iter) => ChannelValues::Rotations(
                    strided(iter.into_f32().map(Quat::from_array), cubic),
                ),
                gltf::animation::util::ReadOutputs::Scales(iter) => {
                    ChannelValues::Scales(strided(iter.map(|s| s[0]), cubic))
                }
                gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => continue,
            };

            if let Some(&last) = times.last() {
                duration = duration.max(last);
            }

            channels.push(Channel {
                target,
                times,
                values,
                interpolation,
            });
        }

        if !channels.is_empty() {
            clips.push(AnimationClip {
                name,
                duration,
                channels,
            });
        }
    }

    clips
}

/// Cubic-spline samplers store in-tangent, value, out-tangent triplets;
/// keep only the value keys.
fn strided<T>(iter: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        iter.skip(1).step_by(3).collect()
    } else {
        iter.collect()
    }
}

/// Advances one clip in a loop and writes the sampled TRS onto the
/// targeted scene objects. Replaced wholesale on every model reload.
pub struct AnimationMixer {
    clip: AnimationClip,
    time: f32,
}

impl AnimationMixer {
    pub fn new(clip: AnimationClip) -> Self {
        Self { clip, time: 0.0 }
    }

    pub fn clip_name(&self) -> &str {
        &self.clip.name
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        if self.clip.duration <= 0.0 {
            return;
        }

        self.time = (self.time + dt) % self.clip.duration;

        for channel in &self.clip.channels {
            let Some((index, alpha)) = sample_keyframes(&channel.times, self.time) else {
                continue;
            };
            let alpha = match channel.interpolation {
                Interpolation::Linear => alpha,
                Interpolation::Step => 0.0,
            };

            match &channel.values {
                ChannelValues::Translations(values) => {
                    let value = lerp_keys(values, index, alpha, Vec3::lerp);
                    scene.set_object_translation(channel.target, value);
                }
                ChannelValues::Rotations(values) => {
                    let value = lerp_keys(values, index, alpha, |a, b, t| a.slerp(b, t));
                    scene.set_object_rotation(channel.target, value);
                }
                ChannelValues::Scales(values) => {
                    let value = lerp_keys(values, index, alpha, |a, b, t| a + (b - a) * t);
                    scene.set_object_scale(channel.target, value);
                }
            }
        }
    }
}

/// Returns the keyframe index at or before `time` and the interpolation
/// factor toward the next keyframe.
fn sample_keyframes(times: &[f32], time: f32) -> Option<(usize, f32)> {
    if times.is_empty() {
        return None;
    }
    if time <= times[0] {
        return Some((0, 0.0));
    }
    if time >= times[times.len() - 1] {
        return Some((times.len() - 1, 0.0));
    }

    let next = times.partition_point(|&t| t <= time);
    let index = next - 1;
    let span = times[next] - times[index];
    let alpha = if span > 0.0 {
        (time - times[index]) / span
    } else {
        0.0
    };
    Some((index, alpha))
}

fn lerp_keys<T: Copy>(values: &[T], index: usize, alpha: f32, lerp: impl Fn(T, T, f32) -> T) -> T {
    if alpha <= 0.0 || index + 1 >= values.len() {
        values[index.min(values.len() - 1)]
    } else {
        lerp(values[index], values[index + 1], alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::object3d::Object3D;

    fn translation_clip(target: ObjectId) -> AnimationClip {
        AnimationClip {
            name: "move".to_string(),
            duration: 2.0,
            channels: vec![Channel {
                target,
                times: vec![0.0, 1.0, 2.0],
                values: ChannelValues::Translations(vec![
                    Vec3::ZERO,
                    Vec3::new(0.0, 1.0, 0.0),
                    Vec3::ZERO,
                ]),
                interpolation: Interpolation::Linear,
            }],
        }
    }

    #[test]
    fn nonzero_dt_advances_clip_time() {
        let mut scene = Scene::new();
        let target = scene.add_root_object(Object3D::named("node"));
        let mut mixer = AnimationMixer::new(translation_clip(target));

        mixer.update(0.5, &mut scene);
        assert!((mixer.time() - 0.5).abs() < 1e-6);
        let y = scene.objects[&target].transform.translation().y;
        assert!((y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn playback_loops_at_duration() {
        let mut scene = Scene::new();
        let target = scene.add_root_object(Object3D::named("node"));
        let mut mixer = AnimationMixer::new(translation_clip(target));

        mixer.update(2.5, &mut scene);
        assert!((mixer.time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn step_interpolation_holds_previous_key() {
        let mut scene = Scene::new();
        let target = scene.add_root_object(Object3D::named("node"));
        let mut clip = translation_clip(target);
        clip.channels[0].interpolation = Interpolation::Step;
        let mut mixer = AnimationMixer::new(clip);

        mixer.update(0.5, &mut scene);
        let y = scene.objects[&target].transform.translation().y;
        assert_eq!(y, 0.0);
    }

    #[test]
    fn keyframe_sampling_brackets_time() {
        let times = [0.0, 1.0, 2.0];
        assert_eq!(sample_keyframes(&times, -1.0), Some((0, 0.0)));
        assert_eq!(sample_keyframes(&times, 0.25), Some((0, 0.25)));
        assert_eq!(sample_keyframes(&times, 1.5), Some((1, 0.5)));
        assert_eq!(sample_keyframes(&times, 5.0), Some((2, 0.0)));
        assert_eq!(sample_keyframes(&[], 0.0), None);
    }
}

use core::f32::consts::TAU;
use std::collections::HashMap;
use std::rc::Rc;

use crate::coords::Vec2;
use crate::paint::Color;
use crate::scene::ObjectId;

/// Resolved particle emitter parameters for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    pub count: u32,
    /// Particles spawn uniformly inside this radius.
    pub spawn_radius: f32,
    /// Outward drift in units per second.
    pub speed: f32,
    /// Seconds from spawn to fade-out.
    pub lifetime: f32,
    pub size: f32,
    pub color: Color,
    pub seed: u32,
}

/// One particle at one instant, relative to the emitter origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub offset: Vec2,
    pub size: f32,
    pub alpha: f32,
}

fn hash(mut x: u32) -> u32 {
    x = (x ^ 61) ^ (x >> 16);
    x = x.wrapping_mul(9);
    x ^= x >> 4;
    x = x.wrapping_mul(0x27d4_eb2d);
    x ^ (x >> 15)
}

#[inline]
fn unit(h: u32) -> f32 {
    (h >> 8) as f32 / (1u32 << 24) as f32
}

impl EmitterConfig {
    /// State of particle `i` at `time`. Pure: no per-particle storage exists.
    pub fn particle(&self, i: u32, time: f32) -> Particle {
        let h = hash(self.seed ^ i.wrapping_mul(0x9e37_79b9));
        let dir = Vec2::from_angle(unit(h) * TAU);
        let phase = unit(hash(h));
        let jitter = 0.5 + unit(hash(h.wrapping_add(1)));
        let lifetime = self.lifetime.max(0.05);

        let age = (time / lifetime + phase).rem_euclid(1.0);
        let start = dir * (self.spawn_radius * unit(hash(h.wrapping_add(2))).sqrt());
        let drift = dir * (self.speed * jitter * age * lifetime);
        let sway = dir.perp() * ((time * 2.0 + phase * TAU).sin() * self.size * 0.5);

        Particle {
            offset: start + drift + sway,
            size: self.size * (1.0 - 0.5 * age),
            alpha: (1.0 - age) * (age * 4.0).min(1.0),
        }
    }

    pub fn particles(&self, time: f32) -> impl Iterator<Item = Particle> + '_ {
        (0..self.count).map(move |i| self.particle(i, time))
    }
}

struct Cached {
    version: u64,
    config: Rc<EmitterConfig>,
}

/// Emitter configs keyed by object, rebuilt exactly when the object's version changes.
#[derive(Default)]
pub struct EmitterConfigCache {
    entries: HashMap<ObjectId, Cached>,
    recomputes: u64,
}

impl EmitterConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached config for `(id, version)`, computing it with `build` on a miss.
    pub fn get_or_insert_with(
        &mut self,
        id: ObjectId,
        version: u64,
        build: impl FnOnce() -> EmitterConfig,
    ) -> Rc<EmitterConfig> {
        if let Some(cached) = self.entries.get(&id).filter(|c| c.version == version) {
            return Rc::clone(&cached.config);
        }
        self.recomputes += 1;
        let config = Rc::new(build());
        self.entries.insert(id, Cached { version, config: Rc::clone(&config) });
        config
    }

    pub fn forget(&mut self, id: ObjectId) {
        self.entries.remove(&id);
    }

    /// Number of live emitters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of particle counts over all emitters.
    pub fn total_capacity(&self) -> u64 {
        self.entries.values().map(|c| c.config.count as u64).sum()
    }

    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }
}

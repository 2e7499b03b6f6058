//! A small siege: towers on a winding road shoot at creeps walking along it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

use bastion_engine::assets::ThreadedImageLoader;
use bastion_engine::bridge::LocalDataBridge;
use bastion_engine::bullets::{BulletRenderBridge, BulletShape, BulletSlotHandle, BulletVisualConfig};
use bastion_engine::config::BastionConfig;
use bastion_engine::coords::Vec2;
use bastion_engine::core::{App, AppControl, FrameCtx};
use bastion_engine::debug::{DebugStats, StatsOverlay};
use bastion_engine::paint::{Color, ColorSpec};
use bastion_engine::scene::{FrameParams, SceneObjectData, SceneObjectInstance, SceneObjectRef, SceneRegistry, ZIndex};
use bastion_engine::FrameRenderer;

const ROAD: [Vec2; 6] = [
    Vec2::new(-40.0, 160.0),
    Vec2::new(320.0, 160.0),
    Vec2::new(320.0, 480.0),
    Vec2::new(760.0, 480.0),
    Vec2::new(760.0, 240.0),
    Vec2::new(1320.0, 240.0),
];

const CREEP_SPEED: f32 = 70.0;
const BULLET_SPEED: f32 = 420.0;
const BULLET_LIFE: f32 = 1.5;
const FIRE_INTERVAL: f32 = 0.45;
const TOWER_RANGE: f32 = 260.0;

struct Creep {
    object: SceneObjectRef,
    distance: f32,
}

struct Tower {
    position: Vec2,
    visual: &'static str,
    cooldown: f32,
}

struct Bullet {
    handle: BulletSlotHandle,
    position: Vec2,
    velocity: Vec2,
    age: f32,
}

struct Impact {
    _object: SceneObjectRef,
    expires: f32,
}

pub struct SiegeDemo {
    renderer: FrameRenderer,
    scene: SceneRegistry,
    bullets: BulletRenderBridge,
    bridge: Rc<RefCell<LocalDataBridge>>,
    intensity_key: String,

    stats: DebugStats,
    overlay: Option<StatsOverlay>,
    clear: Color,

    // Kept alive so the registry keeps drawing them.
    statics: Vec<SceneObjectRef>,
    creeps: Vec<Creep>,
    towers: Vec<Tower>,
    shots: Vec<Bullet>,
    impacts: Vec<Impact>,
    spawn_timer: f32,
}

impl SiegeDemo {
    pub fn new(config: &BastionConfig) -> Self {
        let bridge = Rc::new(RefCell::new(LocalDataBridge::new()));
        let loader = ThreadedImageLoader::new(config.assets.loader_threads);
        let renderer = FrameRenderer::new(config, Box::new(loader), bridge.clone());

        let mut bullets = BulletRenderBridge::new(config.bullets.capacity_per_batch);
        for (key, visual) in &config.bullets.visuals {
            bullets.register_visual(key, visual);
        }
        for (key, visual) in default_visuals() {
            if bullets.visual(key).is_none() {
                bullets.register_visual(key, &visual);
            }
        }

        let overlay = config
            .debug
            .overlay
            .then(|| StatsOverlay::new(Duration::from_millis(config.debug.poll_interval_ms)));

        let mut demo = Self {
            renderer,
            scene: SceneRegistry::new(),
            bullets,
            bridge,
            intensity_key: config.radiation.intensity_key.clone(),
            stats: DebugStats::default(),
            overlay,
            clear: config.window.clear_color(),
            statics: Vec::new(),
            creeps: Vec::new(),
            towers: Vec::new(),
            shots: Vec::new(),
            impacts: Vec::new(),
            spawn_timer: 0.0,
        };
        demo.build_map();
        demo
    }

    fn spawn(&mut self, kind: &str, position: Vec2, z: ZIndex, custom: serde_json::Value) -> SceneObjectRef {
        let object = SceneObjectInstance::new(
            kind,
            SceneObjectData { position, z, custom, ..Default::default() },
        )
        .into_ref();
        self.scene.add(&object);
        object
    }

    fn build_map(&mut self) {
        let road: Vec<[f32; 2]> = ROAD.iter().map(|p| [p.x, p.y]).collect();
        for pair in road.windows(2) {
            let (a, b) = (Vec2::from(pair[0]), Vec2::from(pair[1]));
            let half = (b - a).try_normalize().unwrap_or(Vec2::zero()).perp() * 22.0;
            let slab = [a + half, b + half, b - half, a - half];
            let object = self.spawn(
                "polygon",
                Vec2::zero(),
                ZIndex::GROUND,
                json!({ "points": slab.map(|p| [p.x, p.y]), "fill": "#3b3326" }),
            );
            self.statics.push(object);
        }

        let towers = [
            (Vec2::new(200.0, 300.0), "arrow", "#8fa3b8"),
            (Vec2::new(540.0, 360.0), "frost", "#6fd3ff"),
            (Vec2::new(920.0, 360.0), "arrow", "#8fa3b8"),
        ];
        for (position, visual, color) in towers {
            let glow = if visual == "frost" { "#6fd3ff40" } else { "#ffd27a30" };
            let base = self.spawn(
                "polygon",
                position,
                ZIndex::UNITS,
                json!({ "sides": 6, "radius": 26, "fill": color, "stroke_width": 3, "stroke_color": "#1c2129" }),
            );
            let aura = self.spawn(
                "aura",
                position,
                ZIndex::GROUND,
                json!({
                    "radius": 60,
                    "color": glow,
                    "layers": [{ "type": "glow", "radius_scale": 1.0 }, { "type": "ring", "radius_scale": 1.2, "width": 2.0 }],
                    "particles": { "count": 10 },
                }),
            );
            self.statics.extend([base, aura]);
            self.towers.push(Tower { position, visual, cooldown: 0.0 });
        }

        let keep = self.spawn(
            "sprite",
            Vec2::new(1220.0, 240.0),
            ZIndex::UNITS,
            json!({ "image": "images/keep.png", "width": 96, "height": 96 }),
        );
        let lurker = self.spawn(
            "tentacle",
            Vec2::new(640.0, 620.0),
            ZIndex::UNITS,
            json!({ "length": 140, "segments": 12, "color": "#5b2a6e" }),
        );
        self.statics.extend([keep, lurker]);
    }

    fn spawn_creep(&mut self) {
        let object = self.spawn(
            "circle",
            ROAD[0],
            ZIndex::UNITS,
            json!({ "radius": 12, "fill": "#c0392b", "pulse": { "amplitude": 0.15, "speed": 2.0 } }),
        );
        self.creeps.push(Creep { object, distance: 0.0 });
    }

    fn update(&mut self, time: f32, dt: f32) {
        self.spawn_timer -= dt;
        if self.spawn_timer <= 0.0 {
            self.spawn_creep();
            self.spawn_timer = 1.2;
        }

        for creep in &mut self.creeps {
            creep.distance += CREEP_SPEED * dt;
            if let Some(p) = point_along(&ROAD, creep.distance) {
                creep.object.borrow_mut().move_to(p);
            }
        }
        let road_length = path_length(&ROAD);
        self.creeps.retain(|c| c.distance < road_length);

        self.fire(dt);
        self.move_bullets(time, dt);
        self.impacts.retain(|i| i.expires > time);

        // Radiation storms roll over the map every half minute.
        let storm = ((time * std::f32::consts::TAU / 30.0).sin() - 0.4).max(0.0) / 0.6;
        self.bridge.borrow_mut().set_value(&self.intensity_key, storm * 0.8);
    }

    fn fire(&mut self, dt: f32) {
        for i in 0..self.towers.len() {
            let tower = &mut self.towers[i];
            tower.cooldown -= dt;
            if tower.cooldown > 0.0 {
                continue;
            }
            let origin = tower.position;
            let target = self
                .creeps
                .iter()
                .map(|c| c.object.borrow().data().position)
                .filter(|p| p.distance(origin) <= TOWER_RANGE)
                .min_by(|a, b| a.distance(origin).total_cmp(&b.distance(origin)));
            let Some(target) = target else { continue };
            tower.cooldown = FIRE_INTERVAL;

            let handle = match self.bullets.acquire_slot(tower.visual) {
                Ok(Some(handle)) => handle,
                Ok(None) => continue,
                Err(err) => {
                    log::error!("tower cannot fire: {err}");
                    continue;
                }
            };
            let velocity = (target - origin).try_normalize().unwrap_or(Vec2::new(1.0, 0.0)) * BULLET_SPEED;
            self.shots.push(Bullet { handle, position: origin, velocity, age: 0.0 });
        }
    }

    fn move_bullets(&mut self, time: f32, dt: f32) {
        let mut i = 0;
        while i < self.shots.len() {
            let shot = &mut self.shots[i];
            shot.age += dt;
            shot.position = shot.position + shot.velocity * dt;

            let hit = self
                .creeps
                .iter()
                .any(|c| c.object.borrow().data().position.distance(shot.position) < 14.0);
            if hit || shot.age > BULLET_LIFE {
                let shot = self.shots.swap_remove(i);
                if hit {
                    self.impact(shot.position, time);
                }
                if let Err(err) = self.bullets.release_slot(shot.handle) {
                    log::warn!("bullet release failed: {err}");
                }
                continue;
            }

            let heading = shot.velocity.y.atan2(shot.velocity.x);
            let spin = shot.age * 12.0;
            if let Err(err) = self.bullets.update_slot(&shot.handle, shot.position, heading, heading + spin, 4.0, true) {
                log::warn!("bullet update failed: {err}");
            }
            i += 1;
        }
    }

    fn impact(&mut self, position: Vec2, time: f32) {
        let object = self.spawn(
            "spell_ring",
            position,
            ZIndex::EFFECTS,
            json!({ "radius": 4, "max_radius": 26, "width": 3, "color": "#ffe9a8", "duration": 0.35, "repeat": false, "start_time": time }),
        );
        self.impacts.push(Impact { _object: object, expires: time + 0.4 });
    }
}

impl App for SiegeDemo {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { logical_key: Key::Named(NamedKey::Escape), state: ElementState::Pressed, .. },
                ..
            } => AppControl::Exit,
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let time = ctx.time.elapsed;
        self.update(time, ctx.time.dt);

        self.renderer.set_viewport(ctx.window.viewport());
        let frame = FrameParams { time, dt: ctx.time.dt, alpha: 1.0 };

        let control = ctx.render(self.clear, |gl| {
            if let Err(err) = self.renderer.render(gl, &frame, &mut self.scene, &mut self.bullets, &mut self.stats) {
                log::error!("scene registration failed: {err}");
            }
        });

        if let Some(overlay) = self.overlay.as_mut() {
            if let Some(snapshot) = overlay.poll(ctx.time.now, &self.stats) {
                log::info!(
                    "draws {} | objects {} | bullets {} | textures {} | vbo {} B",
                    snapshot.stats.draw_calls,
                    snapshot.stats.scene_objects,
                    snapshot.stats.live_bullets,
                    snapshot.stats.textures_cached,
                    snapshot.stats.vbo_bytes,
                );
                ctx.runtime.set_title(format!("bastion - {} creeps", self.creeps.len()));
            }
        }
        control
    }
}

fn default_visuals() -> [(&'static str, BulletVisualConfig); 2] {
    [
        (
            "arrow",
            BulletVisualConfig { shape: BulletShape::Bolt, ..BulletVisualConfig::default() },
        ),
        (
            "frost",
            BulletVisualConfig {
                shape: BulletShape::Orb,
                core_color: ColorSpec::Hex("#dff6ff".into()),
                tail_color: ColorSpec::Hex("#6fd3ff80".into()),
                ..BulletVisualConfig::default()
            },
        ),
    ]
}

fn path_length(path: &[Vec2]) -> f32 {
    path.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Point `distance` along `path`, or `None` past its end.
fn point_along(path: &[Vec2], mut distance: f32) -> Option<Vec2> {
    for w in path.windows(2) {
        let len = w[0].distance(w[1]);
        if distance <= len {
            let t = if len > 0.0 { distance / len } else { 0.0 };
            return Some(w[0].lerp(w[1], t));
        }
        distance -= len;
    }
    None
}

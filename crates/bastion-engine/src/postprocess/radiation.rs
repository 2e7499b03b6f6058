use serde::{Deserialize, Serialize};

use crate::gpu::{
    ContextId, DrawCall, GpuBackend, ProgramDesc, ProgramId, RenderTargetId, UniformLocation, UniformValue,
};

const PROGRAM: ProgramDesc = ProgramDesc {
    label: "bastion radiation",
    wgsl: include_str!("shaders/radiation.wgsl"),
    uniforms: &["u_time", "u_intensity", "u_resolution", "u_wave", "u_jitter", "u_bands"],
};

/// Per-frame inputs of the radiation effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiationParams {
    /// Seconds; drives wave and band animation.
    pub time: f32,
    /// `0` disables the pass entirely.
    pub intensity: f32,
    /// Horizontal wave displacement in pixels.
    pub wave_amplitude: f32,
    pub wave_frequency: f32,
    /// Per-row random displacement in pixels.
    pub jitter: f32,
    pub band_density: f32,
    pub band_speed: f32,
}

impl Default for RadiationParams {
    fn default() -> Self {
        Self {
            time: 0.0,
            intensity: 0.0,
            wave_amplitude: 4.0,
            wave_frequency: 40.0,
            jitter: 2.0,
            band_density: 120.0,
            band_speed: 2.5,
        }
    }
}

impl RadiationParams {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.intensity > 0.0
    }
}

/// Observable lifecycle of [`RadiationPostProcess`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RadiationState {
    Uninitialized,
    /// Program and render target exist for the current context.
    Ready,
    /// Scene draws are being captured into the offscreen target.
    Capturing,
    /// Resource creation failed on this context; the pass is skipped.
    Unavailable,
}

#[derive(Debug, Default, Clone, Copy)]
struct Uniforms {
    time: Option<UniformLocation>,
    intensity: Option<UniformLocation>,
    resolution: Option<UniformLocation>,
    wave: Option<UniformLocation>,
    jitter: Option<UniformLocation>,
    bands: Option<UniformLocation>,
}

#[derive(Debug)]
struct Resources {
    program: ProgramId,
    target: RenderTargetId,
    width: u32,
    height: u32,
    uniforms: Uniforms,
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready { context: ContextId, res: Resources, capturing: bool },
    Unavailable { context: ContextId },
}

/// Screen-space distortion applied over the whole scene.
///
/// `begin_frame` redirects scene draws into an offscreen target; `render`
/// composites that target to the surface through the radiation program.
#[derive(Debug)]
pub struct RadiationPostProcess {
    state: State,
}

impl Default for RadiationPostProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl RadiationPostProcess {
    pub fn new() -> Self {
        Self { state: State::Uninitialized }
    }

    pub fn state(&self) -> RadiationState {
        match &self.state {
            State::Uninitialized => RadiationState::Uninitialized,
            State::Ready { capturing: false, .. } => RadiationState::Ready,
            State::Ready { capturing: true, .. } => RadiationState::Capturing,
            State::Unavailable { .. } => RadiationState::Unavailable,
        }
    }

    /// Prepares resources and binds the offscreen target. Returns `false` when
    /// the pass is unavailable; scene draws then go straight to the surface.
    pub fn begin_frame(&mut self, gl: &mut dyn GpuBackend, width: u32, height: u32) -> bool {
        let ctx = gl.context_id();
        let (width, height) = (width.max(1), height.max(1));

        let stale = match &self.state {
            State::Ready { context, .. } | State::Unavailable { context } => *context != ctx,
            State::Uninitialized => false,
        };
        if stale {
            log::debug!("radiation: context changed, rebuilding");
            self.state = State::Uninitialized;
        }

        if matches!(self.state, State::Uninitialized) {
            self.state = match create_resources(gl, width, height) {
                Some(res) => State::Ready { context: ctx, res, capturing: false },
                None => State::Unavailable { context: ctx },
            };
        }

        let State::Ready { res, capturing, .. } = &mut self.state else {
            return false;
        };

        if (res.width, res.height) != (width, height) {
            gl.delete_render_target(res.target);
            match gl.create_render_target(width, height) {
                Some(target) => {
                    res.target = target;
                    res.width = width;
                    res.height = height;
                }
                None => {
                    log::warn!("radiation: resize to {width}x{height} failed; pass disabled");
                    gl.delete_program(res.program);
                    self.state = State::Unavailable { context: ctx };
                    return false;
                }
            }
        }

        gl.bind_render_target(Some(res.target));
        *capturing = true;
        true
    }

    /// Composites the captured scene to the surface.
    ///
    /// With `intensity <= 0` this does nothing at all: no draw, no target change.
    /// Returns `true` when a draw was issued.
    pub fn render(&mut self, gl: &mut dyn GpuBackend, params: &RadiationParams) -> bool {
        if !params.is_active() {
            return false;
        }
        let ctx = gl.context_id();
        let State::Ready { context, res, capturing } = &mut self.state else {
            return false;
        };
        if *context != ctx || !*capturing {
            return false;
        }

        gl.bind_render_target(None);

        let u = res.uniforms;
        set_uniform(gl, u.time, UniformValue::F32(params.time));
        set_uniform(gl, u.intensity, UniformValue::F32(params.intensity.min(1.0)));
        set_uniform(gl, u.resolution, UniformValue::Vec2([res.width as f32, res.height as f32]));
        set_uniform(gl, u.wave, UniformValue::Vec2([params.wave_amplitude, params.wave_frequency]));
        set_uniform(gl, u.jitter, UniformValue::F32(params.jitter));
        set_uniform(gl, u.bands, UniformValue::Vec2([params.band_density, params.band_speed]));

        gl.draw(&DrawCall::Fullscreen { program: res.program, source: res.target });
        *capturing = false;
        true
    }

    /// Releases GPU objects and returns to [`RadiationState::Uninitialized`].
    pub fn dispose(&mut self, gl: &mut dyn GpuBackend) {
        if let State::Ready { context, res, capturing } = &self.state {
            if *context == gl.context_id() {
                if *capturing && gl.bound_render_target() == Some(res.target) {
                    gl.bind_render_target(None);
                }
                gl.delete_render_target(res.target);
                gl.delete_program(res.program);
            }
        }
        self.state = State::Uninitialized;
    }
}

/// Optimized programs may drop unused uniforms; a missing location is skipped.
fn set_uniform(gl: &mut dyn GpuBackend, location: Option<UniformLocation>, value: UniformValue) {
    if let Some(location) = location {
        gl.set_uniform(location, value);
    }
}

fn create_resources(gl: &mut dyn GpuBackend, width: u32, height: u32) -> Option<Resources> {
    let Some(program) = gl.create_program(&PROGRAM) else {
        log::warn!("radiation: program creation failed; pass disabled");
        return None;
    };
    let Some(target) = gl.create_render_target(width, height) else {
        log::warn!("radiation: offscreen target creation failed; pass disabled");
        gl.delete_program(program);
        return None;
    };
    let uniforms = Uniforms {
        time: gl.uniform_location(program, "u_time"),
        intensity: gl.uniform_location(program, "u_intensity"),
        resolution: gl.uniform_location(program, "u_resolution"),
        wave: gl.uniform_location(program, "u_wave"),
        jitter: gl.uniform_location(program, "u_jitter"),
        bands: gl.uniform_location(program, "u_bands"),
    };
    log::debug!("radiation: resources ready ({width}x{height})");
    Some(Resources { program, target, width, height, uniforms })
}

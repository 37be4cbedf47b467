use crate::config::AppConfig;
use crate::scripted_input::{demo_steps, ScriptedInputPlayer};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};
use xrinteract_core::{FixedStepClock, SimTick};
use xrinteract_input::InputState;
use xrinteract_testkit::{EventRecord, JsonlSink, RunSummary, StandardRig, CUBE_POSITION};

pub struct HeadlessConfig {
    pub app: AppConfig,
    pub scripted_input: Option<PathBuf>,
    pub event_log: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub exit_when_script_finished: bool,
}

pub fn run(cfg: HeadlessConfig) -> Result<RunSummary> {
    let mouse = cfg.app.interaction.mouse_interactor;
    let mut player = match &cfg.scripted_input {
        Some(path) => ScriptedInputPlayer::from_path(path)?,
        None => ScriptedInputPlayer::from_steps(demo_steps(CUBE_POSITION, mouse))?,
    };
    let mut sink = match &cfg.event_log {
        Some(path) => Some(JsonlSink::create(path)?),
        None => None,
    };

    let render_dt = 1.0 / cfg.app.run.render_hz.max(1.0);
    let mut clock = FixedStepClock::new(1.0 / cfg.app.run.physics_hz.max(1.0));
    let mut rig = StandardRig::with_config(cfg.app.interaction);
    let mut input = InputState::new();
    let mut summary = RunSummary::new(
        cfg.scripted_input
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "demo".to_owned()),
    );
    let mut tick = SimTick::ZERO;

    info!(render_dt, fixed_dt = clock.fixed_dt(), "Headless run starting");
    while summary.frames < cfg.app.run.max_frames {
        input.begin_frame();
        player.advance(render_dt, &mut input);
        let step = clock.advance(render_dt);

        rig.ctx.update(step.dt, &input);
        for _ in 0..step.physics_steps {
            rig.ctx.fixed_update(step.fixed_dt);
        }
        summary.physics_steps += u64::from(step.physics_steps);

        let time = rig.ctx.now();
        for event in rig.ctx.drain_pointer_events() {
            summary.record_pointer(&event);
            if let Some(sink) = sink.as_mut() {
                sink.write(&EventRecord::pointer(tick, time, &event)?)?;
            }
        }
        for event in rig.ctx.drain_events() {
            summary.record_lifecycle(&event);
            if let Some(sink) = sink.as_mut() {
                sink.write(&EventRecord::lifecycle(tick, time, &event)?)?;
            }
        }
        let requests = rig.ctx.drain_requests();
        if !requests.is_empty() {
            debug!(?requests, tick = tick.0, "platform requests");
        }
        summary.requests += requests.len() as u64;

        summary.frames += 1;
        tick = tick.advance(1);
        if cfg.exit_when_script_finished && player.is_finished() {
            break;
        }
    }
    summary.final_modality = rig.ctx.arbitrator().active();

    if let Some(sink) = sink.as_mut() {
        sink.flush()?;
    }
    if let Some(path) = &cfg.summary {
        summary
            .save(path)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
    }
    info!(frames = summary.frames, "Headless run finished");
    Ok(summary)
}

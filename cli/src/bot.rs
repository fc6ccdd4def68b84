use piecework_core::{InteractionEvent, ManualClock, Point, PuzzleSession};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub(super) struct BotRunConfig {
    pub think_min_ms: u64,
    pub think_max_ms: u64,
    pub drag_min_ms: u64,
    pub drag_max_ms: u64,
    pub tick_ms: u64,
    pub miss_rate: f32,
    pub jitter_px: f32,
}

impl Default for BotRunConfig {
    fn default() -> Self {
        Self {
            think_min_ms: 384,
            think_max_ms: 1901,
            drag_min_ms: 220,
            drag_max_ms: 1500,
            tick_ms: 200,
            miss_rate: 0.2,
            jitter_px: 1.0,
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct BotReport {
    pub drags: usize,
    pub misses: usize,
    pub events: Vec<InteractionEvent>,
}

pub(super) fn validate_bot_config(config: BotRunConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.think_min_ms > config.think_max_ms {
        return Err("think_min_ms must be <= think_max_ms".into());
    }
    if config.drag_min_ms > config.drag_max_ms {
        return Err("drag_min_ms must be <= drag_max_ms".into());
    }
    if config.tick_ms == 0 {
        return Err("tick_ms must be positive".into());
    }
    if !(0.0..1.0).contains(&config.miss_rate) {
        return Err("miss_rate must be in [0, 1)".into());
    }
    if config.jitter_px < 0.0 {
        return Err("jitter_px must be >= 0".into());
    }
    Ok(())
}

/// Plays `session` to completion on simulated time: think, pick up a loose
/// piece, drag it toward its slot and release, sometimes off target.
pub(super) fn run_solver(
    session: &mut PuzzleSession,
    clock: &ManualClock,
    config: BotRunConfig,
    rng: &mut StdRng,
) -> BotReport {
    let mut report = BotReport::default();
    let max_drags = session.total().saturating_mul(8).max(1);
    while !session.is_solved() && report.drags < max_drags {
        let loose: Vec<usize> = session
            .pieces()
            .iter()
            .filter(|piece| !piece.locked)
            .map(|piece| piece.index)
            .collect();
        let Some(&index) = loose.get(rng.random_range(0..loose.len().max(1))) else {
            break;
        };
        clock.advance(sample_low_biased_u64(rng, config.think_min_ms, config.think_max_ms));
        session.tick();

        let piece = session.pieces()[index].clone();
        let grab = Point::new(
            rng.random_range(0.0..=piece.width),
            rng.random_range(0.0..=piece.height),
        );
        let start = piece.current_pos;
        report.events.extend(session.begin_drag(index, start.offset(grab.x, grab.y)));

        let threshold = piece.width.min(piece.height) * session.rules().snap_distance_ratio;
        let miss = rng.random::<f32>() < config.miss_rate;
        let aim = if miss {
            report.misses += 1;
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let reach = threshold * rng.random_range(1.5..3.0);
            piece.target_pos.offset(angle.cos() * reach, angle.sin() * reach)
        } else {
            let jitter = config.jitter_px.min(threshold * 0.5);
            piece.target_pos.offset(
                rng.random_range(-jitter..=jitter),
                rng.random_range(-jitter..=jitter),
            )
        };

        let drag_ms = sample_low_biased_u64(rng, config.drag_min_ms, config.drag_max_ms);
        let steps = (drag_ms / config.tick_ms).max(1);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            let pos = Point::new(lerp_f32(start.x, aim.x, t), lerp_f32(start.y, aim.y, t));
            clock.advance(config.tick_ms);
            session.update_drag(index, pos.offset(grab.x, grab.y));
            session.tick();
        }
        let events = session.end_drag(index, aim.offset(grab.x, grab.y));
        debug!(index, miss, ?events, "bot drag finished");
        report.events.extend(events);
        report.drags += 1;
    }
    report
}

fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn sample_low_biased_u64(rng: &mut StdRng, min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    let span = (max - min) as f32;
    let u = rng.random::<f32>();
    let shaped = u.powf(1.9);
    min.saturating_add((span * shaped).round() as u64)
}

//! # Transitions System
//!
//! The visual effects of the pre-travel phases: the intro title and the
//! transitional cover layers that hide the swap from the static intro layer
//! to the horizontal track.
//!
//! ## Responsibilities
//! - **Title**: Fade and rise in, hold, fade out.
//! - **Cover Layers**: Staggered converge-in, then staggered spread-out.
//! - **Layer Swap**: Intro layer visibility flips at a single instant.
//!
//! ## Key Types
//! - `CoverLayer`: Per-layer visual state (positions in percent of the layer's own size).
//! - `StageEffects`: Keyframed effects sampled at master-timeline time.

use crate::animation::{Animated, EasingType};
use crate::timeline::{Effect, MasterTimeline};
use crate::types::Visual;
use serde::Serialize;

/// Visual state of one transitional cover layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverLayer {
    pub opacity: f32,
    pub scale: f32,
    pub x_percent: f32,
    pub y_percent: f32,
}

/// Rise distance of the intro title, in pixels.
const TITLE_RISE_PX: f32 = 20.0;

#[derive(Debug, Clone)]
struct CoverTrack {
    opacity: Animated<f32>,
    scale: Animated<f32>,
    x_percent: Animated<f32>,
    y_percent: Animated<f32>,
}

impl CoverTrack {
    fn sample(&self, time: f64) -> CoverLayer {
        CoverLayer {
            opacity: self.opacity.sample(time),
            scale: self.scale.sample(time),
            x_percent: self.x_percent.sample(time),
            y_percent: self.y_percent.sample(time),
        }
    }
}

/// Appends a hold until `start` followed by a move to `target` lasting `duration`.
fn move_at(anim: &mut Animated<f32>, hold_value: f32, start: f64, target: f32, duration: f64, easing: EasingType) {
    let gap = start - anim.duration();
    if gap > 0.0 {
        anim.add_keyframe(hold_value, gap, EasingType::Linear);
    }
    anim.add_keyframe(target, duration, easing);
}

/// Keyframed visuals of the intro and transition phases.
#[derive(Debug, Clone)]
pub struct StageEffects {
    title_opacity: Animated<f32>,
    title_offset_y: Animated<f32>,
    covers: Vec<CoverTrack>,
    swap_time: f64,
}

impl StageEffects {
    /// Builds the effects from a compiled timeline.
    ///
    /// * `stagger` - delay between consecutive cover layers, in scroll pixels.
    pub fn build(timeline: &MasterTimeline, cover_count: usize, stagger: f64) -> Self {
        let reveal = timeline.effect(Effect::TitleReveal).copied();
        let exit = timeline.effect(Effect::TitleExit).copied();
        let enter = timeline.effect(Effect::CoverEnter).copied();
        let disperse = timeline.effect(Effect::CoverDisperse).copied();
        let swap_time = timeline
            .effect(Effect::LayerSwap)
            .map(|e| e.start)
            .unwrap_or_else(|| timeline.travel().start);

        let mut title_opacity = Animated::new(0.0f32);
        let mut title_offset_y = Animated::new(TITLE_RISE_PX);
        if let Some(r) = reveal {
            move_at(&mut title_opacity, 0.0, r.start, 1.0, r.duration, EasingType::EaseOut);
            move_at(&mut title_offset_y, TITLE_RISE_PX, r.start, 0.0, r.duration, EasingType::EaseOut);
        } else {
            title_opacity = Animated::new(1.0);
            title_offset_y = Animated::new(0.0);
        }
        if let Some(x) = exit {
            let held = title_opacity.raw_keyframes.last().map(|k| k.0).unwrap_or(1.0);
            move_at(&mut title_opacity, held, x.start, 0.0, x.duration, EasingType::EaseOut);
        }

        let center = cover_count.saturating_sub(1) as f32 / 2.0;
        let covers = (0..cover_count)
            .map(|i| {
                let c = i as f32 - center;
                let delay = stagger * i as f64;
                let from_y = if c == 0.0 { -10.0 } else { 20.0 };

                let mut track = CoverTrack {
                    opacity: Animated::new(0.0),
                    scale: Animated::new(1.5),
                    x_percent: Animated::new(c * 150.0),
                    y_percent: Animated::new(from_y),
                };
                if let Some(e) = enter {
                    let start = e.start + delay;
                    let duration = (e.duration - stagger * cover_count.saturating_sub(1) as f64).max(0.0);
                    move_at(&mut track.opacity, 0.0, start, 1.0, duration, EasingType::EaseOut);
                    move_at(&mut track.scale, 1.5, start, 2.0, duration, EasingType::EaseOut);
                    move_at(&mut track.x_percent, c * 150.0, start, c * 20.0, duration, EasingType::EaseOut);
                    move_at(&mut track.y_percent, from_y, start, 0.0, duration, EasingType::EaseOut);
                }
                if let Some(d) = disperse {
                    let start = d.start + delay;
                    let duration = (d.duration - stagger * cover_count.saturating_sub(1) as f64).max(0.0);
                    move_at(&mut track.opacity, 1.0, start, 0.0, duration, EasingType::EaseOut);
                    move_at(&mut track.scale, 2.0, start, 3.0, duration, EasingType::EaseOut);
                    move_at(&mut track.x_percent, c * 20.0, start, c * 150.0, duration, EasingType::EaseOut);
                }
                track
            })
            .collect();

        Self {
            title_opacity,
            title_offset_y,
            covers,
            swap_time,
        }
    }

    pub fn title(&self, time: f64) -> Visual {
        Visual {
            opacity: self.title_opacity.sample(time),
            offset_y: self.title_offset_y.sample(time),
            ..Visual::identity()
        }
    }

    pub fn covers(&self, time: f64) -> Vec<CoverLayer> {
        self.covers.iter().map(|c| c.sample(time)).collect()
    }

    /// The static intro layer is shown strictly before the swap instant.
    pub fn intro_visible(&self, time: f64) -> bool {
        time < self.swap_time
    }

    pub fn swap_time(&self) -> f64 {
        self.swap_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseWeights;
    use crate::timeline::standard_phases;

    fn effects() -> (MasterTimeline, StageEffects) {
        let phases = standard_phases(&PhaseWeights::default(), 3);
        let timeline = MasterTimeline::compile(&phases, 100.0, 5000.0).unwrap();
        let effects = StageEffects::build(&timeline, 3, 10.0);
        (timeline, effects)
    }

    #[test]
    fn test_title_reveal_hold_exit() {
        let (_, fx) = effects();
        assert!(fx.title(0.0).opacity.abs() < 1e-4);
        assert!((fx.title(0.0).offset_y - TITLE_RISE_PX).abs() < 1e-4);
        assert!((fx.title(350.0).opacity - 1.0).abs() < 1e-4);
        assert!(fx.title(350.0).offset_y.abs() < 1e-4);
        assert!(fx.title(800.0).opacity.abs() < 1e-4);
    }

    #[test]
    fn test_covers_fully_cover_at_swap() {
        let (timeline, fx) = effects();
        let swap = fx.swap_time();
        assert_eq!(swap, timeline.travel().start);
        assert!(fx.intro_visible(swap - 1.0));
        assert!(!fx.intro_visible(swap));

        for layer in fx.covers(swap) {
            assert!((layer.opacity - 1.0).abs() < 1e-4);
            assert!((layer.scale - 2.0).abs() < 1e-4);
        }
        let end = fx.covers(timeline.total());
        assert!(end.iter().all(|l| l.opacity.abs() < 1e-4));
        assert!((end[0].x_percent + 150.0).abs() < 1e-3);
        assert!((end[2].x_percent - 150.0).abs() < 1e-3);
    }
}

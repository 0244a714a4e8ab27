//! # Master Timeline
//!
//! The pinned, scrub-driven sequence: title reveal, hold, title exit with the
//! cover entering, the instantaneous layer swap, then cover dispersal together
//! with horizontal travel.
//!
//! The sequence is declared as an ordered list of `PhaseDescriptor`s and
//! compiled once into absolute positions. Timeline time is measured in scroll
//! pixels, so the travel effect (whose span equals the travel distance) keeps
//! a one-to-one scroll-to-offset correspondence.

use crate::config::PhaseWeights;
use crate::errors::NarrativeError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Named synchronization points on the master timeline, in narrative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseLabel {
    TitleReveal,
    IntroHold,
    CloudCover,
    LayerSwap,
    StartScroll,
}

impl PhaseLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseLabel::TitleReveal => "title-reveal",
            PhaseLabel::IntroHold => "intro-hold",
            PhaseLabel::CloudCover => "cloud-cover",
            PhaseLabel::LayerSwap => "layer-swap",
            PhaseLabel::StartScroll => "start-scroll",
        }
    }
}

impl fmt::Display for PhaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an effect animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    TitleReveal,
    /// Keeps the title in place; gives the hold phase its length.
    TitleHold,
    TitleExit,
    CoverEnter,
    /// Hides the static intro layer and shows the track.
    LayerSwap,
    CoverDisperse,
    /// The horizontal translation itself.
    Travel,
}

/// How long an effect lasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Span {
    /// Intro units; converted to scroll pixels at compile time.
    Weight(f64),
    /// A state change with no duration.
    Instant,
    /// Exactly the travel distance.
    Travel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSpec {
    pub effect: Effect,
    pub span: Span,
}

impl EffectSpec {
    pub const fn new(effect: Effect, span: Span) -> Self {
        Self { effect, span }
    }
}

/// One phase of the master timeline. Effects inside a phase start together at
/// the phase label; the next phase starts when the longest one ends.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDescriptor {
    pub label: PhaseLabel,
    pub effects: Vec<EffectSpec>,
}

impl PhaseDescriptor {
    pub fn new(label: PhaseLabel, effects: Vec<EffectSpec>) -> Self {
        Self { label, effects }
    }
}

/// The standard phase list for `weights` and `cover_count` cover layers.
pub fn standard_phases(weights: &PhaseWeights, cover_count: usize) -> Vec<PhaseDescriptor> {
    let stagger = weights.cover_stagger * cover_count.saturating_sub(1) as f64;
    vec![
        PhaseDescriptor::new(
            PhaseLabel::TitleReveal,
            vec![EffectSpec::new(Effect::TitleReveal, Span::Weight(weights.title_reveal))],
        ),
        PhaseDescriptor::new(
            PhaseLabel::IntroHold,
            vec![EffectSpec::new(Effect::TitleHold, Span::Weight(weights.title_hold))],
        ),
        PhaseDescriptor::new(
            PhaseLabel::CloudCover,
            vec![
                EffectSpec::new(Effect::TitleExit, Span::Weight(weights.title_exit)),
                EffectSpec::new(Effect::CoverEnter, Span::Weight(weights.cover_enter + stagger)),
            ],
        ),
        PhaseDescriptor::new(
            PhaseLabel::LayerSwap,
            vec![EffectSpec::new(Effect::LayerSwap, Span::Instant)],
        ),
        PhaseDescriptor::new(
            PhaseLabel::StartScroll,
            vec![
                EffectSpec::new(
                    Effect::CoverDisperse,
                    Span::Weight(weights.cover_dispersal + stagger),
                ),
                EffectSpec::new(Effect::Travel, Span::Travel),
            ],
        ),
    ]
}

/// Sum of the intro-unit weights that come before travel.
pub fn intro_weight(phases: &[PhaseDescriptor]) -> f64 {
    phases
        .iter()
        .take_while(|p| !p.effects.iter().any(|e| e.effect == Effect::Travel))
        .map(|p| {
            p.effects
                .iter()
                .map(|e| match e.span {
                    Span::Weight(w) => w,
                    _ => 0.0,
                })
                .fold(0.0, f64::max)
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledPhase {
    pub label: PhaseLabel,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledEffect {
    pub effect: Effect,
    pub start: f64,
    pub duration: f64,
}

impl CompiledEffect {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Absolute, scroll-pixel positions of every phase and effect.
#[derive(Debug, Clone)]
pub struct MasterTimeline {
    phases: Vec<CompiledPhase>,
    effects: Vec<CompiledEffect>,
    travel: CompiledEffect,
    total: f64,
}

impl MasterTimeline {
    /// Compiles `phases` into absolute positions.
    ///
    /// * `unit` - scroll pixels per intro unit.
    /// * `travel_distance` - length of the travel effect in pixels.
    ///
    /// Labels must be unique and exactly one effect must be `Travel`.
    pub fn compile(
        phases: &[PhaseDescriptor],
        unit: f64,
        travel_distance: f64,
    ) -> Result<Self, NarrativeError> {
        let mut seen = HashSet::new();
        let mut compiled_phases = Vec::with_capacity(phases.len());
        let mut effects = Vec::new();
        let mut travel = None;
        let mut cursor = 0.0;

        for phase in phases {
            if !seen.insert(phase.label) {
                return Err(NarrativeError::DuplicatePhase(phase.label.to_string()));
            }
            let start = cursor;
            let mut length: f64 = 0.0;
            for spec in &phase.effects {
                let duration = match spec.span {
                    Span::Weight(w) => (w * unit).max(0.0),
                    Span::Instant => 0.0,
                    Span::Travel => travel_distance,
                };
                let effect = CompiledEffect {
                    effect: spec.effect,
                    start,
                    duration,
                };
                if spec.effect == Effect::Travel {
                    if travel.is_some() {
                        return Err(NarrativeError::DuplicatePhase(Effect::Travel.label()));
                    }
                    travel = Some(effect);
                }
                effects.push(effect);
                length = length.max(duration);
            }
            cursor = start + length;
            compiled_phases.push(CompiledPhase {
                label: phase.label,
                start,
                end: cursor,
            });
        }

        let travel = travel.ok_or(NarrativeError::MissingTravelPhase)?;
        debug!(
            phases = compiled_phases.len(),
            travel_start = travel.start,
            total = cursor,
            "master timeline compiled"
        );
        Ok(Self {
            phases: compiled_phases,
            effects,
            travel,
            total: cursor,
        })
    }

    /// Total length in scroll pixels.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn phases(&self) -> &[CompiledPhase] {
        &self.phases
    }

    pub fn travel(&self) -> &CompiledEffect {
        &self.travel
    }

    pub fn effect(&self, effect: Effect) -> Option<&CompiledEffect> {
        self.effects.iter().find(|e| e.effect == effect)
    }

    pub fn label_time(&self, label: PhaseLabel) -> Option<f64> {
        self.phases.iter().find(|p| p.label == label).map(|p| p.start)
    }

    /// The latest phase whose label has been reached at `time`.
    pub fn phase_at(&self, time: f64) -> Option<PhaseLabel> {
        self.phases
            .iter()
            .rev()
            .find(|p| time >= p.start)
            .map(|p| p.label)
    }

    /// Travel progress at `time`, `None` before the travel effect starts.
    pub fn travel_progress(&self, time: f64) -> Option<f64> {
        if time < self.travel.start {
            return None;
        }
        if self.travel.duration <= 0.0 {
            return Some(1.0);
        }
        Some(((time - self.travel.start) / self.travel.duration).clamp(0.0, 1.0))
    }
}

impl Effect {
    fn label(&self) -> String {
        format!("{:?}", self).to_lowercase()
    }
}

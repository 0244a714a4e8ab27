//! # Virtual Triggers
//!
//! Activation windows expressed against the master motion instead of the real
//! scroll position.
//!
//! ## Responsibilities
//! - **Bounds**: Parses `"<element-edge> <viewport-position>"` bounds such as `"left 75%"`.
//! - **Windows**: Resolves a pair of bounds for a slot into `[start, end]` motion fractions.
//! - **Registry**: Owns every live trigger and evaluates them once per frame.
//! - **Scopes**: Groups triggers by owner so a single `revert` releases all of them.
//! - **Toggle Actions**: `"play none none reverse"` style reactions for clock-driven tweens.
//!
//! ## Key Types
//! - `Bound`, `Position`: Trigger bound grammar.
//! - `VirtualWindow`: `(start_fraction, end_fraction)` along the master motion.
//! - `TriggerRegistry`, `TriggerScope`, `TriggerUpdate`.

use crate::errors::NarrativeError;
use crate::motion::MotionHandle;
use crate::systems::layout::SlotRect;
use crate::types::SceneId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

/// One side of a bound: a position along the element or along the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Fraction of the element (or viewport) width; `left` = 0, `center` = 0.5, `right` = 1.
    Fraction(f64),
    /// Absolute pixel offset from the left edge.
    Pixels(f64),
}

impl Position {
    pub fn resolve(&self, extent: f64) -> f64 {
        match self {
            Position::Fraction(f) => f * extent,
            Position::Pixels(px) => *px,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "left" | "top" => Some(Position::Fraction(0.0)),
            "center" => Some(Position::Fraction(0.5)),
            "right" | "bottom" => Some(Position::Fraction(1.0)),
            _ => {
                if let Some(pct) = token.strip_suffix('%') {
                    pct.parse::<f64>().ok().map(|v| Position::Fraction(v / 100.0))
                } else if let Some(px) = token.strip_suffix("px") {
                    px.parse::<f64>().ok().map(Position::Pixels)
                } else {
                    token.parse::<f64>().ok().map(Position::Pixels)
                }
            }
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Fraction(v) => write!(f, "{}%", v * 100.0),
            Position::Pixels(px) => write!(f, "{}px", px),
        }
    }
}

/// "When this point of the element reaches that point of the viewport."
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bound {
    pub element: Position,
    pub viewport: Position,
}

impl Bound {
    pub const fn new(element: Position, viewport: Position) -> Self {
        Self { element, viewport }
    }

    /// Element's left edge at `viewport_fraction` of the viewport width.
    pub const fn left_at(viewport_fraction: f64) -> Self {
        Self::new(Position::Fraction(0.0), Position::Fraction(viewport_fraction))
    }

    /// Element's right edge at `viewport_fraction` of the viewport width.
    pub const fn right_at(viewport_fraction: f64) -> Self {
        Self::new(Position::Fraction(1.0), Position::Fraction(viewport_fraction))
    }

    /// Track offset at which this bound is crossed for the given slot.
    pub fn offset_for(&self, slot: &SlotRect, viewport_width: f64) -> f64 {
        let element_x = slot.left + self.element.resolve(slot.width);
        element_x - self.viewport.resolve(viewport_width)
    }
}

impl FromStr for Bound {
    type Err = NarrativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let invalid = || NarrativeError::InvalidBound(s.to_string());
        let element = tokens.next().and_then(Position::parse).ok_or_else(invalid)?;
        let viewport = tokens.next().and_then(Position::parse).ok_or_else(invalid)?;
        if tokens.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { element, viewport })
    }
}

impl TryFrom<String> for Bound {
    type Error = NarrativeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bound> for String {
    fn from(value: Bound) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.element, self.viewport)
    }
}

/// An activation window in motion-progress terms.
///
/// Fractions are not clamped: a window may open before travel starts or
/// close after it ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualWindow {
    pub start: f64,
    pub end: f64,
}

impl VirtualWindow {
    /// Resolves `start`/`end` bounds for `slot` against `motion`.
    pub fn resolve(start: &Bound, end: &Bound, slot: &SlotRect, motion: &MotionHandle) -> Self {
        let vw = motion.viewport_width();
        Self {
            start: motion.offset_to_progress(start.offset_for(slot, vw)),
            end: motion.offset_to_progress(end.offset_for(slot, vw)),
        }
    }

    pub fn phase(&self, progress: Option<f64>) -> TriggerPhase {
        match progress {
            None => TriggerPhase::Before,
            Some(p) if p < self.start => TriggerPhase::Before,
            Some(p) if p > self.end => TriggerPhase::After,
            Some(_) => TriggerPhase::Active,
        }
    }

    /// Window-local progress in `0.0..=1.0`.
    pub fn local_progress(&self, progress: Option<f64>) -> f64 {
        let Some(p) = progress else {
            return 0.0;
        };
        let span = self.end - self.start;
        if span <= 0.0 {
            return if p >= self.start { 1.0 } else { 0.0 };
        }
        ((p - self.start) / span).clamp(0.0, 1.0)
    }
}

/// Where the motion currently is relative to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPhase {
    Before,
    Active,
    After,
}

/// A boundary crossing reported by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTransition {
    Enter,
    Leave,
    EnterBack,
    LeaveBack,
}

impl TriggerTransition {
    pub fn activates(&self) -> bool {
        matches!(self, TriggerTransition::Enter | TriggerTransition::EnterBack)
    }
}

/// Crossings implied by moving from one phase to another.
fn transitions_between(from: TriggerPhase, to: TriggerPhase) -> Vec<TriggerTransition> {
    use TriggerPhase::*;
    use TriggerTransition::*;
    match (from, to) {
        (Before, Active) => vec![Enter],
        (Before, After) => vec![Enter, Leave],
        (Active, After) => vec![Leave],
        (Active, Before) => vec![LeaveBack],
        (After, Active) => vec![EnterBack],
        (After, Before) => vec![EnterBack, LeaveBack],
        _ => Vec::new(),
    }
}

/// Reaction of a clock-driven tween to one trigger transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Play,
    Pause,
    Resume,
    Reverse,
    Restart,
    Reset,
    Complete,
    None,
}

impl FromStr for ToggleAction {
    type Err = NarrativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(ToggleAction::Play),
            "pause" => Ok(ToggleAction::Pause),
            "resume" => Ok(ToggleAction::Resume),
            "reverse" => Ok(ToggleAction::Reverse),
            "restart" => Ok(ToggleAction::Restart),
            "reset" => Ok(ToggleAction::Reset),
            "complete" => Ok(ToggleAction::Complete),
            "none" => Ok(ToggleAction::None),
            other => Err(NarrativeError::InvalidToggleActions(other.to_string())),
        }
    }
}

impl fmt::Display for ToggleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToggleAction::Play => "play",
            ToggleAction::Pause => "pause",
            ToggleAction::Resume => "resume",
            ToggleAction::Reverse => "reverse",
            ToggleAction::Restart => "restart",
            ToggleAction::Reset => "reset",
            ToggleAction::Complete => "complete",
            ToggleAction::None => "none",
        };
        f.write_str(name)
    }
}

/// Actions for `onEnter onLeave onEnterBack onLeaveBack`, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToggleActions(pub [ToggleAction; 4]);

impl ToggleActions {
    /// `play none none reverse`
    pub const PLAY_THEN_REVERSE_BACK: ToggleActions = ToggleActions([
        ToggleAction::Play,
        ToggleAction::None,
        ToggleAction::None,
        ToggleAction::Reverse,
    ]);

    pub fn action_for(&self, transition: TriggerTransition) -> ToggleAction {
        match transition {
            TriggerTransition::Enter => self.0[0],
            TriggerTransition::Leave => self.0[1],
            TriggerTransition::EnterBack => self.0[2],
            TriggerTransition::LeaveBack => self.0[3],
        }
    }
}

impl Default for ToggleActions {
    fn default() -> Self {
        Self::PLAY_THEN_REVERSE_BACK
    }
}

impl FromStr for ToggleActions {
    type Err = NarrativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let actions = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<ToggleAction>, _>>()?;
        let actions: [ToggleAction; 4] = actions
            .try_into()
            .map_err(|_| NarrativeError::InvalidToggleActions(s.to_string()))?;
        Ok(Self(actions))
    }
}

impl TryFrom<String> for ToggleActions {
    type Error = NarrativeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ToggleActions> for String {
    fn from(value: ToggleActions) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ToggleActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// Index of a trigger in the registry arena.
pub type TriggerId = usize;

/// Identifies the scope a trigger was created in.
pub type ScopeId = u64;

/// A nested activation window bound to the master motion.
#[derive(Debug, Clone)]
pub struct VirtualTrigger {
    pub scope: ScopeId,
    pub scene_id: SceneId,
    pub window: VirtualWindow,
    motion: MotionHandle,
    phase: TriggerPhase,
    progress: f64,
    /// Registry entry counter value at the last activation.
    entered_at: u64,
}

impl VirtualTrigger {
    pub fn is_active(&self) -> bool {
        self.phase == TriggerPhase::Active
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn motion(&self) -> &MotionHandle {
        &self.motion
    }
}

/// What changed for one trigger during an evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerUpdate {
    pub id: TriggerId,
    pub scope: ScopeId,
    pub transitions: Vec<TriggerTransition>,
    pub active: bool,
    /// Window-local progress in `0.0..=1.0`.
    pub progress: f64,
    /// Entry counter value of the most recent activation.
    pub entered_at: u64,
}

/// Arena of all live virtual triggers.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    slots: Vec<Option<VirtualTrigger>>,
    free_indices: Vec<usize>,
    next_scope: ScopeId,
    entry_counter: u64,
    /// Track offset sampled by the previous pass.
    last_offset: Option<f64>,
    /// Direction of the last observed movement; held while the motion is still.
    backwards: bool,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new scope; every trigger created through it is released by its `revert`.
    pub fn open_scope(&mut self, label: impl Into<String>) -> TriggerScope {
        self.next_scope += 1;
        TriggerScope {
            id: self.next_scope,
            label: label.into(),
            triggers: Vec::new(),
        }
    }

    fn insert(&mut self, trigger: VirtualTrigger) -> TriggerId {
        if let Some(id) = self.free_indices.pop() {
            self.slots[id] = Some(trigger);
            id
        } else {
            self.slots.push(Some(trigger));
            self.slots.len() - 1
        }
    }

    fn remove(&mut self, id: TriggerId, scope: ScopeId) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) if slot.as_ref().is_some_and(|t| t.scope == scope) => {
                *slot = None;
                self.free_indices.push(id);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: TriggerId) -> Option<&VirtualTrigger> {
        self.slots.get(id).and_then(|t| t.as_ref())
    }

    /// Number of live triggers.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_for_scope(&self, scope: ScopeId) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|t| t.scope == scope)
            .count()
    }

    pub fn count_for_scene(&self, scene_id: &str) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|t| t.scene_id == scene_id)
            .count()
    }

    /// Drops every trigger at once. Outstanding scopes become empty.
    pub fn clear(&mut self) {
        let dropped = self.len();
        self.slots.clear();
        self.free_indices.clear();
        self.last_offset = None;
        self.backwards = false;
        if dropped > 0 {
            debug!(dropped, "trigger registry cleared");
        }
    }

    /// Samples the motion once and updates every trigger.
    ///
    /// Triggers are visited in window order along the direction of travel, so
    /// when several open in the same frame the one furthest along the motion
    /// is the most recently entered.
    #[instrument(level = "debug", skip(self), fields(triggers = self.slots.len()))]
    pub fn evaluate(&mut self) -> Vec<TriggerUpdate> {
        let stale: Vec<(TriggerId, ScopeId)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(id, t)| t.as_ref().map(|t| (id, t)))
            .filter(|(_, t)| !t.motion.is_live())
            .map(|(id, t)| (id, t.scope))
            .collect();
        for (id, scope) in stale {
            warn!(trigger = id, "dropping trigger bound to a released motion");
            self.remove(id, scope);
        }

        let mut order: Vec<TriggerId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(id, t)| t.as_ref().map(|_| id))
            .collect();

        // Compared in pixels: a rebuild may change the travel distance.
        let sample = order
            .first()
            .and_then(|id| self.get(*id))
            .and_then(|t| t.motion.offset());
        // A rebuild leaves the motion where it was; its fresh triggers keep
        // the direction the user was travelling in.
        match (self.last_offset, sample) {
            (Some(prev), Some(now)) if now < prev => self.backwards = true,
            (Some(prev), Some(now)) if now > prev => self.backwards = false,
            (Some(_), None) => self.backwards = true,
            (None, Some(_)) => self.backwards = false,
            _ => {}
        }
        let backwards = self.backwards;
        self.last_offset = sample;

        order.sort_by(|a, b| {
            let wa = self.slots[*a].as_ref().map(|t| t.window.start).unwrap_or(0.0);
            let wb = self.slots[*b].as_ref().map(|t| t.window.start).unwrap_or(0.0);
            wa.total_cmp(&wb)
        });
        if backwards {
            order.reverse();
        }

        let mut updates = Vec::new();
        for id in order {
            let Some(trigger) = self.slots[id].as_mut() else {
                continue;
            };
            let progress = trigger.motion.progress();
            let phase = trigger.window.phase(progress);
            let local = trigger.window.local_progress(progress);
            let transitions = transitions_between(trigger.phase, phase);

            if transitions.is_empty() && (local - trigger.progress).abs() < f64::EPSILON {
                continue;
            }
            if transitions.iter().any(TriggerTransition::activates) {
                self.entry_counter += 1;
                trigger.entered_at = self.entry_counter;
            }
            if !transitions.is_empty() {
                debug!(
                    trigger = id,
                    scene = %trigger.scene_id,
                    ?transitions,
                    "trigger crossed"
                );
            }
            trigger.phase = phase;
            trigger.progress = local;
            updates.push(TriggerUpdate {
                id,
                scope: trigger.scope,
                transitions,
                active: phase == TriggerPhase::Active,
                progress: local,
                entered_at: trigger.entered_at,
            });
        }
        updates
    }
}

/// Scoped acquisition of triggers.
///
/// Not `Clone`: exactly one owner can release what it created.
#[derive(Debug)]
pub struct TriggerScope {
    id: ScopeId,
    label: String,
    triggers: Vec<TriggerId>,
}

impl TriggerScope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Creates a trigger for `slot` between `start` and `end`.
    pub fn create(
        &mut self,
        registry: &mut TriggerRegistry,
        slot: &SlotRect,
        start: &Bound,
        end: &Bound,
        motion: &MotionHandle,
    ) -> TriggerId {
        let window = VirtualWindow::resolve(start, end, slot, motion);
        let id = registry.insert(VirtualTrigger {
            scope: self.id,
            scene_id: slot.scene_id.clone(),
            window,
            motion: motion.clone(),
            phase: TriggerPhase::Before,
            progress: 0.0,
            entered_at: 0,
        });
        debug!(
            trigger = id,
            scope = %self.label,
            start = window.start,
            end = window.end,
            "trigger created"
        );
        self.triggers.push(id);
        id
    }

    pub fn owns(&self, id: TriggerId) -> bool {
        self.triggers.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Releases every trigger this scope created. Returns how many were still live.
    pub fn revert(&mut self, registry: &mut TriggerRegistry) -> usize {
        let released = self
            .triggers
            .drain(..)
            .filter(|id| registry.remove(*id, self.id))
            .count();
        if released > 0 {
            debug!(scope = %self.label, released, "scope reverted");
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MasterMotion;

    fn slot(left: f64, width: f64) -> SlotRect {
        SlotRect {
            scene_id: "s".to_string(),
            slot_index: 0,
            left,
            width,
        }
    }

    #[test]
    fn test_bound_parsing() {
        let b: Bound = "left 75%".parse().unwrap();
        assert_eq!(b, Bound::left_at(0.75));
        let b: Bound = "right right".parse().unwrap();
        assert_eq!(b, Bound::right_at(1.0));
        let b: Bound = "left -50%".parse().unwrap();
        assert_eq!(b.viewport, Position::Fraction(-0.5));
        let b: Bound = "center 200px".parse().unwrap();
        assert_eq!(b.viewport, Position::Pixels(200.0));
        assert!("left".parse::<Bound>().is_err());
        assert!("left 10% extra".parse::<Bound>().is_err());
        assert!("middle 10%".parse::<Bound>().is_err());
    }

    #[test]
    fn test_window_resolves_against_motion() {
        let motion = MasterMotion::new(1, 5000.0, 1000.0);
        let handle = motion.handle();
        // Slot at 2000..3000: left hits 75% at offset 1250, right hits 25% at offset 2750.
        let w = VirtualWindow::resolve(
            &Bound::left_at(0.75),
            &Bound::right_at(0.25),
            &slot(2000.0, 1000.0),
            &handle,
        );
        assert!((w.start - 0.25).abs() < 1e-9);
        assert!((w.end - 0.55).abs() < 1e-9);
        assert_eq!(w.phase(None), TriggerPhase::Before);
        assert_eq!(w.phase(Some(0.3)), TriggerPhase::Active);
        assert_eq!(w.phase(Some(0.6)), TriggerPhase::After);
        assert!((w.local_progress(Some(0.4)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_jump_reports_enter_and_leave() {
        let motion = MasterMotion::new(1, 1000.0, 500.0);
        let handle = motion.handle();
        let mut registry = TriggerRegistry::new();
        let mut scope = registry.open_scope("test");
        let id = scope.create(
            &mut registry,
            &slot(600.0, 100.0),
            &Bound::left_at(1.0),
            &Bound::right_at(0.0),
            &handle,
        );

        motion.set_progress(Some(0.0));
        assert!(registry.evaluate().is_empty());

        motion.set_progress(Some(1.0));
        let updates = registry.evaluate();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, id);
        assert_eq!(
            updates[0].transitions,
            vec![TriggerTransition::Enter, TriggerTransition::Leave]
        );
        assert!(!updates[0].active);
    }

    #[test]
    fn test_scope_revert_releases_only_own_triggers() {
        let motion = MasterMotion::new(1, 1000.0, 500.0);
        let handle = motion.handle();
        let mut registry = TriggerRegistry::new();
        let mut a = registry.open_scope("a");
        let mut b = registry.open_scope("b");
        let s = slot(0.0, 500.0);
        a.create(&mut registry, &s, &Bound::left_at(1.0), &Bound::right_at(0.0), &handle);
        a.create(&mut registry, &s, &Bound::left_at(0.5), &Bound::right_at(0.5), &handle);
        b.create(&mut registry, &s, &Bound::left_at(1.0), &Bound::right_at(0.0), &handle);
        assert_eq!(registry.len(), 3);

        assert_eq!(a.revert(&mut registry), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.count_for_scope(b.id()), 1);

        registry.clear();
        assert_eq!(b.revert(&mut registry), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_toggle_actions_parsing() {
        let actions: ToggleActions = "play reverse play reverse".parse().unwrap();
        assert_eq!(actions.action_for(TriggerTransition::Leave), ToggleAction::Reverse);
        assert_eq!(actions.to_string(), "play reverse play reverse");
        assert!("play none".parse::<ToggleActions>().is_err());
        assert!("play none none bounce".parse::<ToggleActions>().is_err());
    }

    #[test]
    fn test_direction_survives_a_still_rebuild() {
        let motion = MasterMotion::new(1, 1000.0, 500.0);
        let handle = motion.handle();
        let mut registry = TriggerRegistry::new();
        let mut scope = registry.open_scope("scenes");
        // Overlapping windows: 0.2..0.6 and 0.4..0.8.
        let early = slot(200.0, 400.0);
        let late = slot(400.0, 400.0);
        let build = |scope: &mut TriggerScope, registry: &mut TriggerRegistry| {
            let a = scope.create(registry, &early, &Bound::left_at(0.0), &Bound::right_at(0.0), &handle);
            let b = scope.create(registry, &late, &Bound::left_at(0.0), &Bound::right_at(0.0), &handle);
            (a, b)
        };
        build(&mut scope, &mut registry);

        motion.set_progress(Some(0.9));
        registry.evaluate();
        motion.set_progress(Some(0.5));
        registry.evaluate();

        scope.revert(&mut registry);
        let (a, b) = build(&mut scope, &mut registry);
        let updates = registry.evaluate();
        let entered = |id| updates.iter().find(|u| u.id == id).map(|u| u.entered_at);
        assert!(entered(a) > entered(b));
    }

    #[test]
    fn test_released_motion_purges_triggers() {
        let motion = MasterMotion::new(1, 1000.0, 500.0);
        let handle = motion.handle();
        let mut registry = TriggerRegistry::new();
        let mut scope = registry.open_scope("test");
        scope.create(
            &mut registry,
            &slot(0.0, 500.0),
            &Bound::left_at(1.0),
            &Bound::right_at(0.0),
            &handle,
        );
        motion.release();
        assert!(registry.evaluate().is_empty());
        assert!(registry.is_empty());
    }
}

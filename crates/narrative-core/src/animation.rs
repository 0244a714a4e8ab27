use keyframe::{AnimationSequence, EasingFunction, Keyframe};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Easing curves available to scene and intro tweens.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl EasingFunction for EasingType {
    fn y(&self, x: f64) -> f64 {
        match self {
            EasingType::Linear => keyframe::functions::Linear.y(x),
            EasingType::EaseIn => keyframe::functions::EaseIn.y(x),
            EasingType::EaseOut => keyframe::functions::EaseOut.y(x),
            EasingType::EaseInOut => keyframe::functions::EaseInOut.y(x),
        }
    }
}

impl EasingType {
    /// Curve value at `x` in `0.0..=1.0`.
    pub fn eval(&self, x: f32) -> f32 {
        self.y(x as f64) as f32
    }
}

/// A keyframed value.
///
/// Time is whatever unit the owner drives it with: seconds for clock-driven
/// tweens, scroll pixels for the master timeline, window-local progress for
/// scrubbed scene timelines.
#[derive(Clone)]
pub struct Animated<T>
where
    T: Clone + keyframe::CanTween + Default,
{
    /// `(value, absolute time, easing)` for every keyframe, in order.
    pub raw_keyframes: Vec<(T, f64, EasingType)>,
    pub sequence: AnimationSequence<T>,
    /// Value at the time passed to the last `update`.
    pub current_value: T,
}

impl<T> Animated<T>
where
    T: Clone + keyframe::CanTween + Default,
{
    /// A value that stays at `initial`.
    pub fn new(initial: T) -> Self {
        let raw = vec![(initial.clone(), 0.0, EasingType::Linear)];
        let kf = Keyframe::new(initial.clone(), 0.0, EasingType::Linear);

        Self {
            sequence: AnimationSequence::from(vec![kf]),
            raw_keyframes: raw,
            current_value: initial,
        }
    }

    /// Creates a value that holds `from` until `delay`, then moves to `to` over `duration`.
    pub fn from_to(from: T, to: T, delay: f64, duration: f64, easing: EasingType) -> Self {
        let mut anim = Self::new(from.clone());
        if delay > 0.0 {
            anim.add_keyframe(from, delay, EasingType::Linear);
        }
        anim.add_keyframe(to, duration, easing);
        anim
    }

    /// Appends a keyframe reaching `target` `duration` after the current end.
    pub fn add_keyframe(&mut self, target: T, duration: f64, easing: EasingType) {
        let current_end_time = self.sequence.duration();
        let new_time = current_end_time + duration.max(0.0);

        self.raw_keyframes.push((target, new_time, easing));

        let frames: Vec<Keyframe<T>> = self
            .raw_keyframes
            .iter()
            .map(|(val, time, ease_type)| Keyframe::new(val.clone(), *time, *ease_type))
            .collect();

        self.sequence = AnimationSequence::from(frames);
    }

    pub fn duration(&self) -> f64 {
        self.sequence.duration()
    }

    /// Moves to absolute `time`. Times outside `[0, duration]` hold the first or last keyframe.
    pub fn update(&mut self, time: f64) {
        let clamped = time.clamp(0.0, self.duration());
        self.sequence.advance_to(clamped);
        self.current_value = self.sequence.now();
    }

    /// Evaluates the value at `time` without touching `current_value`.
    pub fn sample(&self, time: f64) -> T {
        let mut anim = self.clone();
        anim.update(time);
        anim.current_value
    }
}

impl<T> fmt::Debug for Animated<T>
where
    T: Clone + keyframe::CanTween + Default + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animated")
            .field("current_value", &self.current_value)
            .finish()
    }
}

/// Moves `current` towards `target` over a frame of `dt` seconds.
///
/// With a positive `lag` the gap shrinks exponentially and is mostly closed
/// after `lag` seconds. Gaps below `snap` close immediately.
pub fn chase(current: f64, target: f64, lag: f64, dt: f64, snap: f64) -> f64 {
    let gap = target - current;
    if lag <= 0.0 || gap.abs() < snap {
        return target;
    }
    let tau = lag / 3.0;
    let alpha = 1.0 - (-dt.max(0.0) / tau).exp();
    current + gap * alpha
}

/// Direction a clock-driven playhead is currently moving in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlayDirection {
    Paused,
    Forward,
    Reverse,
}

/// A clock-driven playhead over a fixed duration.
///
/// Used by tweens that are toggled by triggers rather than scrubbed by them.
#[derive(Clone, Debug)]
pub struct Playhead {
    time: f64,
    duration: f64,
    direction: PlayDirection,
    reversed: bool,
}

impl Playhead {
    pub fn new(duration: f64) -> Self {
        Self {
            time: 0.0,
            duration: duration.max(0.0),
            direction: PlayDirection::Paused,
            reversed: false,
        }
    }

    pub fn play(&mut self) {
        self.reversed = false;
        self.direction = PlayDirection::Forward;
    }

    pub fn reverse(&mut self) {
        self.reversed = true;
        self.direction = PlayDirection::Reverse;
    }

    pub fn pause(&mut self) {
        self.direction = PlayDirection::Paused;
    }

    /// Continues in whichever direction was last requested.
    pub fn resume(&mut self) {
        self.direction = if self.reversed {
            PlayDirection::Reverse
        } else {
            PlayDirection::Forward
        };
    }

    pub fn restart(&mut self) {
        self.time = 0.0;
        self.reversed = false;
        self.direction = PlayDirection::Forward;
    }

    /// Jumps back to the start and stops.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.direction = PlayDirection::Paused;
    }

    /// Jumps to the end and stops.
    pub fn complete(&mut self) {
        self.time = self.duration;
        self.direction = PlayDirection::Paused;
    }

    /// Moves the playhead by `dt` seconds in its current direction.
    pub fn advance(&mut self, dt: f64) {
        match self.direction {
            PlayDirection::Paused => {}
            PlayDirection::Forward => {
                self.time = (self.time + dt).min(self.duration);
                if self.time >= self.duration {
                    self.direction = PlayDirection::Paused;
                }
            }
            PlayDirection::Reverse => {
                self.time = (self.time - dt).max(0.0);
                if self.time <= 0.0 {
                    self.direction = PlayDirection::Paused;
                }
            }
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn direction(&self) -> PlayDirection {
        self.direction
    }

    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            return if self.time > 0.0 { 1.0 } else { 0.0 };
        }
        self.time / self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_to_holds_until_delay() {
        let anim = Animated::from_to(0.0f32, 10.0, 1.0, 2.0, EasingType::Linear);
        assert!((anim.sample(0.5) - 0.0).abs() < 0.001);
        assert!((anim.sample(2.0) - 5.0).abs() < 0.001);
        assert!((anim.sample(5.0) - 10.0).abs() < 0.001);
        assert!((anim.duration() - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_chase_closes_gap_over_lag() {
        assert_eq!(chase(0.0, 1.0, 0.0, 0.016, 1e-4), 1.0);
        let mut value = 0.0;
        value = chase(value, 1.0, 1.5, 0.5, 1e-4);
        assert!(value > 0.5 && value < 1.0);
        for _ in 0..400 {
            value = chase(value, 1.0, 1.5, 0.016, 1e-4);
        }
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_playhead_play_and_reverse() {
        let mut head = Playhead::new(1.0);
        head.play();
        head.advance(0.4);
        assert!((head.progress() - 0.4).abs() < 0.001);
        head.advance(1.0);
        assert!((head.progress() - 1.0).abs() < 0.001);
        assert_eq!(head.direction(), PlayDirection::Paused);

        head.reverse();
        head.advance(0.25);
        assert!((head.progress() - 0.75).abs() < 0.001);
    }
}

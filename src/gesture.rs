use crate::model::{SwipeDecision, SwipeDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Horizontal distance a release must strictly exceed to count as a swipe.
    pub threshold: f64,
    pub card_width: f64,
    pub max_rotation_deg: f64,
    pub vertical_damping: f64,
    pub exit_vertical_factor: f64,
    pub exit_distance_factor: f64,
    pub exit_duration_ms: f64,
    pub return_duration_ms: f64,
    pub press_scale: f64,
    /// Releases that never travelled further than this are taps.
    pub tap_tolerance: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            threshold: 120.0,
            card_width: 360.0,
            max_rotation_deg: 10.0,
            vertical_damping: 0.1,
            exit_vertical_factor: 0.2,
            exit_distance_factor: 1.5,
            exit_duration_ms: 300.0,
            return_duration_ms: 250.0,
            press_scale: 1.05,
            tap_tolerance: 6.0,
        }
    }
}

impl GestureConfig {
    /// Keeps the tap radius well inside the swipe threshold so a long drag can
    /// never be read as a tap.
    pub fn normalized(mut self) -> Self {
        let ceiling = (self.threshold / 2.0).max(0.0);
        if self.tap_tolerance.is_nan() || self.tap_tolerance > ceiling {
            self.tap_tolerance = ceiling;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotation_deg: f64,
    pub scale: f64,
}

impl CardTransform {
    pub const REST: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        rotation_deg: 0.0,
        scale: 1.0,
    };

    pub fn to_css(&self) -> String {
        format!(
            "transform: translate({:.1}px, {:.1}px) rotate({:.2}deg) scale({:.3});",
            self.translate_x, self.translate_y, self.rotation_deg, self.scale
        )
    }
}

impl Default for CardTransform {
    fn default() -> Self {
        Self::REST
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
    Exiting(SwipeDirection),
    Returning,
    /// The decision has been emitted; the engine ignores all further input.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    Tap,
    Returning,
    Exiting(SwipeDirection),
    /// The engine was not dragging.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct Animation {
    from: (f64, f64),
    to: (f64, f64),
    duration_ms: f64,
    elapsed_ms: f64,
}

impl Animation {
    fn advance(&mut self, dt_ms: f64) -> ((f64, f64), bool) {
        self.elapsed_ms += dt_ms.max(0.0);
        let t = if self.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.duration_ms).min(1.0)
        };
        let position = (
            lerp(self.from.0, self.to.0, t),
            lerp(self.from.1, self.to.1, t),
        );
        (position, t >= 1.0)
    }
}

/// Drag-to-decision state machine for the interactive top card.
///
/// Only the horizontal offset at release decides the outcome; vertical
/// movement is damped into visual drift.
#[derive(Debug, Clone)]
pub struct GestureDecisionEngine {
    candidate_id: String,
    config: GestureConfig,
    phase: GesturePhase,
    raw: (f64, f64),
    offset: (f64, f64),
    travel: f64,
    progress: f64,
    animation: Option<Animation>,
    decided: bool,
}

impl GestureDecisionEngine {
    pub fn new(candidate_id: impl Into<String>, config: GestureConfig) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            config: config.normalized(),
            phase: GesturePhase::Idle,
            raw: (0.0, 0.0),
            offset: (0.0, 0.0),
            travel: 0.0,
            progress: 0.0,
            animation: None,
            decided: false,
        }
    }

    pub fn candidate_id(&self) -> &str {
        &self.candidate_id
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn drag_start(&mut self) -> bool {
        if self.phase != GesturePhase::Idle {
            return false;
        }
        self.phase = GesturePhase::Dragging;
        self.raw = (0.0, 0.0);
        self.offset = (0.0, 0.0);
        self.travel = 0.0;
        true
    }

    /// Records the offset from the drag origin and returns the progress signal
    /// for the cards underneath.
    pub fn drag_update(&mut self, dx: f64, dy: f64) -> Option<f64> {
        if self.phase != GesturePhase::Dragging {
            return None;
        }
        self.raw = (dx, dy);
        self.offset = (dx, dy * self.config.vertical_damping);
        self.travel = self.travel.max(dx.hypot(dy));
        self.progress = swipe_progress(dx, self.config.threshold);
        Some(self.progress)
    }

    pub fn drag_end(&mut self) -> Release {
        if self.phase != GesturePhase::Dragging {
            return Release::Ignored;
        }

        if self.travel <= self.config.tap_tolerance {
            self.settle_at_rest();
            return Release::Tap;
        }

        let dx = self.raw.0;
        let threshold = self.config.threshold;
        if dx > threshold {
            self.begin_exit(SwipeDirection::Right);
            Release::Exiting(SwipeDirection::Right)
        } else if dx < -threshold {
            self.begin_exit(SwipeDirection::Left);
            Release::Exiting(SwipeDirection::Left)
        } else {
            self.begin_return();
            Release::Returning
        }
    }

    /// The pointer was taken away mid-drag; the card always returns.
    pub fn cancel(&mut self) -> Release {
        if self.phase != GesturePhase::Dragging {
            return Release::Ignored;
        }
        self.begin_return();
        Release::Returning
    }

    /// Sends the card off-screen without a drag, as the action buttons do.
    pub fn fling(&mut self, direction: SwipeDirection) -> bool {
        if self.phase != GesturePhase::Idle {
            return false;
        }
        self.raw = (0.0, 0.0);
        self.begin_exit(direction);
        true
    }

    /// Advances any running animation by `dt_ms`. Returns the decision on the
    /// frame the exit animation completes, and never again.
    pub fn tick(&mut self, dt_ms: f64) -> Option<SwipeDecision> {
        let animation = self.animation.as_mut()?;
        let (position, done) = animation.advance(dt_ms);
        self.offset = position;
        if !done {
            return None;
        }

        self.animation = None;
        match self.phase {
            GesturePhase::Exiting(direction) if !self.decided => {
                self.decided = true;
                self.phase = GesturePhase::Finished;
                Some(SwipeDecision {
                    direction,
                    candidate_id: self.candidate_id.clone(),
                })
            }
            GesturePhase::Returning => {
                self.settle_at_rest();
                None
            }
            _ => None,
        }
    }

    pub fn transform(&self) -> CardTransform {
        let (translate_x, translate_y) = self.offset;
        let width = self.config.card_width.max(1.0);
        let rotation_deg = (translate_x / width).clamp(-1.0, 1.0) * self.config.max_rotation_deg;
        let scale = if self.phase == GesturePhase::Dragging {
            self.config.press_scale
        } else {
            1.0
        };
        CardTransform {
            translate_x,
            translate_y,
            rotation_deg,
            scale,
        }
    }

    fn begin_exit(&mut self, direction: SwipeDirection) {
        let distance = self.config.card_width * self.config.exit_distance_factor;
        let drift = self.raw.1 * self.config.exit_vertical_factor;
        let to = match direction {
            SwipeDirection::Right => (distance, drift),
            SwipeDirection::Left => (-distance, drift),
            SwipeDirection::None => (0.0, -distance),
        };
        self.phase = GesturePhase::Exiting(direction);
        self.progress = 1.0;
        self.animation = Some(Animation {
            from: self.offset,
            to,
            duration_ms: self.config.exit_duration_ms,
            elapsed_ms: 0.0,
        });
    }

    fn begin_return(&mut self) {
        self.phase = GesturePhase::Returning;
        self.progress = 0.0;
        self.animation = Some(Animation {
            from: self.offset,
            to: (0.0, 0.0),
            duration_ms: self.config.return_duration_ms,
            elapsed_ms: 0.0,
        });
    }

    fn settle_at_rest(&mut self) {
        self.phase = GesturePhase::Idle;
        self.raw = (0.0, 0.0);
        self.offset = (0.0, 0.0);
        self.progress = 0.0;
        self.animation = None;
    }
}

pub fn swipe_progress(dx: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 1.0;
    }
    (dx.abs() / threshold).min(1.0)
}

/// Style of a passive card `depth` positions below the top, following the
/// top card's progress toward the slot above it.
pub fn stacked_card_style(depth: usize, progress: f64) -> CardTransform {
    let p = progress.clamp(0.0, 1.0);
    let (scale, translate_y) = match depth {
        0 => return CardTransform::REST,
        1 => (lerp(0.95, 1.0, p), lerp(12.0, 0.0, p)),
        2 => (lerp(0.9, 0.95, p), lerp(24.0, 12.0, p)),
        _ => (0.9, 24.0),
    };
    CardTransform {
        translate_x: 0.0,
        translate_y,
        rotation_deg: 0.0,
        scale,
    }
}

pub fn next_photo_index(current: usize, photo_count: usize) -> usize {
    if photo_count == 0 {
        0
    } else {
        (current + 1) % photo_count
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> GestureDecisionEngine {
        GestureDecisionEngine::new("p1", GestureConfig::default())
    }

    fn release_at(dx: f64, dy: f64) -> (GestureDecisionEngine, Release) {
        let mut engine = engine();
        assert!(engine.drag_start());
        engine.drag_update(dx, dy);
        let release = engine.drag_end();
        (engine, release)
    }

    #[test]
    fn release_just_inside_threshold_returns() {
        let (engine, release) = release_at(119.0, 0.0);
        assert_eq!(release, Release::Returning);
        assert_eq!(engine.phase(), GesturePhase::Returning);
        assert_eq!(engine.progress(), 0.0);

        let (engine, release) = release_at(121.0, 0.0);
        assert_eq!(release, Release::Exiting(SwipeDirection::Right));
        assert_eq!(engine.phase(), GesturePhase::Exiting(SwipeDirection::Right));
    }

    #[test]
    fn release_exactly_at_threshold_returns_on_both_sides() {
        assert_eq!(release_at(120.0, 0.0).1, Release::Returning);
        assert_eq!(release_at(-120.0, 0.0).1, Release::Returning);
        assert_eq!(
            release_at(-120.5, 0.0).1,
            Release::Exiting(SwipeDirection::Left)
        );
    }

    #[test]
    fn oversized_tap_tolerance_still_lets_cards_exit() {
        let config = GestureConfig {
            tap_tolerance: 500.0,
            ..GestureConfig::default()
        };
        assert_eq!(config.normalized().tap_tolerance, 60.0);

        let mut engine = GestureDecisionEngine::new("p1", config);
        engine.drag_start();
        engine.drag_update(200.0, 0.0);
        assert_eq!(engine.drag_end(), Release::Exiting(SwipeDirection::Right));
    }

    #[test]
    fn vertical_movement_never_decides() {
        assert_eq!(release_at(40.0, 600.0).1, Release::Returning);
        assert_eq!(release_at(0.0, -600.0).1, Release::Returning);
    }

    #[test]
    fn progress_is_normalized_and_capped() {
        let mut engine = engine();
        engine.drag_start();
        assert_eq!(engine.drag_update(60.0, 0.0), Some(0.5));
        assert_eq!(engine.drag_update(-90.0, 0.0), Some(0.75));
        assert_eq!(engine.drag_update(400.0, 0.0), Some(1.0));
    }

    #[test]
    fn rotation_follows_dx_and_is_clamped() {
        let mut engine = engine();
        engine.drag_start();
        engine.drag_update(180.0, 50.0);
        let transform = engine.transform();
        assert!((transform.rotation_deg - 5.0).abs() < 1e-9);
        assert!((transform.translate_y - 5.0).abs() < 1e-9);
        assert_eq!(transform.scale, 1.05);

        engine.drag_update(-2_000.0, 0.0);
        assert!((engine.transform().rotation_deg + 10.0).abs() < 1e-9);
    }

    #[test]
    fn exit_emits_a_single_decision() {
        let (mut engine, _) = release_at(200.0, 30.0);

        assert_eq!(engine.tick(100.0), None);
        let decision = engine.tick(250.0);
        assert_eq!(
            decision,
            Some(SwipeDecision {
                direction: SwipeDirection::Right,
                candidate_id: "p1".to_string(),
            })
        );
        assert_eq!(engine.phase(), GesturePhase::Finished);

        assert_eq!(engine.tick(16.0), None);
        assert!(!engine.drag_start());
        assert!(!engine.fling(SwipeDirection::Left));
        assert_eq!(engine.drag_end(), Release::Ignored);
        assert_eq!(engine.tick(1_000.0), None);
    }

    #[test]
    fn exit_lands_off_screen_with_vertical_drift() {
        let (mut engine, _) = release_at(-150.0, 40.0);
        engine.tick(300.0);
        let transform = engine.transform();
        assert!((transform.translate_x + 540.0).abs() < 1e-9);
        assert!((transform.translate_y - 8.0).abs() < 1e-9);
    }

    #[test]
    fn returning_card_settles_and_can_be_dragged_again() {
        let (mut engine, _) = release_at(80.0, 10.0);
        assert!(!engine.drag_start());

        engine.tick(125.0);
        let halfway = engine.transform();
        assert!((halfway.translate_x - 40.0).abs() < 1e-9);
        assert_eq!(engine.phase(), GesturePhase::Returning);

        assert_eq!(engine.tick(125.0), None);
        assert_eq!(engine.phase(), GesturePhase::Idle);
        assert_eq!(engine.transform(), CardTransform::REST);
        assert!(engine.drag_start());
    }

    #[test]
    fn small_release_is_a_tap() {
        let (engine, release) = release_at(3.0, 2.0);
        assert_eq!(release, Release::Tap);
        assert_eq!(engine.phase(), GesturePhase::Idle);

        let mut engine = engine;
        engine.drag_start();
        engine.drag_update(30.0, 0.0);
        engine.drag_update(2.0, 0.0);
        assert_eq!(engine.drag_end(), Release::Returning);
    }

    #[test]
    fn cancel_returns_even_past_threshold() {
        let mut engine = engine();
        engine.drag_start();
        engine.drag_update(300.0, 0.0);
        assert_eq!(engine.cancel(), Release::Returning);
        assert_eq!(engine.progress(), 0.0);
        assert_eq!(engine.tick(250.0), None);
        assert_eq!(engine.phase(), GesturePhase::Idle);
        assert_eq!(engine.cancel(), Release::Ignored);
    }

    #[test]
    fn fling_from_idle_exits_and_decides() {
        let mut engine = engine();
        assert!(engine.fling(SwipeDirection::Left));
        assert_eq!(engine.progress(), 1.0);
        let decision = engine.tick(300.0).unwrap();
        assert_eq!(decision.direction, SwipeDirection::Left);
    }

    #[test]
    fn stacked_cards_move_up_with_progress() {
        assert_eq!(stacked_card_style(0, 0.4), CardTransform::REST);

        let second = stacked_card_style(1, 0.0);
        assert_eq!((second.scale, second.translate_y), (0.95, 12.0));
        let second = stacked_card_style(1, 1.0);
        assert_eq!((second.scale, second.translate_y), (1.0, 0.0));

        let third = stacked_card_style(2, 0.5);
        assert!((third.scale - 0.925).abs() < 1e-9);
        assert!((third.translate_y - 18.0).abs() < 1e-9);
    }

    #[test]
    fn photo_index_wraps() {
        assert_eq!(next_photo_index(0, 3), 1);
        assert_eq!(next_photo_index(2, 3), 0);
        assert_eq!(next_photo_index(0, 0), 0);
    }
}

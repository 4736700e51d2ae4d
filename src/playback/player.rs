//! Playback state machine over a [`Timeline`].
//!
//! Invariant: at most one timer is armed, and only while `Playing`. Every transition out of
//! `Playing` cancels it, and a fired id that is not the armed one is ignored, so a cancelled
//! tick can never move the cursor.

use std::time::Duration;

use tracing::trace;

use super::clock::{Scheduler, TimerId};
use super::speed::PlaybackSpeed;
use crate::config::PlayerConfig;
use crate::core::text::markup::MarkupOptions;
use crate::core::thought::AgentThought;
use crate::core::timeline::{MarkerTick, Timeline};

/// Floor for the delay between two ticks.
pub const DEFAULT_MIN_TICK: Duration = Duration::from_millis(10);

const SMALLEST_MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    /// The scrub control is held; `resume_playing` is restored on release.
    Seeking { resume_playing: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingTick {
    id: TimerId,
    target_time: f64,
}

pub struct Player<S: Scheduler> {
    timeline: Timeline,
    scheduler: S,
    current_time: f64,
    state: PlaybackState,
    speed: PlaybackSpeed,
    min_tick: Duration,
    markup: MarkupOptions,
    pending: Option<PendingTick>,
}

impl<S: Scheduler> Player<S> {
    pub fn new(timeline: Timeline, scheduler: S) -> Self {
        Self {
            timeline,
            scheduler,
            current_time: 0.0,
            state: PlaybackState::Stopped,
            speed: PlaybackSpeed::default(),
            min_tick: DEFAULT_MIN_TICK,
            markup: MarkupOptions::default(),
            pending: None,
        }
    }

    pub fn with_config(timeline: Timeline, scheduler: S, config: &PlayerConfig) -> Self {
        let mut player = Self::new(timeline, scheduler);
        player.speed = config.speed;
        player.min_tick = config.min_tick.max(SMALLEST_MIN_TICK);
        player.markup = config.markup_options();
        player
    }

    /// Replaces the recording. The old timeline is discarded and playback stops at 0.
    pub fn load(&mut self, cast_text: &str) {
        self.replace_timeline(Timeline::load(cast_text));
    }

    pub fn replace_timeline(&mut self, timeline: Timeline) {
        self.cancel_pending();
        self.timeline = timeline;
        self.current_time = 0.0;
        self.state = PlaybackState::Stopped;
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn max_time(&self) -> f64 {
        self.timeline.max_time()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    /// Position as a fraction of the recording, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        let max_time = self.max_time();
        if max_time <= 0.0 {
            return 0.0;
        }
        (self.current_time / max_time).clamp(0.0, 1.0)
    }

    /// Starts playback. Returns `false` when there is nothing left to play.
    pub fn play(&mut self) -> bool {
        match self.state {
            PlaybackState::Playing => true,
            PlaybackState::Seeking { .. } => {
                self.state = PlaybackState::Seeking {
                    resume_playing: true,
                };
                true
            }
            PlaybackState::Stopped => {
                if self.timeline.is_empty() || self.current_time >= self.max_time() {
                    return false;
                }
                self.state = PlaybackState::Playing;
                self.schedule_next();
                true
            }
        }
    }

    pub fn pause(&mut self) {
        self.cancel_pending();
        self.state = match self.state {
            PlaybackState::Seeking { .. } => PlaybackState::Seeking {
                resume_playing: false,
            },
            _ => PlaybackState::Stopped,
        };
    }

    /// Toggles between playing and paused.
    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    /// Jumps to 0 and stops. Never resumes playback on its own.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.current_time = 0.0;
        self.state = PlaybackState::Stopped;
    }

    /// Moves the cursor, clamped to `[0, max_time]`.
    pub fn seek(&mut self, time_seconds: f64) {
        self.current_time = self.clamp_time(time_seconds);
        if self.state == PlaybackState::Playing {
            self.schedule_next();
        }
    }

    /// The scrub control was grabbed.
    pub fn begin_seek(&mut self) {
        if let PlaybackState::Seeking { .. } = self.state {
            return;
        }
        self.cancel_pending();
        self.state = PlaybackState::Seeking {
            resume_playing: self.state == PlaybackState::Playing,
        };
    }

    /// The scrub control was released; restores the state from before the seek.
    pub fn end_seek(&mut self) {
        let PlaybackState::Seeking { resume_playing } = self.state else {
            return;
        };
        self.state = PlaybackState::Stopped;
        if resume_playing {
            self.play();
        }
    }

    /// Changes the multiplier without moving the cursor.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        if self.speed == speed {
            return;
        }
        self.speed = speed;
        if self.state == PlaybackState::Playing {
            self.schedule_next();
        }
    }

    /// Delivers a fired timer. Returns `true` when the cursor moved.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if pending.id != id || self.state != PlaybackState::Playing {
            trace!(timer = id.get(), "ignoring stale playback tick");
            return false;
        }

        self.pending = None;
        self.current_time = pending.target_time;
        self.schedule_next();
        true
    }

    /// Cancels the armed timer and stops. Called when the viewer goes away.
    pub fn shutdown(&mut self) {
        self.cancel_pending();
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Stopped;
        }
    }

    pub fn visible_output_markup(&self) -> String {
        self.timeline
            .visible_output_markup_with(self.current_time, &self.markup)
    }

    pub fn visible_output_text(&self) -> String {
        self.timeline.visible_output_text(self.current_time)
    }

    pub fn active_thought(&self) -> Option<&AgentThought> {
        self.timeline.active_thought(self.current_time)
    }

    pub fn marker_ticks(&self) -> Vec<MarkerTick> {
        self.timeline.marker_ticks()
    }

    fn schedule_next(&mut self) {
        self.cancel_pending();

        let Some(next) = self.timeline.next_event_after(self.current_time) else {
            self.current_time = self.max_time();
            self.state = PlaybackState::Stopped;
            trace!(time = self.current_time, "playback reached the end");
            return;
        };

        let target_time = next.timestamp_offset;
        let gap_secs = (target_time - self.current_time) / self.speed.multiplier();
        let delay = Duration::try_from_secs_f64(gap_secs)
            .unwrap_or(self.min_tick)
            .max(self.min_tick);
        let id = self.scheduler.schedule_once(delay);
        trace!(
            timer = id.get(),
            target = target_time,
            delay_ms = delay.as_millis() as u64,
            "scheduled playback tick"
        );
        self.pending = Some(PendingTick { id, target_time });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.scheduler.cancel(pending.id);
        }
    }

    fn clamp_time(&self, time: f64) -> f64 {
        if time.is_nan() {
            return 0.0;
        }
        time.clamp(0.0, self.max_time())
    }
}

impl<S: Scheduler> Drop for Player<S> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::{PlaybackState, Player};
    use crate::config::PlayerConfig;
    use crate::core::timeline::Timeline;
    use crate::playback::clock::{ManualScheduler, Scheduler, TimerId};
    use crate::playback::speed::PlaybackSpeed;

    /// Clock the test keeps a handle to after the player is gone.
    #[derive(Clone, Default)]
    struct SharedClock(Rc<RefCell<ManualScheduler>>);

    impl Scheduler for SharedClock {
        fn schedule_once(&mut self, delay: Duration) -> TimerId {
            self.0.borrow_mut().schedule_once(delay)
        }

        fn cancel(&mut self, id: TimerId) {
            self.0.borrow_mut().cancel(id);
        }
    }

    fn player(cast: &str) -> Player<ManualScheduler> {
        Player::new(Timeline::load(cast), ManualScheduler::new())
    }

    fn fire_next(player: &mut Player<ManualScheduler>) -> bool {
        match player.scheduler_mut().advance_to_next() {
            Some(id) => player.on_timer(id),
            None => false,
        }
    }

    const CAST: &str = "{\"version\": 2}\n[0, \"o\", \"a\"]\n[1, \"o\", \"b\"]\n[3, \"o\", \"c\"]\n";

    #[test]
    fn delay_is_gap_divided_by_speed() {
        let mut player = player(CAST);
        player.set_speed(PlaybackSpeed::Double);
        assert!(player.play());
        assert_eq!(
            player.scheduler().next_delay(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn ticks_walk_events_and_auto_stop() {
        let mut player = player(CAST);
        assert!(player.play());
        assert!(fire_next(&mut player));
        assert_eq!(player.current_time(), 1.0);
        assert!(fire_next(&mut player));
        assert_eq!(player.current_time(), 3.0);
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.scheduler().pending_count(), 0);
        assert_eq!(player.scheduler().now(), Duration::from_secs(3));
    }

    #[test]
    fn play_at_end_or_on_empty_timeline_is_noop() {
        let mut empty = player("");
        assert!(!empty.play());
        assert_eq!(empty.state(), PlaybackState::Stopped);

        let mut player = player(CAST);
        player.seek(3.0);
        assert!(!player.play());
    }

    #[test]
    fn pause_cancels_the_armed_tick() {
        let mut player = player(CAST);
        player.play();
        let stale = player.pending.expect("armed").id;
        player.pause();
        assert_eq!(player.scheduler().pending_count(), 0);
        assert!(!player.on_timer(stale));
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn seek_round_trip_restores_playing() {
        let mut player = player(CAST);
        player.play();
        player.begin_seek();
        assert_eq!(
            player.state(),
            PlaybackState::Seeking {
                resume_playing: true
            }
        );
        assert_eq!(player.scheduler().pending_count(), 0);
        player.seek(2.0);
        player.end_seek();
        assert!(player.is_playing());
        assert_eq!(
            player.scheduler().next_delay(),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn seek_round_trip_restores_stopped() {
        let mut player = player(CAST);
        player.begin_seek();
        player.seek(1.5);
        player.end_seek();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.current_time(), 1.5);
    }

    #[test]
    fn reset_stops_and_rewinds() {
        let mut player = player(CAST);
        player.play();
        fire_next(&mut player);
        player.reset();
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.scheduler().pending_count(), 0);
    }

    #[test]
    fn seek_is_clamped() {
        let mut player = player(CAST);
        player.seek(-4.0);
        assert_eq!(player.current_time(), 0.0);
        player.seek(99.0);
        assert_eq!(player.current_time(), 3.0);
        player.seek(f64::NAN);
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn minimum_tick_floor_applies_to_tiny_gaps() {
        let mut player = player("[0, \"o\", \"a\"]\n[0.001, \"o\", \"b\"]\n");
        player.play();
        assert_eq!(
            player.scheduler().next_delay(),
            Some(Duration::from_millis(10))
        );
    }

    #[test]
    fn loading_a_new_recording_cancels_playback() {
        let mut player = player(CAST);
        player.play();
        let stale = player.pending.expect("armed").id;
        player.load("[0, \"o\", \"x\"]\n[5, \"o\", \"y\"]\n");
        assert!(!player.on_timer(stale));
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.max_time(), 5.0);
        assert_eq!(player.scheduler().pending_count(), 0);
    }

    #[test]
    fn speed_change_rederives_pending_delay() {
        let mut player = player(CAST);
        player.play();
        player.set_speed(PlaybackSpeed::Quadruple);
        assert_eq!(player.scheduler().pending_count(), 1);
        assert_eq!(
            player.scheduler().next_delay(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn shutdown_cancels_the_clock_synchronously() {
        let mut player = player(CAST);
        player.play();
        let stale = player.pending.expect("armed").id;

        player.shutdown();

        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.scheduler().pending_count(), 0);
        assert!(!player.on_timer(stale));
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn dropping_a_playing_player_disarms_its_timer() {
        let clock = SharedClock::default();
        let mut player = Player::new(Timeline::load(CAST), clock.clone());
        assert!(player.play());
        assert_eq!(clock.0.borrow().pending_count(), 1);

        drop(player);

        assert_eq!(clock.0.borrow().pending_count(), 0);
        assert_eq!(clock.0.borrow_mut().advance_to_next(), None);
    }

    #[test]
    fn play_while_scrubbing_resumes_on_release() {
        let mut player = player(CAST);
        player.begin_seek();
        assert!(player.play());
        assert_eq!(
            player.state(),
            PlaybackState::Seeking {
                resume_playing: true
            }
        );
        assert_eq!(player.scheduler().pending_count(), 0);

        player.end_seek();
        assert!(player.is_playing());
        assert_eq!(player.scheduler().pending_count(), 1);
    }

    #[test]
    fn pause_while_scrubbing_stays_stopped_on_release() {
        let mut player = player(CAST);
        player.play();
        player.begin_seek();
        player.pause();
        assert_eq!(
            player.state(),
            PlaybackState::Seeking {
                resume_playing: false
            }
        );

        player.seek(1.0);
        player.end_seek();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.current_time(), 1.0);
        assert_eq!(player.scheduler().pending_count(), 0);
    }

    #[test]
    fn toggle_flips_between_playing_and_stopped() {
        let mut player = player(CAST);
        assert!(player.toggle());
        assert!(player.is_playing());
        assert!(!player.toggle());
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.scheduler().pending_count(), 0);

        player.seek(3.0);
        assert!(!player.toggle());
    }

    #[test]
    fn zero_configured_floor_still_delays() {
        let config = PlayerConfig {
            min_tick: Duration::ZERO,
            ..PlayerConfig::default()
        };
        let mut player = Player::with_config(
            Timeline::load("[0, \"o\", \"a\"]\n[0, \"o\", \"b\"]\n[0.0001, \"o\", \"c\"]\n"),
            ManualScheduler::new(),
            &config,
        );
        player.play();
        assert_eq!(player.scheduler().next_delay(), Some(Duration::from_millis(1)));
    }
}

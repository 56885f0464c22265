//! Gateway Regression Tests
//!
//! End-to-end game behaviour through the public API: the clock policies, the
//! penalty bookkeeping seen by GetState, and the frame analysis loop wired to
//! a live referee. Clock tests run on tokio's paused clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use redlight_referee::config::defaults::PLACEHOLDER_TEXT;
use redlight_referee::game::{
    ClockPolicy, DebounceMode, GameClock, GameOverPolicy, GameRules, PenaltyAction,
    PenaltyRules, SharedReferee, StateGateway,
};
use redlight_referee::motion::MotionClassifier;
use redlight_referee::pipeline::{
    frame_channel, open_or_placeholder, FrameAnalysisLoop, FrameEvent, FrameSource,
    NoCaptureBackend, Overlay, PlaceholderSource, PpmRenderer, SourceError,
};
use redlight_referee::types::{Frame, FrameOrigin, Mode};

fn fixed(game_over: GameOverPolicy) -> ClockPolicy {
    ClockPolicy::FixedDuration {
        green_secs: 5,
        red_secs: 4,
        game_over,
    }
}

fn new_game(clock: ClockPolicy, penalty: PenaltyRules) -> (SharedReferee, StateGateway) {
    let referee = SharedReferee::new(GameRules { clock, penalty }, 500);
    let gateway = StateGateway::new(referee.clone());
    (referee, gateway)
}

/// 160x120 grey scene with an optional bright 40x40 block.
fn scene(block_at: Option<(usize, usize)>) -> Frame {
    let mut frame = Frame::filled(160, 120, [40, 40, 40], FrameOrigin::Camera);
    if let Some((bx, by)) = block_at {
        let width = frame.width();
        let pixels = frame.pixels_mut();
        for y in by..by + 40 {
            for x in bx..bx + 40 {
                let i = (y * width + x) * 3;
                pixels[i..i + 3].copy_from_slice(&[220, 220, 220]);
            }
        }
    }
    frame
}

/// Source that issues a gateway command before yielding each frame, so mode
/// changes land between frames deterministically.
struct ScriptedSource {
    gateway: StateGateway,
    steps: std::vec::IntoIter<(Option<&'static str>, Frame)>,
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        match self.steps.next() {
            Some((mode, frame)) => {
                if let Some(mode) = mode {
                    self.gateway.set_mode(mode).unwrap();
                }
                Ok(FrameEvent::Frame(frame))
            }
            None => Ok(FrameEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "scripted"
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn analysis_loop(referee: SharedReferee, cancel: CancellationToken) -> FrameAnalysisLoop {
    let (tx, _rx) = frame_channel();
    FrameAnalysisLoop::new(
        referee,
        MotionClassifier::default(),
        Arc::new(PpmRenderer),
        tx,
        cancel,
    )
}

// ============================================================================
// Clock policies
// ============================================================================

#[test]
fn budgeted_total_is_monotone_and_game_over_sticks() {
    let policy = ClockPolicy::Budgeted {
        total_secs: 12,
        interval_secs: 5,
    };
    let (referee, gateway) = new_game(policy, PenaltyRules::default());
    gateway.start();

    let mut last_total = referee.peek().total_time_remaining;
    for _ in 0..30 {
        referee.tick();
        let snap = referee.peek();
        assert!(snap.total_time_remaining <= last_total);
        last_total = snap.total_time_remaining;
    }
    let snap = referee.peek();
    assert_eq!(snap.total_time_remaining, 0);
    assert_eq!(snap.mode, Mode::GameOver);

    // Commands cannot revive an exhausted budget
    assert_eq!(gateway.set_mode("RED").unwrap().mode, Mode::GameOver);
    referee.tick();
    assert_eq!(referee.peek().mode, Mode::GameOver);

    gateway.restart();
    assert_eq!(referee.peek().mode, Mode::Idle);
    assert_eq!(referee.peek().total_time_remaining, 12);
}

#[test]
fn fixed_policy_returns_to_green_after_full_cycle() {
    let (referee, _gateway) = new_game(fixed(GameOverPolicy::Terminal), PenaltyRules::default());
    assert_eq!(referee.peek().mode, Mode::Green);

    for _ in 0..5 {
        referee.tick();
    }
    assert_eq!(referee.peek().mode, Mode::Red);
    for _ in 0..4 {
        referee.tick();
    }
    assert_eq!(referee.peek().mode, Mode::Green);
}

#[test]
fn fixed_game_over_auto_restart_vs_terminal() {
    let (auto, auto_gw) = new_game(
        fixed(GameOverPolicy::AutoRestart { cooldown_secs: 3 }),
        PenaltyRules::default(),
    );
    auto_gw.end();
    for _ in 0..3 {
        auto.tick();
    }
    assert_eq!(auto.peek().mode, Mode::Green);

    let (terminal, terminal_gw) = new_game(fixed(GameOverPolicy::Terminal), PenaltyRules::default());
    terminal_gw.end();
    for _ in 0..20 {
        terminal.tick();
    }
    assert_eq!(terminal.peek().mode, Mode::GameOver);
}

#[tokio::test(start_paused = true)]
async fn start_then_interval_flips_to_red() {
    let (referee, gateway) = new_game(fixed(GameOverPolicy::Terminal), PenaltyRules::default());
    assert_eq!(gateway.start().mode, Mode::Green);

    let cancel = CancellationToken::new();
    let clock = tokio::spawn(GameClock::new(referee.clone(), cancel.clone()).run());

    tokio::time::sleep(Duration::from_millis(4_500)).await;
    assert_eq!(referee.peek().mode, Mode::Green);

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(referee.peek().mode, Mode::Red);

    cancel.cancel();
    let stats = clock.await.unwrap();
    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.transitions, 1);
}

#[tokio::test]
async fn client_driven_clock_exits_immediately() {
    let (referee, gateway) = new_game(ClockPolicy::ClientDriven, PenaltyRules::default());
    let stats = GameClock::new(referee.clone(), CancellationToken::new()).run().await;
    assert_eq!(stats.ticks, 0);

    gateway.set_mode("red").unwrap();
    assert_eq!(referee.peek().mode, Mode::Red);
}

// ============================================================================
// Penalties through GetState
// ============================================================================

#[test]
fn two_motions_200ms_apart_flash_once() {
    let (referee, gateway) = new_game(ClockPolicy::default(), PenaltyRules::default());
    gateway.set_mode("RED").unwrap();

    let t0 = Instant::now();
    assert!(referee.register_penalty(t0).is_accepted());
    assert!(!referee.register_penalty(t0 + Duration::from_millis(200)).is_accepted());

    let first = gateway.get_state();
    assert!(first.penalty_flash);
    assert_eq!(first.penalty_count, 1);
    assert!(!gateway.get_state().penalty_flash);
}

#[test]
fn penalty_outside_red_is_ignored() {
    let (referee, gateway) = new_game(ClockPolicy::default(), PenaltyRules::default());
    gateway.start();
    assert!(!referee.register_penalty(Instant::now()).is_accepted());
    assert_eq!(gateway.get_state().penalty_count, 0);
}

#[test]
fn time_and_flag_waits_for_the_flash_to_be_read() {
    let rules = PenaltyRules {
        debounce: DebounceMode::TimeAndFlag,
        ..PenaltyRules::default()
    };
    let (referee, gateway) = new_game(ClockPolicy::default(), rules);
    gateway.set_mode("RED").unwrap();

    let t0 = Instant::now();
    assert!(referee.register_penalty(t0).is_accepted());
    assert!(!referee.register_penalty(t0 + Duration::from_millis(1_500)).is_accepted());

    assert!(gateway.get_state().penalty_flash);
    assert!(referee.register_penalty(t0 + Duration::from_millis(3_000)).is_accepted());
    assert_eq!(gateway.get_state().penalty_count, 2);
}

#[test]
fn deduct_never_goes_below_zero() {
    let rules = PenaltyRules {
        action: PenaltyAction::Deduct { secs: 7 },
        ..PenaltyRules::default()
    };
    let policy = ClockPolicy::Budgeted {
        total_secs: 10,
        interval_secs: 5,
    };
    let (referee, gateway) = new_game(policy, rules);
    gateway.start();
    gateway.set_mode("RED").unwrap();

    let t0 = Instant::now();
    referee.register_penalty(t0);
    assert_eq!(referee.peek().total_time_remaining, 3);
    referee.register_penalty(t0 + Duration::from_secs(2));
    assert_eq!(referee.peek().total_time_remaining, 0);

    referee.tick();
    assert_eq!(referee.peek().mode, Mode::GameOver);
}

#[test]
fn restart_keeps_threshold_and_clears_penalties() {
    let (referee, gateway) = new_game(ClockPolicy::default(), PenaltyRules::default());
    gateway.set_threshold(1234).unwrap();
    gateway.set_mode("RED").unwrap();
    referee.register_penalty(Instant::now());

    let snap = gateway.restart();
    assert_eq!(snap.mode, Mode::Idle);
    assert_eq!(snap.penalty_count, 0);
    assert!(!snap.penalty_flash);
    assert_eq!(snap.motion_threshold, 1234);
}

// ============================================================================
// Frame analysis against a live referee
// ============================================================================

#[tokio::test]
async fn baseline_resets_between_red_runs() {
    let (referee, gateway) = new_game(ClockPolicy::ClientDriven, PenaltyRules::default());
    let releases = Arc::new(AtomicUsize::new(0));
    let source = ScriptedSource {
        gateway: gateway.clone(),
        steps: vec![
            (Some("RED"), scene(None)),
            (Some("GREEN"), scene(Some((10, 10)))),
            // First frame of the second RED run differs wildly from the last
            // RED frame but must only become the new baseline.
            (Some("RED"), scene(Some((100, 60)))),
            (None, scene(Some((100, 60)))),
        ]
        .into_iter(),
        releases: Arc::clone(&releases),
    };

    let stats = analysis_loop(referee.clone(), CancellationToken::new())
        .run(Box::new(source))
        .await;

    assert_eq!(stats.frames, 4);
    assert_eq!(stats.classified, 1);
    assert_eq!(stats.motion_frames, 0);
    assert_eq!(gateway.get_state().penalty_count, 0);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn motion_during_red_is_penalised_once_per_cooldown() {
    let (referee, gateway) = new_game(ClockPolicy::ClientDriven, PenaltyRules::default());
    let releases = Arc::new(AtomicUsize::new(0));
    let source = ScriptedSource {
        gateway: gateway.clone(),
        steps: vec![
            (Some("RED"), scene(None)),
            (None, scene(Some((10, 10)))),
            (None, scene(Some((100, 60)))),
        ]
        .into_iter(),
        releases: Arc::clone(&releases),
    };

    let stats = analysis_loop(referee, CancellationToken::new())
        .run(Box::new(source))
        .await;

    assert_eq!(stats.motion_frames, 2);
    assert_eq!(stats.penalties_accepted, 1);
    assert!(gateway.get_state().penalty_flash);
    assert!(!gateway.get_state().penalty_flash);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unavailable_camera_streams_placeholders() {
    let mut source = open_or_placeholder(
        &NoCaptureBackend,
        0,
        None,
        PlaceholderSource::new(64, 48, 10),
    );
    let (referee, _gateway) = new_game(ClockPolicy::default(), PenaltyRules::default());

    for _ in 0..10 {
        let frame = match source.next_frame().await.unwrap() {
            FrameEvent::Frame(frame) => frame,
            FrameEvent::Eof => panic!("placeholder stream must not end"),
        };
        assert!(frame.is_placeholder());
        let overlay = Overlay::compose(&referee.peek(), &referee.rules().clock, &frame);
        assert_eq!(overlay.lines[0], PLACEHOLDER_TEXT);
    }

    // The loop keeps going on placeholders until shutdown.
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(analysis_loop(referee, cancel.clone()).run(source));
    tokio::time::sleep(Duration::from_millis(1_250)).await;
    assert!(!handle.is_finished());
    cancel.cancel();

    let stats = handle.await.unwrap();
    assert!(stats.placeholder_frames >= 10);
    assert_eq!(stats.frames, stats.placeholder_frames);
    assert_eq!(stats.classified, 0);
}

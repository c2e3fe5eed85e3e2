use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use spotbridge::{
    error::{ApiError, AuthError},
    playback::{
        Classification, PlaybackFactory, PlaybackHandle, PlaybackMonitor, StateListener, classify,
    },
    spotify::player::{DEFAULT_VOLUME, Player},
    types::{Device, PlaybackObservation, PlaybackState},
};

const TRACK: &str = "T1";
const DEVICE: &str = "device-1";
const INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Resume(Option<String>),
    Pause,
}

type Poll = Result<Option<PlaybackObservation>, ApiError>;

/// Scripted player. Once the script runs out every poll answers 502.
#[derive(Default)]
struct FakePlayer {
    script: Mutex<VecDeque<Poll>>,
    commands: Mutex<Vec<Command>>,
    fail_resume: AtomicBool,
    fail_pause: AtomicBool,
    polls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakePlayer {
    fn scripted(script: Vec<Poll>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    fn pauses(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| **c == Command::Pause)
            .count()
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

fn status(status: u16) -> ApiError {
    ApiError::Status {
        status,
        message: String::new(),
    }
}

#[async_trait]
impl Player for FakePlayer {
    async fn resume(&self, _device_id: &str, track_uri: Option<&str>) -> Result<(), ApiError> {
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(status(404));
        }
        self.commands
            .lock()
            .unwrap()
            .push(Command::Resume(track_uri.map(str::to_string)));
        Ok(())
    }

    async fn pause(&self, _device_id: &str) -> Result<(), ApiError> {
        if self.fail_pause.load(Ordering::SeqCst) {
            return Err(ApiError::Auth(AuthError::Busy));
        }
        self.commands.lock().unwrap().push(Command::Pause);
        Ok(())
    }

    async fn current_playback(&self) -> Result<Option<PlaybackObservation>, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.polls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(2)).await;
        let next = self.script.lock().unwrap().pop_front();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Err(status(502)))
    }

    async fn set_volume(&self, _device_id: &str, _percent: u8) -> Result<(), ApiError> {
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, ApiError> {
        Ok(Vec::new())
    }
}

fn playing(track: &str) -> Poll {
    Ok(Some(PlaybackObservation {
        is_playing: true,
        progress_ms: Some(1_000),
        track_id: Some(track.to_string()),
        ..Default::default()
    }))
}

fn stopped(track: &str, progress_ms: u64) -> Poll {
    Ok(Some(PlaybackObservation {
        is_playing: false,
        progress_ms: Some(progress_ms),
        track_id: Some(track.to_string()),
        ..Default::default()
    }))
}

fn recorder() -> (StateListener, Arc<Mutex<Vec<PlaybackState>>>) {
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let listener: StateListener = Arc::new(move |state| sink.lock().unwrap().push(state));
    (listener, states)
}

fn monitor(player: &Arc<FakePlayer>) -> (PlaybackMonitor, Arc<Mutex<Vec<PlaybackState>>>) {
    let (listener, states) = recorder();
    let player: Arc<dyn Player> = player.clone();
    (
        PlaybackMonitor::new(player, DEVICE, TRACK, INTERVAL, listener),
        states,
    )
}

async fn finish(monitor: &PlaybackMonitor) {
    tokio::time::timeout(Duration::from_secs(2), monitor.wait_for_finish())
        .await
        .expect("playback did not finish");
}

fn recorded(states: &Arc<Mutex<Vec<PlaybackState>>>) -> Vec<PlaybackState> {
    states.lock().unwrap().clone()
}

#[tokio::test]
async fn test_next_track_finishes_playback() {
    let player = FakePlayer::scripted(vec![playing(TRACK), playing(TRACK), stopped("T2", 0)]);
    let (mut monitor, states) = monitor(&player);

    monitor.play().await;
    finish(&monitor).await;

    assert_eq!(
        recorded(&states),
        vec![PlaybackState::Play, PlaybackState::Play, PlaybackState::Done]
    );
    assert!(monitor.is_done());
    assert_eq!(player.polls(), 3);
}

#[tokio::test]
async fn test_rewound_track_finishes_playback() {
    let player = FakePlayer::scripted(vec![playing(TRACK), stopped(TRACK, 0)]);
    let (mut monitor, states) = monitor(&player);

    monitor.play().await;
    finish(&monitor).await;

    assert_eq!(
        recorded(&states),
        vec![PlaybackState::Play, PlaybackState::Done]
    );
}

#[tokio::test]
async fn test_pause_and_resume_are_reported() {
    let player = FakePlayer::scripted(vec![
        playing(TRACK),
        stopped(TRACK, 42_000),
        playing(TRACK),
        Ok(None),
    ]);
    let (mut monitor, states) = monitor(&player);

    monitor.play().await;
    finish(&monitor).await;

    assert_eq!(
        recorded(&states),
        vec![
            PlaybackState::Play,
            PlaybackState::Pause,
            PlaybackState::Play,
            PlaybackState::Done,
        ]
    );
}

#[tokio::test]
async fn test_first_play_sends_track_uri() {
    let player = FakePlayer::scripted(vec![playing(TRACK), playing(TRACK), Ok(None)]);
    let (mut monitor, _states) = monitor(&player);

    monitor.play().await;
    monitor.play().await;
    finish(&monitor).await;

    assert_eq!(
        player.commands(),
        vec![
            Command::Resume(Some("spotify:track:T1".to_string())),
            Command::Resume(None),
        ]
    );
    // a second play must not start a second polling loop
    assert_eq!(player.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(player.polls(), 3);
}

#[tokio::test]
async fn test_failed_play_is_broken() {
    let player = FakePlayer::scripted(vec![playing(TRACK)]);
    player.fail_resume.store(true, Ordering::SeqCst);
    let (mut monitor, states) = monitor(&player);

    monitor.play().await;
    tokio::time::sleep(INTERVAL * 5).await;

    assert_eq!(recorded(&states), vec![PlaybackState::Broken]);
    assert!(!monitor.session().started);
    assert!(!monitor.is_done());
    assert_eq!(player.polls(), 0);

    monitor.close().await;
    assert_eq!(player.pauses(), 0);
}

#[tokio::test]
async fn test_failed_pause_is_broken() {
    let player = FakePlayer::scripted(Vec::new());
    player.fail_pause.store(true, Ordering::SeqCst);
    let (mut monitor, states) = monitor(&player);

    monitor.pause().await;

    assert_eq!(recorded(&states), vec![PlaybackState::Broken]);
}

#[tokio::test]
async fn test_poll_errors() {
    let player = FakePlayer::scripted(vec![
        Err(status(502)),
        Err(status(401)),
        playing(TRACK),
        Ok(None),
    ]);
    let (mut monitor, states) = monitor(&player);

    monitor.play().await;
    finish(&monitor).await;

    // the gateway error is only logged
    assert_eq!(
        recorded(&states),
        vec![
            PlaybackState::Broken,
            PlaybackState::Play,
            PlaybackState::Done,
        ]
    );
}

#[tokio::test]
async fn test_close_pauses_once_and_silences() {
    let player = FakePlayer::scripted((0..1_000).map(|_| playing(TRACK)).collect());
    let (mut monitor, states) = monitor(&player);

    monitor.play().await;
    tokio::time::sleep(INTERVAL * 4).await;

    monitor.close().await;
    monitor.close().await;
    finish(&monitor).await;

    let after_close = recorded(&states);
    let polls_after_close = player.polls();
    tokio::time::sleep(INTERVAL * 4).await;

    assert_eq!(recorded(&states), after_close);
    assert_eq!(player.polls(), polls_after_close);
    assert!(!after_close.contains(&PlaybackState::Done));
    assert_eq!(player.pauses(), 1);
    assert!(monitor.is_done());
}

#[tokio::test]
async fn test_close_before_play() {
    let player = FakePlayer::scripted(Vec::new());
    let (mut monitor, states) = monitor(&player);

    monitor.close().await;
    finish(&monitor).await;

    assert!(monitor.is_done());
    assert!(player.commands().is_empty());
    assert!(recorded(&states).is_empty());
}

#[tokio::test]
async fn test_commands_ignored_after_done() {
    let player = FakePlayer::scripted(vec![Ok(None)]);
    let (mut monitor, states) = monitor(&player);

    monitor.play().await;
    finish(&monitor).await;

    monitor.play().await;
    monitor.pause().await;

    assert_eq!(
        player.commands(),
        vec![Command::Resume(Some("spotify:track:T1".to_string()))]
    );
    assert_eq!(recorded(&states), vec![PlaybackState::Done]);
}

#[tokio::test]
async fn test_listener_can_inspect_session() {
    let player = FakePlayer::scripted(vec![playing(TRACK), Ok(None)]);
    let handle: Arc<OnceLock<PlaybackHandle>> = Arc::new(OnceLock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let listener: StateListener = {
        let handle = Arc::clone(&handle);
        let seen = Arc::clone(&seen);
        Arc::new(move |state| {
            let session = handle.get().unwrap().session();
            seen.lock().unwrap().push((state, session.started, session.done));
        })
    };

    let mut monitor = PlaybackMonitor::new(player.clone(), DEVICE, TRACK, INTERVAL, listener);
    assert!(handle.set(monitor.handle()).is_ok());

    monitor.play().await;
    finish(&monitor).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (PlaybackState::Play, true, false),
            (PlaybackState::Done, true, true),
        ]
    );
    assert!(handle.get().unwrap().is_done());
}

#[tokio::test]
async fn test_factory_binds_device() {
    let player = FakePlayer::scripted(Vec::new());
    let factory = PlaybackFactory::new(player.clone(), DEVICE, INTERVAL);
    let (listener, _states) = recorder();

    let monitor = factory.playback("T9", listener);
    let session = monitor.session();

    assert_eq!(factory.device_id(), DEVICE);
    assert_eq!(session.device_id, DEVICE);
    assert_eq!(session.track_id, "T9");
    assert!(!session.started);
    assert!(!session.done);
}

#[tokio::test]
async fn test_default_volume() {
    let player = FakePlayer::scripted(vec![
        Ok(None),
        Ok(Some(PlaybackObservation {
            volume_percent: Some(35),
            ..Default::default()
        })),
    ]);

    assert_eq!(player.volume().await.unwrap(), DEFAULT_VOLUME);
    assert_eq!(player.volume().await.unwrap(), 35);
}

#[test]
fn test_classify() {
    let observe = |is_playing: bool, track: Option<&str>, progress_ms: Option<u64>| {
        PlaybackObservation {
            is_playing,
            progress_ms,
            track_id: track.map(str::to_string),
            ..Default::default()
        }
    };

    assert_eq!(classify(None, TRACK), Classification::Finished);
    assert_eq!(
        classify(Some(&observe(true, Some(TRACK), Some(10))), TRACK),
        Classification::Playing
    );
    assert_eq!(
        classify(Some(&observe(true, Some("T2"), Some(10))), TRACK),
        Classification::Finished
    );
    assert_eq!(
        classify(Some(&observe(false, Some(TRACK), Some(10))), TRACK),
        Classification::Paused
    );
    assert_eq!(
        classify(Some(&observe(false, Some(TRACK), Some(0))), TRACK),
        Classification::Finished
    );
    assert_eq!(
        classify(Some(&observe(false, Some(TRACK), None)), TRACK),
        Classification::Finished
    );
    assert_eq!(
        classify(Some(&observe(false, None, Some(10))), TRACK),
        Classification::Finished
    );
    assert_eq!(
        classify(Some(&observe(false, Some("T2"), Some(10))), TRACK),
        Classification::Finished
    );
    // playing without a known item is still this track
    assert_eq!(
        classify(Some(&observe(true, None, Some(10))), TRACK),
        Classification::Playing
    );
}

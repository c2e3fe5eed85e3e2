//! Drives one track on one remote device and reports its state.
//!
//! A [`PlaybackMonitor`] issues resume/pause commands and, once the track has
//! been started, polls the upstream playback snapshot on a fixed delay. Each
//! snapshot is [`classify`]-ed against the session's track and turned into a
//! [`PlaybackState`] for the listener.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, warn};

use crate::{
    error::PlaybackError,
    spotify::player::Player,
    types::{PlaybackObservation, PlaybackState},
    utils,
};

/// Receives the states emitted by a monitor.
pub type StateListener = Arc<dyn Fn(PlaybackState) + Send + Sync>;

/// Bookkeeping of one track's playback. `done` never goes back to false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    pub device_id: String,
    pub track_id: String,
    pub started: bool,
    pub done: bool,
}

/// What a playback snapshot means for the session's track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Playing,
    Paused,
    Finished,
}

/// Classifies one snapshot.
///
/// Another track, or a stopped player without progress, means this track is
/// over. That check comes before the pause check so the start of the next track
/// is never reported as a pause.
pub fn classify(observation: Option<&PlaybackObservation>, track_id: &str) -> Classification {
    let Some(observation) = observation else {
        return Classification::Finished;
    };
    let other_track = observation
        .track_id
        .as_deref()
        .is_some_and(|current| current != track_id);

    if observation.is_playing {
        if other_track {
            Classification::Finished
        } else {
            Classification::Playing
        }
    } else if other_track
        || observation.track_id.is_none()
        || observation.progress_ms.unwrap_or(0) == 0
    {
        Classification::Finished
    } else {
        Classification::Paused
    }
}

struct Shared {
    session: Mutex<PlaybackSession>,
    listener: StateListener,
    done: watch::Sender<bool>,
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, PlaybackSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emits `state` unless the session is already done. The listener runs
    /// without the session lock held.
    fn emit(&self, state: PlaybackState) {
        if self.session().done {
            debug!(?state, "session done, dropping state");
            return;
        }
        (self.listener)(state);
    }

    /// Marks the session done. Returns false if it already was.
    fn mark_done(&self, announce: bool) -> bool {
        {
            let mut session = self.session();
            if session.done {
                return false;
            }
            session.done = true;
        }
        if announce {
            (self.listener)(PlaybackState::Done);
        }
        self.done.send_replace(true);
        true
    }
}

/// Read-only view of a monitor's session that can be cloned into listeners.
#[derive(Clone)]
pub struct PlaybackHandle {
    shared: Arc<Shared>,
}

impl PlaybackHandle {
    pub fn session(&self) -> PlaybackSession {
        self.shared.session().clone()
    }

    pub fn is_done(&self) -> bool {
        self.shared.session().done
    }
}

/// Plays one track on one device. Exactly one monitor exists per playing track
/// and it owns its polling loop.
pub struct PlaybackMonitor {
    player: Arc<dyn Player>,
    shared: Arc<Shared>,
    interval: Duration,
    stop: Arc<Notify>,
    poll_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl PlaybackMonitor {
    pub fn new(
        player: Arc<dyn Player>,
        device_id: impl Into<String>,
        track_id: impl Into<String>,
        interval: Duration,
        listener: StateListener,
    ) -> Self {
        let session = PlaybackSession {
            device_id: device_id.into(),
            track_id: track_id.into(),
            started: false,
            done: false,
        };
        let (done, _) = watch::channel(false);

        Self {
            player,
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                listener,
                done,
            }),
            interval,
            stop: Arc::new(Notify::new()),
            poll_task: None,
            closed: false,
        }
    }

    /// Snapshot of the session bookkeeping.
    pub fn session(&self) -> PlaybackSession {
        self.shared.session().clone()
    }

    pub fn is_done(&self) -> bool {
        self.shared.session().done
    }

    pub fn handle(&self) -> PlaybackHandle {
        PlaybackHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Starts or resumes playback.
    ///
    /// The first successful call supplies the track URI and starts polling.
    /// Later calls only resume. Failures are reported as [`PlaybackState::Broken`].
    pub async fn play(&mut self) {
        let session = self.session();
        if session.done {
            debug!(track_id = %session.track_id, "session finished, ignoring play");
            return;
        }

        let uri = (!session.started).then(|| utils::track_uri(&session.track_id));
        if uri.is_some() {
            debug!(track_id = %session.track_id, "starting track");
        }

        match self.player.resume(&session.device_id, uri.as_deref()).await {
            Ok(()) => {
                if !session.started {
                    self.shared.session().started = true;
                    self.start_polling();
                }
            }
            Err(source) => {
                let e = PlaybackError::Command {
                    action: "resume",
                    source,
                };
                error!(error = %e, device_id = %session.device_id, "could not play");
                self.shared.emit(PlaybackState::Broken);
            }
        }
    }

    pub async fn pause(&mut self) {
        let session = self.session();
        if session.done {
            debug!(track_id = %session.track_id, "session finished, ignoring pause");
            return;
        }

        if let Err(source) = self.player.pause(&session.device_id).await {
            let e = PlaybackError::Command {
                action: "pause",
                source,
            };
            error!(error = %e, device_id = %session.device_id, "could not pause");
            self.shared.emit(PlaybackState::Broken);
        }
    }

    /// Resolves once the session is done, by finishing or by [`Self::close`].
    pub async fn wait_for_finish(&self) {
        let mut done = self.shared.done.subscribe();
        let _ = done.wait_for(|done| *done).await;
    }

    /// Ends the session: suppresses further states, stops the polling loop and
    /// waits for it to exit, then pauses the device once. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shared.mark_done(false);

        self.stop.notify_one();
        if let Some(task) = self.poll_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "polling task ended abnormally");
            }
        }

        let session = self.session();
        if session.started {
            if let Err(e) = self.player.pause(&session.device_id).await {
                warn!(error = %e, device_id = %session.device_id, "could not pause on close");
            }
        }
    }

    fn start_polling(&mut self) {
        let player = Arc::clone(&self.player);
        let shared = Arc::clone(&self.shared);
        let stop = Arc::clone(&self.stop);
        let interval = self.interval;

        self.poll_task = Some(tokio::spawn(async move {
            poll_loop(player, shared, stop, interval).await;
        }));
    }
}

impl Drop for PlaybackMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

/// Sequential poll cycles with a fixed delay. A cycle always finishes its
/// poll-and-classify step; the stop signal is only honored between cycles.
async fn poll_loop(
    player: Arc<dyn Player>,
    shared: Arc<Shared>,
    stop: Arc<Notify>,
    interval: Duration,
) {
    let track_id = shared.session().track_id.clone();

    loop {
        tokio::select! {
            _ = sleep(interval) => {}
            _ = stop.notified() => break,
        }
        if shared.session().done {
            break;
        }

        match player.current_playback().await {
            Ok(observation) => match classify(observation.as_ref(), &track_id) {
                Classification::Playing => shared.emit(PlaybackState::Play),
                Classification::Paused => shared.emit(PlaybackState::Pause),
                Classification::Finished => {
                    if shared.mark_done(true) {
                        debug!(%track_id, "track finished");
                    }
                    break;
                }
            },
            Err(source) => {
                let e = PlaybackError::Poll(source);
                if e.is_transient() {
                    warn!(error = %e, "transient playback poll failure");
                } else {
                    error!(error = %e, "playback poll failed");
                    shared.emit(PlaybackState::Broken);
                }
            }
        }
    }
    debug!(%track_id, "polling stopped");
}

/// Creates monitors for a fixed device and poll interval.
pub struct PlaybackFactory {
    player: Arc<dyn Player>,
    device_id: String,
    interval: Duration,
}

impl PlaybackFactory {
    pub fn new(player: Arc<dyn Player>, device_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            player,
            device_id: device_id.into(),
            interval,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn playback(&self, track_id: impl Into<String>, listener: StateListener) -> PlaybackMonitor {
        PlaybackMonitor::new(
            Arc::clone(&self.player),
            self.device_id.clone(),
            track_id,
            self.interval,
            listener,
        )
    }
}

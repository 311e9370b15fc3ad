//! Transport mirroring state machine.
//!
//! `Idle` (no decoded audio) -> `Armed` (ready, not playing) -> `Playing`.
//! A playback instance only exists inside `Playing`, and the single code path
//! that creates one stops the previous instance first.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorState {
    #[default]
    Idle,
    Armed,
    Playing,
}

/// One mirrored playback run over the decoded buffer
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackInstance {
    id: u64,
    position_secs: f64,
    duration_secs: f64,
}

impl PlaybackInstance {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn position_secs(&self) -> f64 {
        self.position_secs
    }

    /// Move the cursor forward; false once the end of the buffer is reached
    fn advance(&mut self, dt_secs: f64) -> bool {
        self.position_secs = (self.position_secs + dt_secs).min(self.duration_secs);
        self.position_secs < self.duration_secs
    }

    fn stop(self) -> u64 {
        log::trace!(
            "Stopping playback instance {} at {:.3}s",
            self.id,
            self.position_secs
        );
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    /// Decoded audio of the given length became available
    Ready { duration_secs: f64 },
    /// External element started playing at `position_secs`
    Play { position_secs: f64 },
    Pause,
    Ended,
    /// External element jumped to `position_secs`
    Seek { position_secs: f64 },
    /// Source torn down
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    None,
    Armed,
    Started { instance: u64, position_secs: f64 },
    Restarted { stopped: u64, instance: u64, position_secs: f64 },
    Stopped { instance: u64 },
    Disarmed,
}

#[derive(Debug, Default)]
enum TransportState {
    #[default]
    Idle,
    Armed,
    Playing(PlaybackInstance),
}

#[derive(Debug, Default)]
pub struct TransportMirror {
    state: TransportState,
    duration_secs: f64,
    next_instance: u64,
}

impl TransportMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MirrorState {
        match self.state {
            TransportState::Idle => MirrorState::Idle,
            TransportState::Armed => MirrorState::Armed,
            TransportState::Playing(_) => MirrorState::Playing,
        }
    }

    pub fn instance(&self) -> Option<&PlaybackInstance> {
        match &self.state {
            TransportState::Playing(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn position_secs(&self) -> Option<f64> {
        self.instance().map(PlaybackInstance::position_secs)
    }

    /// Total playback instances created so far
    pub fn instances_started(&self) -> u64 {
        self.next_instance
    }

    pub fn transition(&mut self, event: TransportEvent) -> TransitionResult {
        use TransportEvent::*;

        let result = match event {
            Ready { duration_secs } => {
                self.duration_secs = duration_secs.max(0.0);
                let stopped = self.stop_current();
                self.state = TransportState::Armed;
                match stopped {
                    Some(instance) => TransitionResult::Stopped { instance },
                    None => TransitionResult::Armed,
                }
            }

            Play { position_secs } => match self.phase() {
                MirrorState::Idle => TransitionResult::None,
                MirrorState::Armed => {
                    let instance = self.start(position_secs);
                    TransitionResult::Started {
                        instance,
                        position_secs,
                    }
                }
                MirrorState::Playing => self.restart(position_secs),
            },

            Pause | Ended => match self.stop_current() {
                Some(instance) => TransitionResult::Stopped { instance },
                None => TransitionResult::None,
            },

            Seek { position_secs } => match self.phase() {
                MirrorState::Playing => self.restart(position_secs),
                MirrorState::Idle | MirrorState::Armed => TransitionResult::None,
            },

            Reset => {
                let was_idle = self.phase() == MirrorState::Idle;
                self.stop_current();
                self.state = TransportState::Idle;
                self.duration_secs = 0.0;
                if was_idle {
                    TransitionResult::None
                } else {
                    TransitionResult::Disarmed
                }
            }
        };

        log::trace!("Transport {:?} -> {:?}", event, result);
        result
    }

    /// Advance the mirrored cursor; a run that reaches the end stops by itself
    pub fn advance(&mut self, dt_secs: f64) -> Option<f64> {
        let finished = match &mut self.state {
            TransportState::Playing(instance) => !instance.advance(dt_secs),
            _ => return None,
        };
        let position = self.position_secs();
        if finished {
            self.stop_current();
        }
        position
    }

    fn restart(&mut self, position_secs: f64) -> TransitionResult {
        let stopped = self.stop_current().unwrap_or_default();
        let instance = self.start(position_secs);
        TransitionResult::Restarted {
            stopped,
            instance,
            position_secs,
        }
    }

    /// Replace whatever is playing with a fresh instance at `position_secs`
    fn start(&mut self, position_secs: f64) -> u64 {
        self.stop_current();
        self.next_instance += 1;
        let instance = PlaybackInstance {
            id: self.next_instance,
            position_secs: position_secs.clamp(0.0, self.duration_secs),
            duration_secs: self.duration_secs,
        };
        self.state = TransportState::Playing(instance);
        self.next_instance
    }

    /// Stop the running instance, if any, leaving the mirror armed
    fn stop_current(&mut self) -> Option<u64> {
        if !matches!(self.state, TransportState::Playing(_)) {
            return None;
        }
        match std::mem::replace(&mut self.state, TransportState::Armed) {
            TransportState::Playing(instance) => Some(instance.stop()),
            _ => None,
        }
    }
}

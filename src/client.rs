use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::{MissedTickBehavior, sleep};
use tracing::{debug, trace, warn};

use crate::diff::diff_status;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{self, Expectation, GsoStatus, StatusFrame};
use crate::transport::{Pacing, Transport};
use crate::types::{DeviceState, FanLevel, MAX_TARGET_C, MIN_TARGET_C, Mode, RestoredState};
use crate::{Error, Result};

/// TCP port the unit listens on.
pub const DEFAULT_PORT: u16 = 27847;

const DEFAULT_NAME: &str = "Rinnai Evap Cooler";
const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1800);
const DEFAULT_MAX_RETRIES: u32 = 4;

/// Marker the sensor collaborator pushes when it has no reading.
const UNKNOWN_READING: &str = "unknown";

type StateCallback = Box<dyn Fn(&DeviceState) + Send + Sync>;

/// A command sent but not yet confirmed: the frame to (re)send and the
/// sub-state a status reply must echo before the command counts as
/// delivered. Lives only for the duration of the confirmation window.
struct PendingCommand {
    frame: Vec<u8>,
    expected: Expectation,
    attempts: u32,
}

pub struct TouchClientBuilder {
    host: String,
    port: u16,
    name: String,
    io_timeout: Duration,
    pacing: Pacing,
    poll_interval: Duration,
    max_retries: u32,
    state_callbacks: Vec<StateCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl TouchClientBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            name: DEFAULT_NAME.to_string(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            pacing: Pacing::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            state_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Display name passed through to the presentation layer.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Override the settle/backoff delays. The defaults match what the
    /// hardware needs; tests shrink them.
    pub fn pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Confirmation attempts per command before giving up with
    /// [`Error::ConfirmationFailed`].
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Register a callback fired with a snapshot after every mirror change.
    pub fn on_state(mut self, f: impl Fn(&DeviceState) + Send + Sync + 'static) -> Self {
        self.state_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> TouchClient {
        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => {
                Some(MessageLogger::new(mode, &path).expect("failed to open log file"))
            }
            _ => None,
        };

        let retry_backoff = self.pacing.retry_backoff;
        TouchClient {
            transport: Transport::new(self.host, self.port, self.io_timeout, self.pacing),
            name: self.name,
            state: DeviceState::default(),
            previous_body: Value::Object(Map::new()),
            retry_backoff,
            max_retries: self.max_retries,
            poll_interval: self.poll_interval,
            state_callbacks: self.state_callbacks,
            logger,
        }
    }
}

/// Client for one Rinnai Touch unit.
///
/// Holds the local mirror of unit state and keeps it consistent with the
/// hardware: commands are sent, then confirmed by re-polling and comparing
/// the observed status against the expected sub-state, resending on
/// mismatch. The mirror never shows a commanded-but-unconfirmed state.
///
/// All exchanges with a unit go through `&mut self`, so one client runs at
/// most one protocol exchange at a time and a command's confirmation polls
/// always complete before any other poll or command starts. Callers sharing
/// a client across tasks should wrap it in a `tokio::sync::Mutex`: the
/// protocol has no request/response correlation, so interleaved exchanges
/// against one unit would be ambiguous.
pub struct TouchClient {
    transport: Transport,
    name: String,
    state: DeviceState,
    previous_body: Value,
    retry_backoff: Duration,
    max_retries: u32,
    poll_interval: Duration,
    state_callbacks: Vec<StateCallback>,
    logger: Option<MessageLogger>,
}

impl TouchClient {
    pub fn builder(host: impl Into<String>) -> TouchClientBuilder {
        TouchClientBuilder::new(host)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only view of the mirror.
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Seed the mirror from state persisted before the last restart.
    /// Not calling this (first run) leaves the defaults in place.
    pub fn restore(&mut self, previous: RestoredState) {
        debug!(mode = %previous.mode, fan = %previous.fan_level, "restoring persisted state");
        self.state.mode = previous.mode;
        self.state.fan_level = previous.fan_level;
        self.state.last_on_mode = previous
            .last_on_mode
            .or_else(|| previous.mode.is_on().then_some(previous.mode));
        self.notify_state();
    }

    /// Store a reading pushed by the external temperature sensor. The unit
    /// itself never reports a temperature. "unknown" and non-numeric
    /// readings are ignored and leave the stored value unchanged.
    pub fn sensor_reading(&mut self, reading: &str) {
        if reading == UNKNOWN_READING {
            return;
        }
        match reading.trim().parse::<f64>() {
            Ok(value) => {
                self.state.current_temperature = Some(value);
                self.notify_state();
            }
            Err(_) => warn!(reading, "unusable temperature sensor reading"),
        }
    }

    /// Set the target temperature, local only (this profile has no setpoint
    /// on the wire). Requests outside the valid range are rejected with a
    /// warning; accepted values are rounded to the whole-degree step.
    pub fn set_target_temperature(&mut self, temp: f64) {
        if !(MIN_TARGET_C..=MAX_TARGET_C).contains(&temp) {
            warn!(temp, "target temperature outside {MIN_TARGET_C}..{MAX_TARGET_C}");
            return;
        }
        self.state.target_temperature = temp.round();
        self.notify_state();
    }

    /// Command the unit into a new mode and drive it to confirmation.
    pub async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        debug!(mode = %mode, "setting mode");
        let delta = protocol::mode_command(mode);
        if let Some(logger) = &mut self.logger {
            logger.log_command("set_mode", &delta);
        }
        self.reconcile(PendingCommand {
            frame: protocol::command_frame(&delta),
            expected: Expectation::for_mode(mode),
            attempts: 0,
        })
        .await
    }

    /// Command a new fan level. Only meaningful while the unit runs in Cool
    /// or FanOnly; otherwise the request is dropped without device traffic.
    pub async fn set_fan_level(&mut self, level: FanLevel) -> Result<()> {
        if !matches!(self.state.mode, Mode::Cool | Mode::FanOnly) {
            debug!(level = %level, mode = %self.state.mode, "fan level ignored outside cool/fan-only");
            return Ok(());
        }
        debug!(level = %level, "setting fan level");
        let delta = protocol::fan_command(level);
        if let Some(logger) = &mut self.logger {
            logger.log_command("set_fan_level", &delta);
        }
        self.reconcile(PendingCommand {
            frame: protocol::command_frame(&delta),
            expected: Expectation::for_fan(level),
            attempts: 0,
        })
        .await
    }

    /// Unconditional refresh of the mirror from the unit. An absent
    /// evaporative-cooling module means the unit is off; a receive that
    /// decodes to nothing leaves the mirror untouched.
    pub async fn refresh(&mut self) -> Result<()> {
        match self.poll_status().await? {
            Some(frame) => {
                if let Some(gso) = frame.evap_status() {
                    self.adopt(&frame, &gso);
                } else if frame.has_evap_module() {
                    debug!("evap module reported without operation group");
                } else {
                    debug!("evap module absent, unit is off");
                    self.state.mode = Mode::Off;
                    self.notify_state();
                }
            }
            None => debug!("poll returned no data"),
        }
        Ok(())
    }

    /// Fixed-interval refresh driver. Never returns; failed polls are
    /// logged and skipped, leaving the retry to the next tick.
    pub async fn poll_loop(&mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "poll failed, waiting for next interval");
            }
        }
    }

    /// Drive a command to confirmation: send, poll, compare, and resend
    /// with backoff until the unit echoes the expected sub-state or the
    /// retry budget runs out. Transport failures consume an attempt too, so
    /// a dead unit cannot hold the window open forever. The mirror changes
    /// only when a matching status is observed.
    async fn reconcile(&mut self, mut pending: PendingCommand) -> Result<()> {
        loop {
            pending.attempts += 1;
            match self.send_frame(&pending.frame).await {
                Err(e) => warn!(error = %e, attempt = pending.attempts, "command send failed"),
                Ok(()) => match self.poll_status().await {
                    Ok(Some(frame)) => match frame.evap_status() {
                        Some(gso) if pending.expected.matches(&gso) => {
                            debug!(attempts = pending.attempts, "command confirmed");
                            self.adopt(&frame, &gso);
                            return Ok(());
                        }
                        Some(_) => {
                            debug!(
                                attempt = pending.attempts,
                                "unit has not adopted the requested sub-state yet"
                            );
                        }
                        None => debug!("confirmation poll reported no evap status"),
                    },
                    Ok(None) => debug!("confirmation poll returned no data"),
                    Err(e) => warn!(error = %e, "confirmation poll failed"),
                },
            }

            if pending.attempts >= self.max_retries {
                warn!(attempts = pending.attempts, "giving up on command confirmation");
                return Err(Error::ConfirmationFailed {
                    attempts: pending.attempts,
                });
            }
            sleep(self.retry_backoff).await;
        }
    }

    /// One command send on a fresh connection, closed right after.
    async fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut conn = self.transport.connect().await?;
        let result = conn.send(frame).await;
        conn.close().await;
        if result.is_ok()
            && let Some(logger) = &mut self.logger
        {
            logger.log_send(frame);
        }
        result
    }

    /// One poll on a fresh connection: single receive, decode, close.
    /// `Ok(None)` is a completed exchange that produced no usable frame.
    async fn poll_status(&mut self) -> Result<Option<StatusFrame>> {
        let mut conn = self.transport.connect().await?;
        let received = conn.receive().await;
        conn.close().await;
        let decoded = protocol::decode_frame(&received?);
        if let Some(logger) = &mut self.logger {
            logger.log_poll(decoded.as_ref().map(|f| &f.body));
        }
        Ok(decoded)
    }

    /// Fold an observed status into the mirror and notify readers.
    fn adopt(&mut self, frame: &StatusFrame, gso: &GsoStatus) {
        for (path, _old, new) in diff_status(&self.previous_body, &frame.body) {
            trace!(%path, value = %new, "status change");
        }
        self.previous_body = frame.body.clone();

        let mode = gso.mode();
        self.state.mode = mode;
        if mode.is_on() {
            self.state.last_on_mode = Some(mode);
            if let Some(level) = gso.fan_level() {
                self.state.fan_level = level;
            }
        }
        debug!(mode = %mode, fan = %self.state.fan_level, "mirror updated");
        self.notify_state();
    }

    fn notify_state(&self) {
        for cb in &self.state_callbacks {
            cb(&self.state);
        }
    }
}

use serde_json::{Value, json};
use tracing::debug;

use crate::types::{FanLevel, Mode};

/// Sentinel prefixing unsolicited/refresh frames.
pub(crate) const SEQ_REFRESH: &str = "N000000";
/// Sentinel prefixing command frames and command-triggered replies.
pub(crate) const SEQ_COMMAND: &str = "N000001";

const SENTINEL_LEN: usize = 7;

/// Evaporative-cooling module key in frame bodies.
pub(crate) const MODULE_EVAP: &str = "ECOM";
/// Operation group sub-key under the module.
pub(crate) const GROUP_OPERATION: &str = "GSO";

// Two-letter field codes under GSO:
//   SW switch ("N" on / "F" off), OP operation ("M" manual / "A" auto),
//   FS fan state, PS program select ("N" normal / "F" fan only),
//   FL fan level ("01".."16").

/// Sparse settings delta for a target mode. Unspecified fields are left
/// untouched device-side.
pub(crate) fn mode_command(mode: Mode) -> Value {
    match mode {
        Mode::Cool => json!({"SW": "N", "OP": "M", "FS": "N", "PS": "N"}),
        Mode::FanOnly => json!({"SW": "N", "OP": "M", "FS": "N", "PS": "F"}),
        Mode::Auto => json!({"SW": "N", "OP": "A"}),
        Mode::Off => json!({"SW": "F"}),
    }
}

/// Fan-level-only delta; mode fields stay untouched.
pub(crate) fn fan_command(level: FanLevel) -> Value {
    json!({"FL": level.wire_code()})
}

/// Encode a settings delta into an outgoing command frame: the command
/// sentinel followed by the module/group nesting, UTF-8, no terminator.
pub(crate) fn command_frame(delta: &Value) -> Vec<u8> {
    let body = json!({ "ECOM": { "GSO": delta } });
    let mut frame = SEQ_COMMAND.as_bytes().to_vec();
    frame.extend(serde_json::to_vec(&body).unwrap_or_default());
    frame
}

/// A validated incoming frame: everything past the sentinel, parsed.
///
/// The unit reports either a bare module map or an array of module maps;
/// both shapes are accepted.
#[derive(Debug, Clone)]
pub(crate) struct StatusFrame {
    pub body: Value,
}

impl StatusFrame {
    fn module(&self, name: &str) -> Option<&Value> {
        match &self.body {
            Value::Object(map) => map.get(name),
            Value::Array(groups) => groups.iter().find_map(|g| g.get(name)),
            _ => None,
        }
    }

    pub fn has_evap_module(&self) -> bool {
        self.module(MODULE_EVAP).is_some()
    }

    /// Operation status of the evaporative-cooling module, if reported.
    pub fn evap_status(&self) -> Option<GsoStatus> {
        self.module(MODULE_EVAP)
            .and_then(|m| m.get(GROUP_OPERATION))
            .map(GsoStatus::from_value)
    }
}

/// Decode and validate a received frame. Anything without a recognized
/// sentinel followed by a well-formed JSON body is no data, not an error.
pub(crate) fn decode_frame(bytes: &[u8]) -> Option<StatusFrame> {
    let start = sentinel_end(bytes)?;
    let payload = &bytes[start..];
    if payload.is_empty() {
        debug!("frame has sentinel but empty body");
        return None;
    }
    match serde_json::from_slice::<Value>(payload) {
        Ok(body) if body.is_object() || body.is_array() => Some(StatusFrame { body }),
        Ok(_) => {
            debug!("frame body is not an object");
            None
        }
        Err(e) => {
            debug!(error = %e, "frame body is not valid JSON");
            None
        }
    }
}

/// Byte offset just past the earliest sentinel. Offset 0 is an ordinary
/// match; only genuine absence of both sentinels yields None.
fn sentinel_end(bytes: &[u8]) -> Option<usize> {
    let find = |needle: &str| {
        bytes
            .windows(needle.len())
            .position(|w| w == needle.as_bytes())
    };
    let end = match (find(SEQ_REFRESH), find(SEQ_COMMAND)) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => return None,
    };
    Some(end + SENTINEL_LEN)
}

/// Observed GSO fields from a status frame. All fields are optional: the
/// unit reports only what applies to its current state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct GsoStatus {
    pub switch: Option<String>,
    pub operation: Option<String>,
    pub program: Option<String>,
    pub fan_code: Option<String>,
}

impl GsoStatus {
    fn from_value(gso: &Value) -> Self {
        let text = |key: &str| gso.get(key).and_then(|v| v.as_str()).map(str::to_string);
        // FL arrives as a string on current firmware but older units report
        // a bare number; normalize to the two-digit code.
        let fan_code = match gso.get("FL") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => n.as_u64().map(|v| format!("{v:02}")),
            _ => None,
        };
        Self {
            switch: text("SW"),
            operation: text("OP"),
            program: text("PS"),
            fan_code,
        }
    }

    /// Map the observed fields onto an operating mode.
    pub fn mode(&self) -> Mode {
        match self.switch.as_deref() {
            Some("N") => match self.operation.as_deref() {
                Some("M") => {
                    if self.program.as_deref() == Some("N") {
                        Mode::Cool
                    } else {
                        Mode::FanOnly
                    }
                }
                _ => Mode::Auto,
            },
            _ => Mode::Off,
        }
    }

    pub fn fan_level(&self) -> Option<FanLevel> {
        self.fan_code.as_deref().and_then(FanLevel::from_wire_code)
    }
}

/// The sub-state a pending command must see echoed back before it counts as
/// delivered. FS is sent with mode commands but the unit does not echo it
/// reliably, so it is never compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expectation {
    switch: Option<&'static str>,
    operation: Option<&'static str>,
    program: Option<&'static str>,
    fan_code: Option<String>,
}

impl Expectation {
    pub fn for_mode(mode: Mode) -> Self {
        let (switch, operation, program) = match mode {
            Mode::Cool => (Some("N"), Some("M"), Some("N")),
            Mode::FanOnly => (Some("N"), Some("M"), Some("F")),
            Mode::Auto => (Some("N"), Some("A"), None),
            Mode::Off => (Some("F"), None, None),
        };
        Self {
            switch,
            operation,
            program,
            fan_code: None,
        }
    }

    pub fn for_fan(level: FanLevel) -> Self {
        Self {
            switch: None,
            operation: None,
            program: None,
            fan_code: Some(level.wire_code()),
        }
    }

    pub fn matches(&self, status: &GsoStatus) -> bool {
        fn field(expected: Option<&str>, observed: Option<&str>) -> bool {
            expected.is_none_or(|e| observed == Some(e))
        }
        field(self.switch, status.switch.as_deref())
            && field(self.operation, status.operation.as_deref())
            && field(self.program, status.program.as_deref())
            && field(self.fan_code.as_deref(), status.fan_code.as_deref())
    }
}

//! Protocol constants: command, component and setting codes.
//!
//! Codes are fixed by the gateway's wire protocol and are stable across
//! firmware revisions.

/// Start marker byte for every telegram.
pub const START: u8 = 2;

/// "Central" address byte carried in GET/SET payloads.
pub const CENTRAL: u8 = 1;

/// Command codes carried in the second wire slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Log = 3,
    WriteDisplay = 4,
    Get = 6,
    Set = 7,
    GroupSet = 9,
    Keepalive = 11,
    EventReport = 0x10,
}

impl Command {
    /// The numeric wire code.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Device categories addressable on the bus (a.k.a. function codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Component {
    Relay = 1,
    Dimmer = 2,
    Process = 3,
    Motor = 6,
    LocMood = 8,
    GenMood = 10,
    Regime = 14,
    Flag = 15,
    Sensor = 20,
    Audio = 31,
    Service = 53,
    Message = 54,
    Condition = 60,
}

impl Component {
    /// All known components, in code order.
    pub const ALL: [Component; 13] = [
        Component::Relay,
        Component::Dimmer,
        Component::Process,
        Component::Motor,
        Component::LocMood,
        Component::GenMood,
        Component::Regime,
        Component::Flag,
        Component::Sensor,
        Component::Audio,
        Component::Service,
        Component::Message,
        Component::Condition,
    ];

    /// The numeric wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Resolve a wire code. Returns `None` for codes this stack does not know.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Upper-case human-readable name, as used in logs and registry keys.
    pub fn name(self) -> &'static str {
        match self {
            Component::Relay => "RELAY",
            Component::Dimmer => "DIMMER",
            Component::Process => "PROCESS",
            Component::Motor => "MOTOR",
            Component::LocMood => "LOCMOOD",
            Component::GenMood => "GENMOOD",
            Component::Regime => "REGIME",
            Component::Flag => "FLAG",
            Component::Sensor => "SENSOR",
            Component::Audio => "AUDIO",
            Component::Service => "SERVICE",
            Component::Message => "MESSAGE",
            Component::Condition => "CONDITION",
        }
    }

    /// Resolve a component by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Self::ALL.into_iter().find(|c| c.name() == upper)
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Well-known setting values for SET telegrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Setting {
    Off = 0,
    Toggle = 103,
    On = 255,
}

impl Setting {
    /// The numeric wire value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Resolve a setting by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "off" => Some(Setting::Off),
            "toggle" => Some(Setting::Toggle),
            "on" => Some(Setting::On),
            _ => None,
        }
    }
}

impl From<Setting> for u8 {
    fn from(setting: Setting) -> u8 {
        setting.code()
    }
}

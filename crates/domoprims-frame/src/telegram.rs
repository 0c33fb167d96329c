use std::fmt::Write as _;

use crate::codes::{Command, Component, CENTRAL, START};
use crate::error::{FrameError, Result};

/// An outgoing command unit destined for the bus.
///
/// Immutable once constructed; the wire string is derived on [`encode`].
/// Length and checksum are computed from the payload table, never stored.
///
/// [`encode`]: Telegram::encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    command: Command,
    component: Option<Component>,
    address: Option<u8>,
    setting: Option<u8>,
}

impl Telegram {
    /// Build a telegram from raw parts. Prefer the [`get`], [`set`] and
    /// [`log`] constructors; missing slots surface at [`encode`] time.
    ///
    /// [`get`]: Telegram::get
    /// [`set`]: Telegram::set
    /// [`log`]: Telegram::log
    /// [`encode`]: Telegram::encode
    pub fn new(
        command: Command,
        component: Option<Component>,
        address: Option<u8>,
        setting: Option<u8>,
    ) -> Self {
        Self {
            command,
            component,
            address,
            setting,
        }
    }

    /// Query the current state of one group address.
    pub fn get(component: Component, address: u8) -> Self {
        Self::new(Command::Get, Some(component), Some(address), None)
    }

    /// Drive one group address to a setting value.
    pub fn set(component: Component, address: u8, setting: impl Into<u8>) -> Self {
        Self::new(
            Command::Set,
            Some(component),
            Some(address),
            Some(setting.into()),
        )
    }

    /// Register for asynchronous state feedback for a whole component
    /// category.
    pub fn log(component: Component) -> Self {
        Self::new(Command::Log, Some(component), None, None)
    }

    /// The command kind.
    pub fn command(&self) -> Command {
        self.command
    }

    /// The component this telegram concerns, if any.
    pub fn component(&self) -> Option<Component> {
        self.component
    }

    /// The group address this telegram concerns, if any.
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    /// The setting byte carried by SET telegrams.
    pub fn setting(&self) -> Option<u8> {
        self.setting
    }

    /// Serialize to the wire string.
    ///
    /// Format: `s,<length>,<command>,<payload...>,<checksum>,` where
    /// length = payload slots + 3 and checksum = (payload sum + start
    /// marker + length + command) mod 256.
    pub fn encode(&self) -> Result<String> {
        let payload = self.payload()?;
        let length = payload.len() as u8 + 3;
        let checksum = checksum(&payload, length, self.command.code());

        let mut wire = String::with_capacity(8 + payload.len() * 4);
        // Infallible: write! to String cannot fail.
        let _ = write!(wire, "s,{},{},", length, self.command.code());
        for value in &payload {
            let _ = write!(wire, "{value},");
        }
        let _ = write!(wire, "{checksum},");
        Ok(wire)
    }

    /// The payload slot table for this telegram.
    ///
    /// GET and SET open with the central marker; a setting value extends
    /// the table from slot 2 onward regardless of which branch filled the
    /// earlier slots.
    fn payload(&self) -> Result<Vec<u8>> {
        let component = |field| {
            self.component.ok_or(FrameError::MissingField {
                command: self.command,
                field,
            })
        };
        let address = |field| {
            self.address.ok_or(FrameError::MissingField {
                command: self.command,
                field,
            })
        };

        let mut payload = match self.command {
            Command::Log => vec![component("component")?.code(), 1],
            Command::Get => vec![
                CENTRAL,
                component("component")?.code(),
                0,
                address("address")?,
            ],
            Command::Set => vec![CENTRAL, component("component")?.code()],
            other => return Err(FrameError::UnsupportedCommand(other)),
        };

        if let Some(setting) = self.setting {
            payload.truncate(2);
            payload.extend([0, address("address")?, setting]);
        }

        Ok(payload)
    }
}

/// A periodic keepalive marker telegram. Carries no payload table; its
/// wire form is a fixed literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat;

impl Heartbeat {
    /// The fixed keepalive wire string: `s,3,<keepalive-code>,<checksum>,`.
    pub fn encode(&self) -> &'static str {
        "s,3,11,16,"
    }
}

/// Telegram checksum: payload byte sum plus start marker, length and
/// command code, modulo 256.
pub fn checksum(payload: &[u8], length: u8, command: u8) -> u8 {
    let sum: u32 = payload.iter().map(|&b| u32::from(b)).sum::<u32>()
        + u32::from(START)
        + u32::from(length)
        + u32::from(command);
    (sum % 256) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::Setting;

    #[test]
    fn encode_set_relay_on() {
        let telegram = Telegram::set(Component::Relay, 32, Setting::On);
        assert_eq!(telegram.encode().unwrap(), "s,8,7,1,1,0,32,255,50,");
    }

    #[test]
    fn encode_get_relay() {
        // Payload [1, 1, 0, 32], length 7, checksum (34 + 2 + 7 + 6) % 256.
        let telegram = Telegram::get(Component::Relay, 32);
        assert_eq!(telegram.encode().unwrap(), "s,7,6,1,1,0,32,49,");
    }

    #[test]
    fn encode_log_dimmer() {
        // Payload [2, 1], length 5, checksum (3 + 2 + 5 + 3) % 256.
        let telegram = Telegram::log(Component::Dimmer);
        assert_eq!(telegram.encode().unwrap(), "s,5,3,2,1,13,");
    }

    #[test]
    fn setting_extends_get_payload() {
        // A setting on a GET overwrites slot 2 onward with the same zero
        // and address, then appends the setting value.
        let telegram = Telegram::new(
            Command::Get,
            Some(Component::Relay),
            Some(32),
            Some(Setting::Off.code()),
        );
        assert_eq!(telegram.encode().unwrap(), "s,8,6,1,1,0,32,0,50,");
    }

    #[test]
    fn checksum_stays_in_byte_range() {
        for address in [0u8, 1, 32, 128, 255] {
            for setting in [0u8, 103, 255] {
                let telegram = Telegram::set(Component::Relay, address, setting);
                let wire = telegram.encode().unwrap();
                let fields: Vec<u32> = wire
                    .trim_start_matches("s,")
                    .trim_end_matches(',')
                    .split(',')
                    .map(|f| f.parse().unwrap())
                    .collect();
                let checksum = *fields.last().unwrap();
                assert!(checksum < 256);
                let expected: u32 =
                    (fields[2..fields.len() - 1].iter().sum::<u32>() + 2 + fields[0] + fields[1])
                        % 256;
                assert_eq!(checksum, expected, "wire {wire}");
            }
        }
    }

    #[test]
    fn unsupported_commands_fail() {
        for command in [Command::GroupSet, Command::EventReport, Command::Keepalive] {
            let telegram = Telegram::new(command, Some(Component::Relay), Some(1), None);
            assert!(matches!(
                telegram.encode(),
                Err(FrameError::UnsupportedCommand(c)) if c == command
            ));
        }
    }

    #[test]
    fn missing_slots_fail() {
        let telegram = Telegram::new(Command::Get, Some(Component::Relay), None, None);
        assert!(matches!(
            telegram.encode(),
            Err(FrameError::MissingField { field: "address", .. })
        ));

        let telegram = Telegram::new(Command::Set, None, None, None);
        assert!(matches!(
            telegram.encode(),
            Err(FrameError::MissingField {
                field: "component",
                ..
            })
        ));
    }

    #[test]
    fn set_without_setting_is_two_slots() {
        // Payload [1, 1], length 5, checksum (2 + 2 + 5 + 7) % 256.
        let telegram = Telegram::new(Command::Set, Some(Component::Relay), None, None);
        assert_eq!(telegram.encode().unwrap(), "s,5,7,1,1,16,");
    }

    #[test]
    fn heartbeat_literal() {
        assert_eq!(Heartbeat.encode(), "s,3,11,16,");
        // The literal's checksum is the same arithmetic over an empty
        // payload table.
        assert_eq!(checksum(&[], 3, Command::Keepalive.code()), 16);
    }
}

use domoprims_bus::Bus;
use domoprims_frame::{Component, Setting, Telegram};

use crate::cmd::{parse_endpoint, SetArgs};
use crate::exit::{bus_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub async fn run(args: SetArgs, _format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_endpoint(&args.endpoint)?;
    let component = resolve_component(&args.component)?;
    let setting = resolve_setting(&args.setting)?;

    let bus = Bus::new();
    bus.start(&host, port)
        .await
        .map_err(|err| bus_error("connect failed", err))?;
    bus.send(Telegram::set(component, args.address, setting))
        .map_err(|err| bus_error("send failed", err))?;
    // stop() drains the queue, so the telegram is on the wire before exit.
    bus.stop()
        .await
        .map_err(|err| bus_error("shutdown failed", err))?;

    Ok(SUCCESS)
}

pub fn resolve_component(input: &str) -> CliResult<Component> {
    Component::from_name(input)
        .ok_or_else(|| CliError::new(USAGE, format!("unknown component: {input}")))
}

pub fn resolve_setting(input: &str) -> CliResult<u8> {
    if let Some(setting) = Setting::from_name(input) {
        return Ok(setting.code());
    }
    input
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("setting must be on/off/toggle or 0-255: {input}")))
}

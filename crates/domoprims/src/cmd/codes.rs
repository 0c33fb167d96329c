use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use domoprims_frame::{Command, Component, Setting};
use serde::Serialize;

use crate::cmd::CodesArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

const COMMANDS: [(Command, &str); 7] = [
    (Command::Log, "LOG"),
    (Command::WriteDisplay, "WRITEDISPLAY"),
    (Command::Get, "GET"),
    (Command::Set, "SET"),
    (Command::GroupSet, "GROUPSET"),
    (Command::Keepalive, "KEEPALIVE"),
    (Command::EventReport, "EVENTREPORT"),
];

const SETTINGS: [(Setting, &str); 3] = [
    (Setting::Off, "OFF"),
    (Setting::Toggle, "TOGGLE"),
    (Setting::On, "ON"),
];

#[derive(Serialize)]
struct CodeEntry {
    name: &'static str,
    code: u8,
}

#[derive(Serialize)]
struct CodesOutput {
    components: Vec<CodeEntry>,
    commands: Vec<CodeEntry>,
    settings: Vec<CodeEntry>,
}

pub fn run(_args: CodesArgs, format: OutputFormat) -> CliResult<i32> {
    match format {
        OutputFormat::Json => {
            let out = CodesOutput {
                components: Component::ALL
                    .into_iter()
                    .map(|c| CodeEntry {
                        name: c.name(),
                        code: c.code(),
                    })
                    .collect(),
                commands: COMMANDS
                    .into_iter()
                    .map(|(c, name)| CodeEntry {
                        name,
                        code: c.code(),
                    })
                    .collect(),
                settings: SETTINGS
                    .into_iter()
                    .map(|(s, name)| CodeEntry {
                        name,
                        code: s.code(),
                    })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        _ => {
            print_table(
                "COMPONENT",
                Component::ALL.into_iter().map(|c| (c.name(), c.code())),
            );
            print_table("COMMAND", COMMANDS.into_iter().map(|(c, n)| (n, c.code())));
            print_table("SETTING", SETTINGS.into_iter().map(|(s, n)| (n, s.code())));
        }
    }
    Ok(SUCCESS)
}

fn print_table(header: &str, rows: impl Iterator<Item = (&'static str, u8)>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![header, "CODE"]);
    for (name, code) in rows {
        table.add_row(vec![name.to_string(), code.to_string()]);
    }
    println!("{table}");
}

use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use domoprims_frame::EventFrame;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    component: &'a str,
    component_code: u8,
    address: u8,
    state: u8,
    peer: &'a str,
    timestamp: String,
}

pub fn print_event(frame: &EventFrame, peer: &str, format: OutputFormat) {
    let component = frame.component.map_or("UNKNOWN", |c| c.name());
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                component,
                component_code: frame.component_code,
                address: frame.address,
                state: frame.state,
                peer,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMPONENT", "ADDRESS", "STATE", "PEER"])
                .add_row(vec![
                    component.to_string(),
                    frame.address.to_string(),
                    frame.state.to_string(),
                    peer.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "component={} ({}) address={} state={} peer={}",
                component, frame.component_code, frame.address, frame.state, peer
            );
        }
        OutputFormat::Raw => {
            let fields: Vec<String> = frame.payload.iter().map(u8::to_string).collect();
            println!("{}", fields.join(","));
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

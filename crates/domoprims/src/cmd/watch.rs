use domoprims_frame::{Component, Telegram};
use domoprims_transport::GatewayClient;

use crate::cmd::{parse_endpoint, WatchArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_event, OutputFormat};

const WATCHED: [Component; 5] = [
    Component::Relay,
    Component::Dimmer,
    Component::LocMood,
    Component::GenMood,
    Component::Flag,
];

pub async fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_endpoint(&args.endpoint)?;

    let (client, mut frames) = GatewayClient::connect(&host, port)
        .await
        .map_err(|err| transport_error("connect failed", err))?;

    for component in WATCHED {
        let wire = Telegram::log(component)
            .encode()
            .map_err(|err| frame_error("encode failed", err))?;
        client
            .send(&wire)
            .await
            .map_err(|err| transport_error("feedback registration failed", err))?;
    }

    let mut printed = 0usize;
    let result = loop {
        tokio::select! {
            interrupt = tokio::signal::ctrl_c() => {
                if interrupt.is_err() {
                    break Err(CliError::new(FAILURE, "failed installing signal handler"));
                }
                break Ok(SUCCESS);
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    print_event(&frame, client.peer(), format);
                    printed += 1;
                    if args.count.is_some_and(|count| printed >= count) {
                        break Ok(SUCCESS);
                    }
                }
                None => break Err(CliError::new(FAILURE, "gateway connection closed")),
            },
        }
    };

    client.stop().await;
    result
}

use domoprims_frame::Telegram;
use domoprims_transport::GatewayClient;

use crate::cmd::{parse_duration, parse_endpoint, GetArgs};
use crate::cmd::set::resolve_component;
use crate::exit::{frame_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_event, OutputFormat};

pub async fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    let (host, port) = parse_endpoint(&args.endpoint)?;
    let component = resolve_component(&args.component)?;
    let wait = parse_duration(&args.timeout)?;

    let (client, mut frames) = GatewayClient::connect(&host, port)
        .await
        .map_err(|err| transport_error("connect failed", err))?;

    let wire = Telegram::get(component, args.address)
        .encode()
        .map_err(|err| frame_error("encode failed", err))?;
    client
        .send(&wire)
        .await
        .map_err(|err| transport_error("send failed", err))?;

    let matching = tokio::time::timeout(wait, async {
        while let Some(frame) = frames.recv().await {
            if frame.component == Some(component) && frame.address == args.address {
                return Some(frame);
            }
        }
        None
    })
    .await;

    let result = match matching {
        Ok(Some(frame)) => {
            print_event(&frame, client.peer(), format);
            Ok(SUCCESS)
        }
        Ok(None) => Err(CliError::new(FAILURE, "gateway connection closed")),
        Err(_) => Err(CliError::new(
            TIMEOUT,
            format!("no state event within {}", args.timeout),
        )),
    };

    client.stop().await;
    result
}

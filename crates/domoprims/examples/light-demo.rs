//! Switch a relay-backed light on and off, then drive a dimmer.
//!
//! Point it at a reachable gateway:
//!
//! ```sh
//! cargo run --example light-demo -- 192.168.1.101:55957
//! ```

use std::time::Duration;

use domoprims::bus::{Bus, Device, Dimmer, Light};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.1.101:55957".to_string());
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or("endpoint must be host:port")?;

    let bus = Bus::new();
    bus.start(host, port.parse()?).await?;
    bus.register_feedback().await?;

    // A light without a dimmer.
    let hall = Light::new(&bus, "hall", Some(32), None)?;
    hall.set_on().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    hall.set_off().await?;

    // A light with a separate relay and a brightness channel.
    let stairs = Light::new(&bus, "stairs", Some(33), Some(1))?;
    stairs.set_on().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    stairs.set_brightness(40).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    stairs.set_off().await?;

    // A dimmable light without a separate relay.
    let spots = Dimmer::new(&bus, "spots", Some(5))?;
    spots.set_on().await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    spots.set_brightness(70).await?;
    spots.sync()?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    spots.set_off().await?;

    bus.stop().await?;
    Ok(())
}

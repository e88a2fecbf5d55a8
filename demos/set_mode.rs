use std::env;

use rinnai_touch::{Mode, TouchClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args
        .get(1)
        .expect("usage: set-mode <host> <off|cool|fan_only|auto>");
    let mode = args
        .get(2)
        .and_then(|s| Mode::from_str(s))
        .expect("mode must be one of off|cool|fan_only|auto");

    let mut client = TouchClient::builder(host).build();
    client.set_mode(mode).await?;
    println!("unit confirmed {}", client.state().mode);
    Ok(())
}

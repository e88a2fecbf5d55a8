use std::env;
use std::time::Duration;

use rinnai_touch::TouchClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let host = args.get(1).expect("usage: monitor <host> [interval-secs]");
    let interval = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);

    let mut client = TouchClient::builder(host)
        .poll_interval(Duration::from_secs(interval))
        .on_state(|state| {
            let room = state
                .current_temperature
                .map(|t| format!(" | room: {t:.1}\u{00b0}C"))
                .unwrap_or_default();
            println!(
                "mode: {} | fan: {} | target: {:.1}\u{00b0}C{}",
                state.mode, state.fan_level, state.target_temperature, room,
            );
        })
        .build();

    println!("Polling {host} every {interval}s...");
    client.poll_loop().await;
}

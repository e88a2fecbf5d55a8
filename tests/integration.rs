use rinnai_touch::TouchClient;

/// Run with: RINNAI_TOUCH_ADDR=<unit-ip> cargo test --test integration -- --ignored
/// Requires a reachable Rinnai Touch WiFi module on the local network.
#[tokio::test]
#[ignore]
async fn refresh_against_real_unit() {
    let addr = std::env::var("RINNAI_TOUCH_ADDR").expect("set RINNAI_TOUCH_ADDR");
    let mut client = TouchClient::builder(addr).build();

    client.refresh().await.expect("refresh failed");
    println!("unit state: {:?}", client.state());
}

/// Cycles the unit off and back to its last mode. Only run against a unit
/// you are allowed to poke.
#[tokio::test]
#[ignore]
async fn off_command_roundtrip() {
    let addr = std::env::var("RINNAI_TOUCH_ADDR").expect("set RINNAI_TOUCH_ADDR");
    let mut client = TouchClient::builder(addr).build();

    client.refresh().await.expect("refresh failed");
    let before = client.state().clone();
    println!("before: {before:?}");

    client.set_mode(rinnai_touch::Mode::Off).await.expect("off failed");
    if let Some(mode) = before.last_on_mode {
        client.set_mode(mode).await.expect("restore failed");
    }
}

use spectrafall::{
    client::{Client, Command, ConnectParams, EventKind, WsTransport},
    ui,
};

const DEFAULT_URL: &str = "ws://localhost:8073/waterfall";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    // Create flume channels for bidirectional communication
    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (event_tx, event_rx) = flume::unbounded();

    // The UI consumes every event kind through one merged channel
    let mut client = Client::new(WsTransport::new());
    for kind in EventKind::ALL {
        client.subscribe(kind, event_tx.clone());
    }

    // Connect immediately with the device defaults
    cmd_tx.send(Command::Connect {
        url: url.clone(),
        params: ConnectParams::default(),
    })?;

    // Spawn the client thread
    let client_handle = std::thread::spawn(move || {
        client.run(cmd_rx).expect("Client failed");
    });

    // Run UI on main thread (blocking)
    ui::run(event_rx, cmd_tx.clone(), url)?;

    // UI has exited - send stop command to the client
    let _ = cmd_tx.send(Command::Stop);

    // Wait for the client thread to finish
    client_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Client thread panicked"))?;

    Ok(())
}

//! Simple device hub server example
//!
//! Run with: cargo run --example simple_hub [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example simple_hub                  # binds to 127.0.0.1:8080
//!   cargo run --example simple_hub 0.0.0.0:9000     # binds to 0.0.0.0:9000
//!
//! On startup the example prints a development JWT for user `demo-user`.
//! Connect with websocat:
//!
//!   websocat "ws://127.0.0.1:8080/?token=<printed token>"
//!
//! then subscribe to the simulated device:
//!
//!   {"event":"subscribe:device","data":"sim-1"}
//!
//! A background task pushes a `device:data` reading for `sim-1` every two
//! seconds, so a subscribed client sees live traffic immediately. Issue a
//! command and watch the ack come back:
//!
//!   {"event":"device:command","data":{"deviceId":"sim-1","command":"reboot"}}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use devicehub::auth::Claims;
use devicehub::{DeviceHub, HubServer, MemoryBackend, ServerConfig};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;

const SECRET: &str = "simple-hub-demo-secret";

/// Mint a development token the server's verifier will accept
fn mint_token(user_id: &str, role: &str) -> Result<String, Box<dyn std::error::Error>> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let claims = Claims {
        id: user_id.to_string(),
        role: role.to_string(),
        permissions: vec![],
        exp: now + 24 * 3600,
    };
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )?)
}

/// Push simulated sensor readings through the hub forever
async fn simulate_device(hub: Arc<DeviceHub>, device_id: &str) {
    let mut ticks = 0u64;
    if let Err(e) = hub.notify_device_status(device_id, "online", None).await {
        eprintln!("status update failed: {e}");
    }

    loop {
        tokio::time::sleep(Duration::from_secs(2)).await;
        ticks += 1;

        let reading = json!({
            "temperature": 20.0 + (ticks % 10) as f64,
            "tick": ticks,
        });
        if let Err(e) = hub.notify_device_data(device_id, reading).await {
            eprintln!("data update failed: {e}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let bind_addr: SocketAddr = match args.get(1) {
        Some(addr) => match addr.parse() {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: invalid bind address '{addr}': {e}");
                eprintln!("Usage: cargo run --example simple_hub [BIND_ADDR]");
                std::process::exit(1);
            }
        },
        None => "127.0.0.1:8080".parse()?,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("devicehub=debug".parse()?)
                .add_directive("simple_hub=debug".parse()?),
        )
        .init();

    let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
    let config = ServerConfig::default().bind(bind_addr).jwt_secret(SECRET);
    let server = HubServer::new(config, Arc::clone(&hub));

    let token = mint_token("demo-user", "operator")?;
    println!("Starting device hub on {bind_addr}");
    println!();
    println!("=== Connect ===");
    println!("websocat \"ws://{bind_addr}/?token={token}\"");
    println!();
    println!("=== Then try ===");
    println!(r#"{{"event":"subscribe:device","data":"sim-1"}}"#);
    println!(r#"{{"event":"device:command","data":{{"deviceId":"sim-1","command":"reboot"}}}}"#);
    println!();

    tokio::spawn(simulate_device(Arc::clone(&hub), "sim-1"));

    server.run().await?;
    Ok(())
}

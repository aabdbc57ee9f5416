//! # WAF Datapath Core
//!
//! This binary is the request-inspection-and-proxying core: it evaluates
//! every request against a tenant's whitelist, blacklist, rate limit, and
//! rule set before forwarding it upstream, or it short-circuits with a
//! synthesized block response.
//!
//! ## Architecture
//!
//! - **System Layer**: listener bootstrap and termination controls
//! - **Service Layer**: the Redis-backed control-plane registry (reload/restart signals)
//! - **App Layer**: the `ProxyHttp` implementations driving the HTTP/HTTPS listeners
//! - **WAF Layer**: the config cache, matcher, rate limiter, engine, and attack logger
//! - **Config**: datapath-local settings (ports, rate-limit defaults, feature switches)
//!
//! ## Communication
//!
//! Configuration changes arrive over the Redis control channel and are applied
//! to the process-wide config cache without interrupting in-flight connections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use tokio::{self};

mod app;
mod config;
mod service;
mod system;
mod waf;

/// Main entry point for the router core application.
///
/// This function initializes the core components of the routing system:
/// 1. Sets up logging configuration
/// 2. Builds the process-wide WAF engine, config cache, and attack logger
/// 3. Initializes the service registry for inter-service communication
/// 4. Sets up signal handlers for graceful shutdown
/// 5. Starts the main server in a separate thread
/// 6. Enters a control loop for monitoring and management
///
/// The application can be terminated by:
/// - SIGINT (Ctrl+C) signal
/// - Ctrl+X keyboard shortcut via the terminator CLI
///
/// # Lifecycle
///
/// The router runs continuously until terminated, monitoring for configuration
/// changes and adjusting routing behavior dynamically.
#[tokio::main]
async fn main() {
    // Configure file-based logging
    config::init();
    // std::env::set_var("RUST_LOG", "info");
    // env_logger::init();
    eprintln!("[----] Starting proxy server...");

    // Build the process-wide WAF engine and attack logger. These spawn their
    // own tokio tasks, so this must happen here, inside the `#[tokio::main]`
    // runtime, before the listeners are launched from bare OS threads below.
    waf::init_runtime_state();

    // Create atomic flag to track server active state
    let active_state = Arc::new(AtomicBool::new(false));

    eprintln!("[----] Starting service registry...");
    // initialize global sender
    {
        system::writer::writer_start();
    }

    eprintln!("[----] Starting control-plane registry client...");
    // Listen for reload/restart signals from the control plane over Redis.
    // `client()` spawns its own background thread and returns immediately.
    {
        service::registry::client();
    }

    eprintln!("[----] Starting CTRL+C Listener...");
    // Set up interrupt handler for graceful shutdown on SIGINT (Ctrl+C)
    {
        let running_clone = Arc::clone(&active_state);
        ctrlc::set_handler(move || {
            log::debug!("SIGINT received, shutting down servers...");
            eprintln!("\n[----] SIGINT received, shutting down servers...");
            eprintln!("[----] Finish...\n\n");
            running_clone.store(false, Ordering::SeqCst);
            eprintln!("[----] Restarting the Proxy and Gateway...");
        })
        .expect("Error setting Ctrl-C handler");
    }

    eprintln!("[----] Starting Main Loop...");

    // Main application loop - continues until termination signal
    loop {

        // Check for Ctrl+X termination signal via CLI interface
        if system::terminator::cli::init(Duration::from_millis(0)) {
            eprintln!("[----] Ctrl+X received, exiting...");
            break;
        }

        // Start server if not already active
        if !active_state.load(std::sync::atomic::Ordering::Relaxed) {
            // Set active state flag
            active_state.store(true, std::sync::atomic::Ordering::Relaxed);

            // Launch server in separate thread to avoid blocking the control loop
            std::thread::spawn(|| {
                system::server::init();
            });

            continue;
        }

        // Small sleep to prevent CPU spinning in the control loop
        sleep(Duration::from_millis(50));
    }
}

use std::{sync::Arc, thread};

use colored::Colorize;
use nfc_sdk::{CardEvent, CardEventReceiver, PcscSdk, SdkConfig, selector};
use tracing::{info, warn};

use crate::signal::wait_for_shutdown_signal;

/// Run the event loop until it fails or a termination signal arrives
pub(crate) async fn watch_command(
    config: SdkConfig,
    reader: Option<String>,
    all: bool,
) -> eyre::Result<()> {
    let sdk = Arc::new(PcscSdk::new(config));
    sdk.init()?;

    let selector = match reader {
        Some(pattern) => selector::by_name(pattern),
        None if all => selector::all(),
        None => selector::first(),
    };
    sdk.select_reader(selector);

    let events = sdk.subscribe();
    let printer = thread::spawn(move || print_events(events));

    let stop = sdk.stop_handle();
    let mut run = tokio::task::spawn_blocking({
        let sdk = Arc::clone(&sdk);
        move || sdk.run()
    });

    let finished = tokio::select! {
        result = &mut run => Some(result),
        signal = wait_for_shutdown_signal() => {
            match signal {
                Ok(()) => {
                    info!("shutting down");
                    stop.stop();
                }
                // keep watching, the loop can still end on its own
                Err(e) => warn!(error = %e, "failed to listen for signals"),
            }
            None
        }
    };
    let result = match finished {
        Some(result) => result?,
        None => run.await?,
    };

    // closes the event channel so the printer returns
    drop(sdk);
    if printer.join().is_err() {
        warn!("event printer panicked");
    }

    Ok(result?)
}

fn print_events(events: CardEventReceiver) {
    for event in events {
        match event {
            CardEvent::Handled { reader, protocol } => {
                let protocol = protocol.map_or_else(|| "none".to_string(), |p| format!("{p:?}"));
                println!("{} {} (protocol {})", "card".green().bold(), reader, protocol);
            }
            CardEvent::Failed { reader, error } => {
                println!("{} {}: {}", "failed".red().bold(), reader, error);
            }
        }
    }
}

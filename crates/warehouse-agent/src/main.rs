use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{
    DeviceCommandSerializer, DisambiguatorConfig, HardwareService, KeystrokeDisambiguator,
    PrinterController, PrinterSettings, ScaleConnectRequest, ScaleController, ScaleSettings,
    WarehouseOrchestrator,
};
use domain::device::DeviceStatus;
use domain::event::EventPublisher;
use domain::{HardwareEvent, PrintOutcome, WeightReading};
use infrastructure::config::WarehouseConfig;
use infrastructure::messaging::{CompositeEventPublisher, JsonLinesPublisher, TracingEventPublisher};
use infrastructure::DeviceFactory;
use warehouse_agent::input::{InputLine, InputRouter, OperatorInput, Routed, read_lines};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long)]
    config_dir: Option<String>,

    /// Override station ID
    #[arg(long)]
    station_id: Option<String>,

    /// Override the scale's serial port
    #[arg(long)]
    scale_port: Option<String>,
}

struct Station {
    scale: Arc<ScaleController>,
    printer: Arc<PrinterController>,
    orchestrator: Arc<WarehouseOrchestrator>,
    service: HardwareService,
    events: Arc<dyn EventPublisher>,
}

async fn run() -> Result<()> {
    dotenv().ok();

    // Logs go to stderr; stdout carries the event stream
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,warehouse_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Warehouse agent starting...");
    info!("Process ID: {}", std::process::id());

    let args = Args::parse();

    // Run from the workspace root during development
    let config_dir = args.config_dir.clone().unwrap_or_else(|| {
        let dev_dir = "crates/warehouse-agent/config";
        if std::path::Path::new(dev_dir).exists() {
            dev_dir.to_string()
        } else {
            "config".to_string()
        }
    });
    info!("Config directory: {}", config_dir);

    let mut config = WarehouseConfig::load(&config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir))?;
    if let Some(id) = args.station_id {
        config.station_id = id;
    }
    if let Some(port) = args.scale_port {
        config.scale.port = Some(port);
    }
    info!(station_id = %config.station_id, "Loaded configuration");

    // 1. Devices
    let serializer = DeviceCommandSerializer::new();
    let scale_connection =
        DeviceFactory::create_scale(&config.scale).context("Invalid scale configuration")?;
    let printer_connection =
        DeviceFactory::create_printer(&config.printer).context("Invalid printer configuration")?;

    let scale = Arc::new(ScaleController::new(
        config.scale.id.clone(),
        scale_connection,
        serializer.clone(),
        ScaleSettings::from(&config.scale),
    ));
    let printer = Arc::new(
        PrinterController::new(
            config.printer.id.clone(),
            printer_connection,
            serializer,
            PrinterSettings::from(&config.printer),
        )
        .with_station_id(config.station_id.clone()),
    );

    // 2. Event stream
    let events: Arc<dyn EventPublisher> = Arc::new(CompositeEventPublisher::new(vec![
        Arc::new(JsonLinesPublisher::new(tokio::io::stdout())),
        Arc::new(TracingEventPublisher),
    ]));

    let orchestrator = Arc::new(
        WarehouseOrchestrator::new(scale.clone(), printer.clone()).with_events(events.clone()),
    );
    let service = HardwareService::new(scale.clone(), printer.clone());
    let cancel = CancellationToken::new();

    tokio::spawn(forward_status(scale.subscribe_status(), events.clone(), cancel.clone()));
    tokio::spawn(forward_status(printer.subscribe_status(), events.clone(), cancel.clone()));
    tokio::spawn(forward_weights(
        scale.device_id().to_string(),
        scale.subscribe(),
        events.clone(),
        cancel.clone(),
    ));

    // 3. Initial connections (failures are retried by the operator)
    if config.scale.enabled {
        if let Err(e) = scale.connect(None).await {
            warn!(error = %e, "Scale not available at startup");
        }
        tokio::spawn(poll_loop(
            scale.clone(),
            Duration::from_millis(config.scale.poll_interval_ms),
            cancel.clone(),
        ));
    }
    if config.printer.enabled {
        if let Err(e) = printer.connect().await {
            warn!(error = %e, "Printer not available at startup");
        }
    }

    // 4. Operator input: stamping, key routing and device commands each get
    // their own task so keystroke timing never waits on a device
    let station = Arc::new(Station {
        scale: scale.clone(),
        printer: printer.clone(),
        orchestrator,
        service,
        events,
    });
    let router = InputRouter::new(KeystrokeDisambiguator::new(DisambiguatorConfig::from(
        &config.scanner,
    )));
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let reader = tokio::spawn(async move {
        if let Err(e) = read_lines(tokio::io::stdin(), lines_tx).await {
            warn!(error = %e, "Failed to read operator input");
        }
    });
    let mut keys = tokio::spawn(route_input(
        station.clone(),
        router,
        lines_rx,
        commands_tx,
        cancel.clone(),
    ));
    let mut commands = tokio::spawn(command_loop(station, commands_rx, cancel.clone()));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Shutting down..."),
            Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
        },
        _ = async {
            let _ = (&mut keys).await;
            // Let queued commands finish once input is closed
            let _ = (&mut commands).await;
        } => info!("Operator input closed, shutting down..."),
    }

    cancel.cancel();
    reader.abort();
    keys.abort();
    commands.abort();
    scale.disconnect().await;
    printer.disconnect().await;

    info!("Good bye!");
    Ok(())
}

/// Drive the scale at a fixed cadence
async fn poll_loop(scale: Arc<ScaleController>, interval: Duration, cancel: CancellationToken) {
    info!(device_id = %scale.device_id(), interval_ms = interval.as_millis() as u64, "Starting poll loop");
    let mut timer = tokio::time::interval(interval);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = timer.tick() => {
                if let Err(e) = scale.poll().await {
                    debug!(device_id = %scale.device_id(), error = %e, "Poll failed");
                }
            }
        }
    }
}

async fn forward_status(
    mut status: watch::Receiver<DeviceStatus>,
    events: Arc<dyn EventPublisher>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = status.borrow_and_update().clone();
                if let Err(e) = events.publish(HardwareEvent::connection_changed(snapshot)).await {
                    warn!(error = %e, "Failed to publish status");
                }
            }
        }
    }
}

async fn forward_weights(
    device_id: String,
    mut readings: watch::Receiver<Option<WeightReading>>,
    events: Arc<dyn EventPublisher>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = readings.changed() => {
                if changed.is_err() {
                    break;
                }
                let reading = *readings.borrow_and_update();
                if let Some(reading) = reading {
                    if let Err(e) = events.publish(HardwareEvent::weight_updated(&device_id, reading)).await {
                        warn!(error = %e, "Failed to publish weight");
                    }
                }
            }
        }
    }
}

async fn route_input(
    station: Arc<Station>,
    mut router: InputRouter,
    mut lines: mpsc::UnboundedReceiver<InputLine>,
    commands: mpsc::UnboundedSender<OperatorInput>,
    cancel: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        match router.route(&line) {
            // Snapshot read and event publish only, no device I/O
            Ok(Some(Routed::Scan(scan))) => {
                station.orchestrator.on_scan(scan).await;
            }
            Ok(Some(Routed::Command(command))) => {
                if commands.send(command).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, line = %line.text, "Ignoring malformed input"),
        }
    }
}

async fn command_loop(
    station: Arc<Station>,
    mut commands: mpsc::UnboundedReceiver<OperatorInput>,
    cancel: CancellationToken,
) {
    loop {
        let command = tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };
        handle_command(&station, command).await;
    }
}

async fn handle_command(station: &Station, command: OperatorInput) {
    match command {
        OperatorInput::Key { .. } => {}
        OperatorInput::Print(request) => {
            if let Err(e) = station.orchestrator.print_label(request).await {
                warn!(kind = e.kind(), error = %e, "Label not printed");
            }
        }
        OperatorInput::PrintLabel(request) => {
            let package_number = request.package_number.clone();
            let outcome = station.service.print_package_label(request).await;
            if let PrintOutcome::Failed { kind, reason } = &outcome {
                warn!(kind = %kind, reason = %reason, "Label not printed");
            }
            let event = HardwareEvent::print_outcome(package_number, &outcome);
            if let Err(e) = station.events.publish(event).await {
                warn!(error = %e, "Failed to publish print result");
            }
        }
        OperatorInput::PrintTest => match station.service.print_test().await {
            PrintOutcome::Succeeded => info!("Test label printed"),
            PrintOutcome::Failed { kind, reason } => {
                warn!(kind = %kind, reason = %reason, "Test label failed")
            }
        },
        OperatorInput::Tare => {
            if let Err(e) = station.service.scale_tare().await {
                warn!(kind = %e.kind, error = %e.message, "Tare failed");
            }
        }
        OperatorInput::Weight => match station.scale.poll().await {
            Ok(reading) => {
                let event = HardwareEvent::weight_updated(station.scale.device_id(), reading);
                if let Err(e) = station.events.publish(event).await {
                    warn!(error = %e, "Failed to publish weight");
                }
            }
            Err(e) => warn!(kind = e.kind(), error = %e, "Weight unavailable"),
        },
        OperatorInput::ConnectScale { port } => {
            if let Err(e) = station.service.scale_connect(ScaleConnectRequest { port }).await {
                warn!(kind = %e.kind, error = %e.message, "Scale connect failed");
            }
        }
        OperatorInput::DisconnectScale => {
            station.service.scale_disconnect().await;
        }
        OperatorInput::ConnectPrinter => {
            if let Err(e) = station.service.printer_connect().await {
                warn!(kind = %e.kind, error = %e.message, "Printer connect failed");
            }
        }
        OperatorInput::DisconnectPrinter => {
            station.service.printer_disconnect().await;
        }
        OperatorInput::ClearScan => station.orchestrator.clear_scan(),
        OperatorInput::Status => {
            for status in [station.service.scale_status(), station.service.printer_status()] {
                if let Err(e) = station.events.publish(HardwareEvent::connection_changed(status)).await {
                    warn!(error = %e, "Failed to publish status");
                }
            }
            debug!(active_scan = ?station.orchestrator.active_scan(), printer = %station.printer.device_id(), "Status requested");
        }
    }
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };
    let result = rt.block_on(run());
    // The stdin reader may still be parked on a blocking read
    rt.shutdown_timeout(Duration::from_millis(500));

    if let Err(e) = result {
        eprintln!("\nCRITICAL ERROR: {:?}", e);
        eprintln!("--------------------------------------------------");
        eprintln!("The warehouse agent stopped because of a fatal error.");

        #[cfg(target_os = "windows")]
        {
            eprintln!("\nPress Enter to close this window...");
            let mut input = String::new();
            let _ = std::io::stdin().read_line(&mut input);
        }

        std::process::exit(1);
    }
}

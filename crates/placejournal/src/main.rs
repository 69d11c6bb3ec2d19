//! `placejournal` - CLI for the place journal
//!
//! This binary drives the capability gate, capture, browse and map flows
//! against the local journal, with the host machine standing in for the
//! phone's camera, position sensor and biometrics.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;

use placejournal::cli::{
    AddCommand, Cli, Command, ConfigCommand, ListCommand, MapCommand, OutputFormat, ShowCommand,
};
use placejournal::device::{photo_uri, FixedBiometrics, FixedCamera, FixedLocator, Shot};
use placejournal::{
    init_logging, BrowseFlow, CapabilityGate, CaptureSession, Config, Coordinates, Error,
    GateOutcome, ListRow, MapView, PlaceJournal,
};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run(cli.command, &config))
}

async fn run(command: Command, config: &Config) -> anyhow::Result<ExitCode> {
    if command.is_gated() {
        let outcome = evaluate_gate(config).await;
        if let Some(notice) = outcome.notice() {
            eprintln!("{notice}");
            return Ok(ExitCode::FAILURE);
        }
    }

    match command {
        Command::Gate => {
            let outcome = evaluate_gate(config).await;
            println!("{outcome}");
            if let Some(notice) = outcome.notice() {
                eprintln!("{notice}");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Add(cmd) => handle_add(config, &cmd).await,
        Command::List(cmd) => handle_list(config, &cmd),
        Command::Show(cmd) => handle_show(config, &cmd),
        Command::Map(cmd) => handle_map(config, &cmd),
        Command::Config(cmd) => {
            handle_config(config, cmd)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the startup check with the configured device answers.
async fn evaluate_gate(config: &Config) -> GateOutcome {
    let device = &config.device;
    let camera = FixedCamera::new(device.camera_permission, Shot::Cancel);
    let locator = FixedLocator::new(device.location_permission, device.position());
    let biometrics = FixedBiometrics::new(device.biometric_hardware, device.biometric_success);

    CapabilityGate::new(&camera, &locator, &biometrics)
        .evaluate()
        .await
}

async fn handle_add(config: &Config, cmd: &AddCommand) -> anyhow::Result<ExitCode> {
    let device = &config.device;

    let photo = photo_uri(&cmd.photo)?;
    let camera = FixedCamera::new(device.camera_permission, Shot::Photo(photo));

    let locator = if cmd.no_location {
        FixedLocator::denied()
    } else {
        let position = match (cmd.lat, cmd.lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => device.position(),
        };
        if let Some(position) = position.filter(|p| !p.is_valid()) {
            bail!("position out of range: {position}");
        }
        FixedLocator::new(device.location_permission, position)
    };

    let journal = PlaceJournal::open(config)?;
    let mut session = CaptureSession::new(
        &camera,
        &locator,
        &journal,
        config.capture.default_title.clone(),
    );

    if let Err(e) = session.capture_photo().await {
        return notice_or_fail(e);
    }
    if let Err(e) = session.sample_location().await {
        if let Some(notice) = e.user_notice() {
            eprintln!("{notice}");
        }
    }

    let place = match session.commit(&cmd.title) {
        Ok(place) => place,
        Err(e) => return notice_or_fail(e),
    };

    match place.location {
        Some(position) => println!("Saved \"{}\" at {position} ({})", place.title, place.id),
        None => println!("Saved \"{}\" ({})", place.title, place.id),
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<ExitCode> {
    let journal = PlaceJournal::open(config)?;
    let mut browse = BrowseFlow::new(&journal, config.storage.on_unreadable);
    browse.refresh().context("your places could not be loaded")?;

    match cmd.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(browse.places())?);
        }
        OutputFormat::Plain => {
            for row in browse.rows() {
                println!("{}\t{}", row.date_label, row.title);
            }
        }
        OutputFormat::Table => {
            let rows = browse.rows();
            if rows.is_empty() {
                println!("No places saved yet.");
            } else {
                print_table(&rows);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_table(rows: &[ListRow]) {
    let width = rows
        .iter()
        .map(|row| row.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("TITLE".len());

    println!("{:<13}  {:<width$}  {:<10}  GPS", "ID", "TITLE", "DATE");
    for row in rows {
        println!(
            "{:<13}  {:<width$}  {:<10}  {}",
            row.id,
            row.title,
            row.date_label,
            if row.located { "yes" } else { "no" }
        );
    }
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> anyhow::Result<ExitCode> {
    let journal = PlaceJournal::open(config)?;
    let place = journal
        .get(&cmd.id)?
        .ok_or_else(|| Error::PlaceNotFound { id: cmd.id.clone() })?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&place)?);
    } else {
        let row = ListRow::from(&place);
        println!("Id:       {}", place.id);
        println!("Title:    {}", place.title);
        println!("Date:     {}", row.date_label);
        println!("Photo:    {}", place.photo);
        match place.location {
            Some(position) => println!("Location: {position}"),
            None => println!("Location: none"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_map(config: &Config, cmd: &MapCommand) -> anyhow::Result<ExitCode> {
    let journal = PlaceJournal::open(config)?;
    let mut browse = BrowseFlow::new(&journal, config.storage.on_unreadable);
    browse.refresh().context("your places could not be loaded")?;

    let request = match &cmd.id {
        Some(id) => {
            let place = browse
                .places()
                .iter()
                .find(|place| &place.id == id)
                .ok_or_else(|| Error::PlaceNotFound { id: id.clone() })?;
            browse.select_for_map(place)
        }
        None => browse.map_all(),
    };

    match request.render() {
        MapView::Empty => println!("No places to show."),
        MapView::Map { region, pins } => {
            println!(
                "Region:   {:.6}, {:.6} (span {} x {})",
                region.latitude, region.longitude, region.latitude_delta, region.longitude_delta
            );
            if pins.is_empty() {
                println!("No located places to pin.");
            }
            for pin in pins {
                println!("Pin:      {}  {}", pin.coordinates, pin.title);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let device = &config.device;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Blob key:           {}", config.storage.blob_key);
                println!("  On unreadable:      {:?}", config.storage.on_unreadable);
                println!();
                println!("[Capture]");
                println!("  Default title:      {}", config.capture.default_title);
                println!();
                println!("[Device]");
                println!("  Camera permission:  {:?}", device.camera_permission);
                println!("  Location permission: {:?}", device.location_permission);
                println!("  Biometric hardware: {}", device.biometric_hardware);
                println!("  Biometric success:  {}", device.biometric_success);
                match device.position() {
                    Some(position) => println!("  Position:           {position}"),
                    None => println!("  Position:           none"),
                }
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Report an outcome the user can act on, or propagate anything else.
fn notice_or_fail(error: Error) -> anyhow::Result<ExitCode> {
    match error.user_notice() {
        Some(notice) => {
            eprintln!("{notice}");
            Ok(ExitCode::FAILURE)
        }
        None => Err(error.into()),
    }
}

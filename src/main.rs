//! Vigil - headless actor simulation
//!
//! Runs the demo yard for a number of ticks, logging what every actor is
//! doing. Runs can be saved to and resumed from named slots.

mod arena;
mod save;
mod settings;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arena::{Arena, LEVEL_NAME};
use save::SaveData;
use settings::VigilSettings;

#[derive(Debug, Default)]
struct Options {
    load: Option<String>,
    save: Option<String>,
    ticks: Option<u32>,
    list: bool,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--load" => options.load = Some(args.next().context("--load needs a slot name")?),
                "--save" => options.save = Some(args.next().context("--save needs a slot name")?),
                "--ticks" => {
                    let value = args.next().context("--ticks needs a number")?;
                    options.ticks = Some(value.parse().with_context(|| format!("Invalid tick count '{}'", value))?);
                }
                "--list" => options.list = true,
                other => bail!("Unknown argument '{}'", other),
            }
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let options = Options::parse(std::env::args().skip(1))?;

    if options.list {
        for slot in save::list_save_slots()? {
            info!(
                "{} - level '{}' at {:.1}s, saved {}",
                slot.slot_name, slot.level, slot.level_time, slot.timestamp
            );
        }
        return Ok(());
    }

    let settings = VigilSettings::load();
    info!("Starting Vigil (seed {})", settings.simulation.seed);

    let mut arena = match &options.load {
        Some(slot) => {
            let data = save::load_from_slot(slot)?;
            if data.level != LEVEL_NAME {
                bail!("Save '{}' is for level '{}', not '{}'", slot, data.level, LEVEL_NAME);
            }
            info!("Resuming '{}' at {:.1}s", slot, data.archive.time.level_time);
            Arena::resume(&settings, data.archive)?
        }
        None => Arena::build(&settings)?,
    };

    let ticks = options.ticks.unwrap_or(settings.simulation.ticks);
    let report_interval = settings.simulation.report_interval;
    for tick in 1..=ticks {
        arena.step();
        if report_interval > 0 && tick % report_interval == 0 {
            arena.report();
        }
    }
    arena.report();
    info!("Player took {} shots", arena.shots_taken);

    if let Some(slot) = &options.save {
        let archive = arena.sim.save()?;
        let path = save::save_to_slot(&SaveData::new(slot, LEVEL_NAME, archive))?;
        info!("Saved to {}", path.display());
    }

    Ok(())
}

//! # SANDFALL Headless
//!
//! Runs the simulation without a window and prints tick statistics.
//!
//! ```bash
//! # Default world, 300 ticks as fast as possible
//! ./sandfall_headless
//!
//! # Config file, fixed seed, paced at the configured tick rate
//! ./sandfall_headless --config config/sandfall.toml --seed 42 --realtime
//! ```

use std::process;

use sandfall::core::Color;
use sandfall::{Command, Engine, EngineConfig, FrameBuffer, TickPacer};

/// Command line options.
struct Options {
    config: Option<String>,
    ticks: u64,
    threads: Option<usize>,
    seed: Option<u32>,
    realtime: bool,
    pour_every: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: None,
            ticks: 300,
            threads: None,
            seed: None,
            realtime: false,
            pour_every: 30,
        }
    }
}

const USAGE: &str = "usage: sandfall_headless [--config PATH] [--ticks N] [--threads N] \
                     [--seed N] [--pour-every N] [--realtime]";

fn parse_args() -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let mut value = |name: &str| args.next().ok_or_else(|| format!("{name} needs a value"));
        match arg.as_str() {
            "--config" => options.config = Some(value("--config")?),
            "--ticks" => options.ticks = parse(&value("--ticks")?)?,
            "--threads" => options.threads = Some(parse(&value("--threads")?)?),
            "--seed" => options.seed = Some(parse(&value("--seed")?)?),
            "--pour-every" => options.pour_every = parse(&value("--pour-every")?)?,
            "--realtime" => options.realtime = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                process::exit(0);
            }
            other => return Err(format!("unknown argument `{other}`\n{USAGE}")),
        }
    }
    Ok(options)
}

fn parse<T: std::str::FromStr>(text: &str) -> Result<T, String> {
    text.parse().map_err(|_| format!("`{text}` is not a valid number"))
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            process::exit(2);
        }
    };

    let mut config = match &options.config {
        Some(path) => match EngineConfig::from_toml_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("   ✗ FATAL: {e}");
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(threads) = options.threads {
        config.threads = threads;
    }
    if let Some(seed) = options.seed {
        config.terrain.seed = seed;
    }

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    SANDFALL HEADLESS v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════════");
    println!();
    println!("  World:    {}x{}", config.terrain.width, config.terrain.height);
    println!("  Seed:     {}", config.terrain.seed);
    println!("  Threads:  {}", config.threads);
    println!("  Tickrate: {}/s{}", config.tickrate, if options.realtime { "" } else { " (unpaced)" });
    println!();

    let mut engine = match Engine::init(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("   ✗ FATAL: {e}");
            process::exit(1);
        }
    };
    println!(
        "   ✓ Terrain generated: {} fluid cells, checksum {:016x}",
        engine.grid().count_fluid(),
        engine.grid().checksum()
    );

    let (width, height) = (engine.grid().width(), engine.grid().height());
    let mut pacer = TickPacer::new(engine.tickrate());
    let mut moved = 0u64;

    while engine.tick_count() < options.ticks {
        if options.realtime && !pacer.should_tick() {
            pacer.wait_for_next_tick();
            continue;
        }
        let start = pacer.begin_tick();

        if options.pour_every > 0 && engine.tick_count() % options.pour_every == 0 {
            let x = i32::try_from(width / 2).unwrap_or(0);
            let pour = if (engine.tick_count() / options.pour_every) % 4 == 3 {
                Command::PourLava { x, y: 8 }
            } else {
                Command::PourWater { x, y: 8 }
            };
            let _ = engine.apply(pour);
        }

        let stats = engine.step();
        moved += stats.fluids.moved;
        if options.realtime {
            pacer.end_tick(start);
        }

        if stats.tick % 60 == 0 {
            println!(
                "   tick {:>6}  fluids {:>7}  moved {:>6}  quenched {:>4}  {:>6}µs",
                stats.tick,
                stats.fluids.visited,
                stats.fluids.moved,
                stats.fluids.quenched,
                stats.elapsed_us
            );
        }
    }

    let mut frame = FrameBuffer::new(width, height, Color::rgb(0x33, 0x33, 0x33));
    engine.render(&mut frame);
    let timings = engine.timings();
    engine.shutdown();

    println!();
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Ticks:     {}", engine.tick_count());
    println!("  Moves:     {moved}");
    println!("  Fluids:    {}", engine.grid().count_fluid());
    println!(
        "  Tick time: min {}µs / avg {}µs / max {}µs",
        if timings.total_ticks == 0 { 0 } else { timings.min_us },
        timings.avg_us,
        timings.max_us
    );
    if options.realtime {
        println!("  Late:      {} ticks, {} dropped", pacer.late_ticks(), pacer.skipped_ticks());
    }
    println!("  Frame:     {} bytes", frame.as_bytes().len());
    println!("  Checksum:  {:016x}", engine.grid().checksum());
    println!("═══════════════════════════════════════════════════════════════════");
}

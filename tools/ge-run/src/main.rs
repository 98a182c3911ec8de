use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use ge_core::{GeEngine, GeEngineConfig, RecordingGeBackend, RecordingInterruptSink};
use ge_memory::{PspMemory, PspMemoryConfig, DEFAULT_RAM_SIZE, RAM_BASE};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod summary;

use summary::RunSummary;

#[derive(Parser, Debug)]
#[command(
    name = "ge-run",
    about = "Run a PSP GE display list from a raw memory image and print a JSON summary."
)]
struct Args {
    /// Raw memory image to load (little-endian command words)
    image: PathBuf,

    /// Guest address the image is loaded at
    #[arg(long, value_name = "ADDR", value_parser = parse_u32, default_value_t = RAM_BASE)]
    load_addr: u32,

    /// Address of the display list to enqueue (defaults to the load address)
    #[arg(long, value_name = "ADDR", value_parser = parse_u32)]
    list: Option<u32>,

    /// Initial stall address (defaults to the end of the image)
    #[arg(long, value_name = "ADDR", value_parser = parse_u32)]
    stall: Option<u32>,

    /// Move the stall address of the list, in order; may be repeated
    #[arg(long = "advance", value_name = "ADDR", value_parser = parse_u32)]
    advances: Vec<u32>,

    /// Interrupt channel for the list (-1 disables interrupts for it)
    #[arg(long, value_name = "N", default_value_t = -1, allow_hyphen_values = true)]
    sub_intr: i32,

    /// Enqueue at the head of the queue
    #[arg(long, action = clap::ArgAction::SetTrue)]
    head: bool,

    /// Main RAM size in bytes
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_RAM_SIZE)]
    ram_size_bytes: u32,

    /// Resume from a saved engine state instead of enqueueing a new list
    #[arg(long, value_name = "PATH")]
    load_state: Option<PathBuf>,

    /// Save the engine state after all stall updates
    #[arg(long, value_name = "PATH")]
    save_state: Option<PathBuf>,

    /// Disable GE interrupts globally
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_interrupts: bool,

    /// Log every fetched command at trace level
    #[arg(long, action = clap::ArgAction::SetTrue)]
    trace_commands: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let summary = run(&args)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &summary).context("write summary")?;
    writeln!(out)?;
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let image = fs::read(&args.image).with_context(|| format!("read {}", args.image.display()))?;
    if image.is_empty() {
        bail!("image {} is empty", args.image.display());
    }
    let image_len = u32::try_from(image.len()).map_err(|_| anyhow!("image is larger than 4 GiB"))?;

    let mut mem = PspMemory::new(PspMemoryConfig {
        ram_size_bytes: args.ram_size_bytes,
    });
    mem.write(args.load_addr, &image)
        .with_context(|| format!("load image at {:#010x}", args.load_addr))?;

    let mut engine = GeEngine::new(GeEngineConfig {
        interrupts_enabled: !args.no_interrupts,
        trace_commands: args.trace_commands,
    });
    let backend = RecordingGeBackend::new();
    let sink = RecordingInterruptSink::new();
    engine.set_backend(Box::new(backend.clone()));
    engine.set_interrupt_sink(Box::new(sink.clone()));

    let id = match &args.load_state {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            engine
                .restore_snapshot(&mut BufReader::new(file))
                .with_context(|| format!("restore {}", path.display()))?;
            if args.no_interrupts {
                engine.set_interrupts_enabled(false);
            }
            let id = engine
                .current_list_id()
                .or_else(|| engine.display_lists().next().map(|list| list.id()));
            info!(queued = engine.queue_len(), list_id = id.map(|id| id.0), "restored engine state");
            id
        }
        None => {
            let list_addr = args.list.unwrap_or(args.load_addr);
            let stall = args
                .stall
                .unwrap_or_else(|| args.load_addr.wrapping_add(image_len));
            Some(engine.enqueue_list(&mem, list_addr, stall, args.sub_intr, args.head))
        }
    };

    for &stall in &args.advances {
        let Some(id) = id else {
            bail!("--advance given but there is no display list to advance");
        };
        info!(list_id = id.0, stall = format_args!("{stall:#010x}"), "advancing stall");
        engine.update_stall(&mem, id, stall);
    }

    if let Some(path) = &args.save_state {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(file);
        engine
            .save_snapshot(&mut w)
            .with_context(|| format!("save {}", path.display()))?;
        w.flush().with_context(|| format!("flush {}", path.display()))?;
    }

    Ok(RunSummary::collect(&engine, id, &backend, &sink))
}

//! LC-3 Virtual Machine - CLI Entry Point
//!
//! `lc3-vm [OPTIONS] <IMAGE>...` loads each image in order and runs from
//! 0x3000 until the program halts.
//!
//! Exit status:
//! - 0: halted (or stopped at `--max-cycles`)
//! - 1: an image could not be loaded
//! - 2: bad arguments
//! - 3: the machine faulted
//! - 130: interrupted with Ctrl-C

use clap::Parser;
use lc3::{
    load_image, Console, Cpu, CpuError, CpuState, ImageError, InterruptFlag, Registers, StdioConsole,
    TerminalConsole,
};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_LOAD: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_FAULT: u8 = 3;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "lc3-vm")]
#[command(version)]
#[command(about = "A virtual machine for the LC-3 educational computer")]
struct Cli {
    /// Object images to load, in order (later images overwrite earlier ones)
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,

    /// Stop after this many instructions
    #[arg(short, long)]
    max_cycles: Option<u64>,

    /// Keep the terminal in line-buffered mode
    #[arg(long)]
    no_raw: bool,

    /// Print the final machine state as JSON on stderr
    #[arg(long)]
    dump_state: bool,
}

#[derive(Serialize)]
struct StateDump<'a> {
    state: CpuState,
    cycles: u64,
    registers: &'a Registers,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut cpu = Cpu::new();
    if let Err(e) = load_all(&cli.images, &mut cpu) {
        eprintln!("❌ Failed to load image: {}", e);
        return ExitCode::from(EXIT_LOAD);
    }

    let interrupt = InterruptFlag::register().unwrap_or_else(|e| {
        log::warn!("could not install signal handlers: {}", e);
        InterruptFlag::new()
    });

    // The console is dropped at the end of this block, restoring the
    // terminal before anything else is printed.
    let result = if std::io::stdin().is_terminal() && !cli.no_raw {
        match TerminalConsole::enter(interrupt) {
            Ok(mut console) => execute(&mut cpu, &mut console, cli.max_cycles),
            Err(e) => Err(CpuError::Io(e)),
        }
    } else {
        execute(&mut cpu, &mut StdioConsole::spawn(interrupt), cli.max_cycles)
    };

    if cli.dump_state {
        match state_json(&cpu) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => log::error!("failed to serialize machine state: {}", e),
        }
    }

    match result {
        Ok(cycles) => {
            if cpu.is_running() {
                log::warn!("stopped after {} instructions without halting", cycles);
                eprintln!("⚠️  Reached max cycles limit ({}).", cycles);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if matches!(e, CpuError::Interrupted) {
                eprintln!("Interrupted.");
            } else {
                log::error!("machine fault: {:?}", e);
                eprintln!("❌ CPU error at PC={:#06x}: {}", cpu.regs.pc, e);
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Load every image into `cpu` in order, stopping at the first failure.
fn load_all(paths: &[PathBuf], cpu: &mut Cpu) -> Result<(), ImageError> {
    for path in paths {
        let image = load_image(path)?;
        let loaded = cpu.load_image(&image);
        log::info!("loaded {} words at {:#06x} from {}", loaded, image.origin, path.display());
    }
    Ok(())
}

/// Process exit status for a run that ended in `err`.
fn exit_code(err: &CpuError) -> u8 {
    match err {
        CpuError::Interrupted => EXIT_INTERRUPTED,
        _ => EXIT_FAULT,
    }
}

fn execute<C: Console>(cpu: &mut Cpu, console: &mut C, max_cycles: Option<u64>) -> Result<u64, CpuError> {
    match max_cycles {
        Some(max) => cpu.run_limited(max, console),
        None => cpu.run(console),
    }
}

fn state_json(cpu: &Cpu) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&StateDump {
        state: cpu.state,
        cycles: cpu.cycles,
        registers: &cpu.regs,
    })
}

//! concertina: interactive entry point.

use std::io::{self, Write};
use std::path::PathBuf;

use concertina_core::config::{Config, DEFAULT_CONFIG};
use concertina_core::engine::InputMode;
use concertina_core::pitch::Organ;
use concertina_core::reconcile::StablePolicy;
use concertina_sim::app::{run, AppConfig};

const USAGE: &str = "\
usage: concertina [--quick] [--config PATH] [--proximity] [-v|--verbose]...
       concertina --dump-config

  --quick         skip the interactive questions
  --config PATH   override defaults with a TOML file
  --proximity     start in finger-curl mode
  -v, --verbose   log more (repeat for trace)
  --dump-config   print the default configuration and exit
";

struct Args {
    quick:       bool,
    config:      Option<PathBuf>,
    proximity:   bool,
    verbosity:   u8,
    dump_config: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args { quick: false, config: None, proximity: false, verbosity: 0, dump_config: false };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--quick"         => args.quick = true,
            "--proximity"     => args.proximity = true,
            "--dump-config"   => args.dump_config = true,
            "-v" | "--verbose" => args.verbosity = args.verbosity.saturating_add(1),
            "-vv"             => args.verbosity = args.verbosity.saturating_add(2),
            "--config" => {
                let path = it.next().ok_or("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                print!("{}", USAGE);
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument {:?}\n\n{}", other, USAGE)),
        }
    }
    Ok(args)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn main() {
    let args = match parse_args() {
        Ok(a)  => a,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    if args.dump_config {
        print!("{}", DEFAULT_CONFIG);
        return;
    }

    init_logging(args.verbosity);

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Concertina — hand-tracked button concertina         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Input: LeapMotion hardware (keyboard presses buttons)");
    #[cfg(not(feature = "leap"))]
    println!("  Input: Keyboard simulation  (use --features leap for hardware)");
    println!();

    let mut core = match Config::load(args.config.as_deref()) {
        Ok(c)  => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if args.proximity {
        core.mode = InputMode::Proximity;
    }

    if args.quick {
        println!(
            "  Quick-start: {}, stable bellows {:?}, velocity {}\n",
            Organ::from_program(core.midi.program).map(Organ::name).unwrap_or("custom program"),
            core.stable_policy,
            core.midi.velocity,
        );
    } else {
        configure_interactively(&mut core);
    }

    let cfg = AppConfig { core, ..AppConfig::default() };

    println!();
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn configure_interactively(core: &mut Config) {
    core.midi.program  = pick_instrument(core.midi.program);
    core.stable_policy = pick_policy(core.stable_policy);
    core.midi.velocity = read_line(&format!("  Velocity 0–127 (default {}): ", core.midi.velocity))
        .trim().parse().unwrap_or(core.midi.velocity).min(127);
}

fn pick_instrument(current: u8) -> u8 {
    println!("  Instrument (GM organ family):");
    for organ in Organ::ALL {
        println!("    {:>2} = {}", organ.program(), organ.name());
    }
    read_line(&format!("  Program (default {}): ", current))
        .trim().parse::<u8>().ok()
        .filter(|p| *p <= 127)
        .unwrap_or(current)
}

fn pick_policy(current: StablePolicy) -> StablePolicy {
    println!("  When the bellows stop moving:");
    println!("    1. silence pressed buttons");
    println!("    2. keep the last pitch sounding");
    let default = if current == StablePolicy::Hold { "2" } else { "1" };
    match read_line(&format!("  Choice (default {}): ", default)).trim() {
        "1" => StablePolicy::Silence,
        "2" => StablePolicy::Hold,
        _   => current,
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}

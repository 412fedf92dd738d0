use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;

use znc_logs::convert::{ConvertArgs, ConvertConfig, GrammarMode, LogConvert};
use znc_logs::{print_error, print_warning};

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Convert a ZNC 1.4 log directory to the ZNC 1.6 directory hierarchy"
)]
struct Args {
    /// Optional input directory containing the ZNC 1.4 logs
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Log module that wrote the logs: global, network or user
    #[arg(short, long, value_name = "MODULE")]
    mode: Option<GrammarMode>,

    /// Output directory, relative to the input directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Log file extension
    #[arg(short, long, value_name = "EXTENSION")]
    extension: Option<String>,

    /// Start without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Reuse a non-empty output directory
    #[arg(short, long)]
    force: bool,

    /// Only print changes without writing files
    #[arg(short, long)]
    print: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl From<Args> for ConvertArgs {
    fn from(args: Args) -> Self {
        Self {
            auto: args.yes,
            dryrun: args.print,
            extension: args.extension,
            force: args.force,
            mode: args.mode,
            output: args.output,
            verbose: args.verbose,
        }
    }
}

fn main() {
    if let Err(error) = run(Args::parse()) {
        print_error!("{error:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if let Some(ref shell) = args.completion {
        return znc_logs::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }

    let root = znc_logs::resolve_input_path(args.path.as_deref())?;
    let config = ConvertConfig::from_args(args.into())?;

    // Ctrl+C at the prompts exits with status 1, during the run it stops after the current file.
    let started = Arc::new(AtomicBool::new(false));
    let abort = Arc::new(AtomicBool::new(false));
    {
        let started = Arc::clone(&started);
        let abort = Arc::clone(&abort);
        ctrlc::set_handler(move || {
            if !started.load(Ordering::SeqCst) {
                println!();
                std::process::exit(1);
            }
            if abort.load(Ordering::SeqCst) {
                // Second Ctrl+C - force exit
                std::process::exit(130);
            }
            println!("\n{}", "Received Ctrl+C, stopping after the current file...".yellow().bold());
            abort.store(true, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl+C handler")?;
    }

    let convert = LogConvert::new(root, config)?.with_abort_flag(Arc::clone(&abort));
    print_intro(&convert);

    if !convert.config().auto && !convert.config().dryrun {
        if read_input("Press Enter to continue or Ctrl+C to abort")?.is_none() {
            std::process::exit(1);
        }
        println!();
    }

    let mode = match convert.config().mode {
        Some(mode) => mode,
        None => ask_mode()?,
    };

    started.store(true, Ordering::SeqCst);
    let stats = convert.run(mode)?;
    stats.print_summary();
    Ok(())
}

fn print_intro(convert: &LogConvert) {
    println!(
        "This tool converts ZNC 1.4 log files in a single directory.\n\
         Logs in subdirectories will not be processed.\n\
         Found {} logs, {} of which have duplicates.\n\
         Logs will be stored in {}, in an all-lowercase directory hierarchy compliant with ZNC 1.6.0\n",
        convert.log_files().len(),
        convert.duplicates().groups.len(),
        znc_logs::get_relative_path_or_filename(convert.output_dir(), convert.root())
    );
    if !convert.config().dryrun {
        println!("Your log files should be backed up and ZNC should *not* be running.\n");
    }
    print_warning!("If your network or user names contain underscores, the directory structure WILL be wrong.");
}

/// Ask which log module the logs are from until a valid answer is given.
fn ask_mode() -> anyhow::Result<GrammarMode> {
    loop {
        let Some(input) = read_input("What log module are these logs from? (Global/Network/User)")? else {
            std::process::exit(1);
        };
        if let Some(mode) = GrammarMode::from_selection(&input) {
            return Ok(mode);
        }
        print_warning!("Unknown log module: {}", input.trim());
    }
}

/// Print a prompt and read one line from stdin.
/// Returns `None` on end of input.
fn read_input(prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{} ", prompt.magenta());
    io::stdout().flush()?;

    let mut input = String::new();
    let bytes = io::stdin().read_line(&mut input).context("Failed to read input")?;
    if bytes == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(input))
}

use clap::{ArgAction, Parser};
use log::LevelFilter;
use sgex::pipeline::{extract_file, DecodeReport, ExtractError, ExtractOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "sgex-extract", version, about = "Recover a save game from an encoded SGEX transmission")]
struct Cli {
    /// Captured transmission (escaped, Reed-Solomon encoded, zlib compressed)
    input: PathBuf,
    /// Directory the recovered save is written into
    #[arg(short = 'C', long, default_value = ".")]
    output_dir: PathBuf,
    /// Do not overwrite an existing file
    #[arg(long)]
    no_clobber: bool,
    /// Print the result as JSON instead of the text summary
    #[arg(long)]
    json: bool,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let opts = ExtractOptions {
        output_dir: cli.output_dir.clone(),
        no_clobber: cli.no_clobber,
    };

    match extract_file(&cli.input, &opts) {
        Ok(report) => {
            if cli.json {
                if let Err(e) = print_json(&report) {
                    eprintln!("Error: {e}");
                    return ExitCode::FAILURE;
                }
            } else {
                print_summary(&report);
                println!("Wrote save game {} to {}", report.filename, report.output_path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            // Recovered but not stored: still show what came off the wire.
            if let ExtractError::Output { report, .. } = &e {
                if cli.json {
                    let _ = print_json(report);
                } else {
                    print_summary(report);
                }
            }
            log::debug!("pipeline stopped after stage {}", e.stage());
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Error,
        (_, 0)    => LevelFilter::Warn,
        (_, 1)    => LevelFilter::Info,
        _         => LevelFilter::Debug,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });
    let _ = builder.try_init();
}

fn print_json(r: &DecodeReport) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(r)?);
    Ok(())
}

fn print_summary(r: &DecodeReport) {
    println!("Errors Corrected: {}", r.errors_corrected);
    println!("Transmitted Filename: {}", r.filename);
    println!("Transmitted Save Size: {}", r.save_file_size);
    println!("Transmitted MD5: {}", r.transmitted_md5);
    println!("Computed MD5: {}", r.computed_md5);
    println!();

    if r.md5_matches {
        println!("MD5 hashes validate, save is correct.");
    } else {
        println!("MD5 hashes don't match, save is corrupt.");
    }
}

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use benchfig::error::PipelineError;
use benchfig::figures::{self, Figure};
use benchfig::key::KeyPolicy;
use benchfig::{render, report, resultset};

#[derive(Parser)]
#[command(
    name = "benchfig",
    about = "Extract Criterion benchmark results and compose report figures",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a table of benchmark results
    Report {
        /// Criterion output directory
        #[arg(long, default_value = "target/criterion")]
        dir: PathBuf,

        /// Output as CSV
        #[arg(long)]
        csv: bool,

        /// Filter by group name (substring match)
        #[arg(long)]
        filter: Option<String>,
    },

    /// Compose the report figures and render them to SVG and PNG
    Figures {
        /// Criterion output directory
        #[arg(long, default_value = "target/criterion")]
        dir: PathBuf,

        /// Output directory for chart specs and images
        #[arg(long, default_value = "results/figures")]
        out: PathBuf,

        /// Write chart specifications only; skip image rendering
        #[arg(long)]
        spec_only: bool,
    },

    /// Export normalized results as JSON
    Export {
        /// Criterion output directory
        #[arg(long, default_value = "target/criterion")]
        dir: PathBuf,

        /// Results directory for the JSON export
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Report { dir, csv, filter } => run_report(&dir, csv, filter.as_deref()),
        Command::Figures { dir, out, spec_only } => run_figures(&dir, &out, spec_only),
        Command::Export { dir, out } => run_export(&dir, &out),
    }
}

fn run_report(dir: &Path, csv: bool, filter: Option<&str>) -> Result<()> {
    let rs = resultset::build(dir, KeyPolicy::Strict)?;
    let groups = report::group_results(&rs, filter);
    if groups.is_empty() {
        eprintln!("No benchmark results found.");
        std::process::exit(1);
    }

    let stdout = io::stdout().lock();
    let mut out = BufWriter::new(stdout);
    if csv {
        report::write_csv(&mut out, &groups)?;
    } else {
        let rows = report::write_table(&mut out, &groups)?;
        writeln!(out, "\nTotal: {rows} benchmarks")?;
    }
    out.flush()?;
    Ok(())
}

fn run_figures(dir: &Path, out_dir: &Path, spec_only: bool) -> Result<()> {
    let rs = resultset::build(dir, KeyPolicy::FullPath)?;
    println!("Found {} benchmark results", rs.len());

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;
    println!("\nGenerating figures to {}/...", out_dir.display());

    let mut written = 0usize;
    for (figure, result) in figures::compose_all(&rs) {
        let spec = match result {
            Ok(spec) => spec,
            Err(PipelineError::FigureSkipped { figure, reason }) => {
                println!("  - {figure} SKIPPED: {reason}");
                continue;
            }
            Err(e) => {
                println!("  - {} SKIPPED: {e}", figure.id());
                continue;
            }
        };

        let spec_path = out_dir.join(format!("{}.json", figure.id()));
        fs::write(&spec_path, spec.to_json())
            .with_context(|| format!("failed to write {}", spec_path.display()))?;

        let note = if spec.used_fallback() {
            "  [includes fallback/model data]"
        } else {
            ""
        };
        if spec_only {
            println!("  - {}.json{note}", figure.id());
            written += 1;
            continue;
        }

        let svg_path = out_dir.join(format!("{}.svg", figure.id()));
        let png_path = out_dir.join(format!("{}.png", figure.id()));
        let rendered = render::render_svg(&spec, &svg_path)
            .and_then(|()| render::render_png(&spec, &png_path));
        match rendered {
            Ok(()) => {
                println!("  - {}.svg / {}.png{note}", figure.id(), figure.id());
                written += 1;
            }
            Err(e) => println!("  - {} RENDER FAILED: {e}", figure.id()),
        }
    }

    println!("\nDone: {written}/{} figures", Figure::ALL.len());
    Ok(())
}

fn run_export(dir: &Path, out_dir: &Path) -> Result<()> {
    let rs = resultset::build(dir, KeyPolicy::FullPath)?;

    if rs.is_empty() {
        println!("No Criterion results found. Run: cargo bench");
    } else {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;
        let mut map = serde_json::Map::new();
        for (key, record) in rs.iter() {
            map.insert(
                key.to_string(),
                serde_json::json!({
                    "mean_ns": record.mean_ns,
                    "mean_ms": record.mean_ms(),
                    "ci_lower_ms": record.ci_lower_ms(),
                    "ci_upper_ms": record.ci_upper_ms(),
                    "error_ms": record.error_ms(),
                }),
            );
        }
        let count = map.len();
        let path = out_dir.join("criterion.json");
        let mut text = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
        text.push('\n');
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Extracted {count} benchmarks -> {}", path.display());
    }

    print_network_summary(out_dir);

    if !rs.is_empty() {
        println!("\n=== Results ===\n");
        let groups = report::group_results(&rs, None);
        let stdout = io::stdout().lock();
        let mut out = BufWriter::new(stdout);
        report::write_summary(&mut out, &groups)?;
        out.flush()?;
    }
    Ok(())
}

/// Optional peer network measurement file: opaque pass-through, summarized
/// for the console but never merged into the result set.
fn print_network_summary(out_dir: &Path) {
    let path = out_dir.join("network.json");
    let Ok(text) = fs::read_to_string(&path) else {
        return;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
        info!("ignoring unparseable network measurements at {}", path.display());
        return;
    };
    let Some(entries) = value.as_array() else {
        return;
    };
    println!("Found network results: {} peers", entries.len());
    for entry in entries {
        let peer = entry.get("peer").and_then(|v| v.as_str()).unwrap_or("?");
        let rtt = entry.get("rtt_mean_us").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let speedup = entry.get("speedup").and_then(|v| v.as_f64()).unwrap_or(0.0);
        println!("  {peer}: RTT {rtt}us, speedup {speedup:.0}x");
    }
}

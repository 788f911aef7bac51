use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use tftgen_core::Library;
use tftgen_io::{read_gds, write_gds};
use tftgen_mask::{demo, generate, parse_mask_config, MaskConfig};
use tftgen_pdk::layers::layer_stack;

/// Parametric photomask generator for ITO thin-film transistor test structures
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sweep device parameters and pack the results into a mask
    Sweep {
        /// Path to TOML configuration file; defaults are used without one
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// GDS output file
        #[arg(short, long, default_value = "mask.gds")]
        output: PathBuf,

        /// JSON manifest output file
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Write the single-die demo layout
    Demo {
        /// GDS output file
        #[arg(short, long, default_value = "ito_transistor_test.gds")]
        output: PathBuf,
    },

    /// Summarize the cells of a GDS file
    Inspect {
        /// GDS file to read
        file: PathBuf,
    },

    /// Print the default configuration as TOML
    DumpConfig,
}

fn sweep(config: Option<&Path>, output: &Path, manifest: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => parse_mask_config(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?,
        None => MaskConfig::default(),
    };
    let mask = generate(&config).context("mask generation failed")?;
    mask.write(output, manifest)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{}: {} structures in {} blocks, {} rejected",
        mask.manifest.name,
        mask.manifest.placement_count(),
        mask.manifest.blocks.len(),
        mask.manifest.rejected.len()
    );
    for r in &mask.manifest.rejected {
        println!("  rejected {}: {}", r.variant, r.reason);
    }
    Ok(())
}

fn write_demo(output: &Path) -> Result<()> {
    let die = demo()?;
    let name = die.name.clone();
    let lib = Library::from_top(&name, layer_stack(), die)?;
    write_gds(output, &lib).with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote demo die to {}", output.display());
    Ok(())
}

fn inspect(file: &Path) -> Result<()> {
    let lib = read_gds(file, layer_stack())
        .with_context(|| format!("failed to read {}", file.display()))?;
    println!("library {}: {} cells", lib.name, lib.cell_count());
    if let Some(top) = lib.top() {
        match top.bbox() {
            Some(bb) => println!(
                "top {} spans {:.3} x {:.3} um",
                top.name,
                bb.width(),
                bb.height()
            ),
            None => println!("top {} is empty", top.name),
        }
    }
    for cell in lib.all_cells() {
        println!(
            "  {:<48} {:>6} shapes {:>5} instances",
            cell.name,
            cell.geometry_count(),
            cell.instance_count()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sweep {
            config,
            output,
            manifest,
        } => sweep(config.as_deref(), &output, manifest.as_deref()),
        Commands::Demo { output } => write_demo(&output),
        Commands::Inspect { file } => inspect(&file),
        Commands::DumpConfig => {
            print!("{}", MaskConfig::default().to_toml()?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["tftgen", "demo", "--output", "die.gds"]).unwrap();
        assert!(matches!(cli.command, Commands::Demo { ref output } if output.as_path() == Path::new("die.gds")));
        let cli = Cli::try_parse_from(["tftgen", "dump-config"]).unwrap();
        assert!(matches!(cli.command, Commands::DumpConfig));
    }

    #[test]
    fn test_demo_written_and_inspected() {
        let dir = std::env::temp_dir().join(format!("tftgen_demo_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let gds = dir.join("demo.gds");
        write_demo(&gds).unwrap();
        let lib = read_gds(&gds, layer_stack()).unwrap();
        assert_eq!(lib.top().unwrap().name, "ito_transistor_test");
        inspect(&gds).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }
}

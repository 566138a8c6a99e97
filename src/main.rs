use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use m1pack::archive::{self, ArchiveError};
use m1pack::catalog;
use m1pack::manifest::Manifest;
use m1pack::section::SectionReader;

#[derive(Parser)]
#[command(name = "m1pack")]
#[command(about = "YI M1 / Fujifilm X-A10 firmware unpacker and repacker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unpack a firmware image into sections, sub-sections, and a manifest
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Rebuild a firmware image from unpacked files and their manifest
    Repack {
        manifest: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        input_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Swap the firmware region between M1INT and M1CN
    Flip {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Decompress, recompress, and re-decompress every compressed sub-section
    Selftest { input: PathBuf },
    /// Print the section table
    Info { input: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Unpack { input, output_dir } => {
            let data = fs::read(input)?;
            let source_name = source_name(input);
            let unpacked = archive::unpack(&data, &source_name)?;
            if !output_dir.exists() {
                fs::create_dir_all(output_dir)?;
            }
            for file in &unpacked.files {
                fs::write(output_dir.join(&file.name), &file.data)?;
                println!("Unpacked: {} ({} bytes)", file.name, file.data.len());
            }
            let manifest_name = format!("{}_manifest.json", stem(&source_name));
            fs::write(output_dir.join(&manifest_name), unpacked.manifest.to_json()?)?;
            println!("Manifest: {manifest_name}");
        }
        Commands::Repack {
            manifest,
            input_dir,
            output,
        } => {
            let text = fs::read_to_string(manifest).map_err(|_| ArchiveError::MetadataMissing)?;
            let manifest = Manifest::from_json(&text)?;
            let mut files = HashMap::new();
            for entry in &manifest.sections {
                load(input_dir, &entry.filename, &mut files);
                for sub in &entry.subsections {
                    load(input_dir, &sub.filename, &mut files);
                    if let Some(dec) = &sub.filename_decompressed {
                        load(input_dir, dec, &mut files);
                    }
                }
            }
            let image = archive::repack(&manifest, &files)?;
            fs::write(output, &image)?;
            println!(
                "Repacked {} sections into {} ({} bytes)",
                manifest.sections.len(),
                output.display(),
                image.len()
            );
        }
        Commands::Flip { input, output } => {
            let data = fs::read(input)?;
            let flipped = archive::flip_region(&data)?;
            fs::write(output, &flipped)?;
            println!("Region flipped: {}", output.display());
        }
        Commands::Selftest { input } => {
            let data = fs::read(input)?;
            let report = archive::self_test(&data)?;
            if report.entries.is_empty() {
                println!("No compressed sub-sections found (firmware not recognized?)");
                return Ok(());
            }
            for entry in &report.entries {
                println!(
                    "{}: {} -> {} bytes, stream {}, {} [{}]",
                    entry.name,
                    entry.original_len,
                    entry.redecoded_len,
                    if entry.stream_identical {
                        "identical"
                    } else {
                        "re-encoded"
                    },
                    if entry.matches { "OK" } else { "MISMATCH" },
                    entry.content_hash_hex(),
                );
            }
            if !report.passed() {
                return Err(format!("self-test failed: {} sub-section(s) mismatched", report.mismatches()).into());
            }
            println!("Self-test passed");
        }
        Commands::Info { input } => {
            let data = fs::read(input)?;
            let sections = SectionReader::read_all(&data)?;
            println!("{:<4} {:<8} {:>10} {:>12}  {}", "#", "ID", "LENGTH", "SUM", "DEVICE");
            for (i, section) in sections.iter().enumerate() {
                let h = &section.header;
                println!(
                    "{:<4} {:<8} {:>10} {:>12}  {} {} {}",
                    i,
                    h.section_id.as_deref().unwrap_or("-"),
                    h.section_length,
                    h.section_sum,
                    h.device_id.as_deref().unwrap_or("-"),
                    h.device_version.as_deref().unwrap_or("-"),
                    h.dvr.as_deref().unwrap_or("-"),
                );
            }
            if let Some(first) = sections.first() {
                let h = &first.header;
                if let (Some(device), Some(version), Some(dvr)) =
                    (h.device_id.as_deref(), h.device_version.as_deref(), h.dvr.as_deref())
                {
                    match catalog::lookup(device, version, dvr) {
                        Ok(entry) => println!("Firmware: {}", entry.name),
                        Err(miss) => println!("Firmware: not in catalog ({miss})"),
                    }
                }
            }
        }
    }
    Ok(())
}

/// Read one referenced file into the map.  Absent files are skipped here;
/// repack reports the ones it actually needs.
fn load(dir: &Path, name: &str, files: &mut HashMap<String, Vec<u8>>) {
    if files.contains_key(name) {
        return;
    }
    if let Ok(data) = fs::read(dir.join(name)) {
        files.insert(name.to_owned(), data);
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "firmware.bin".to_owned())
}

fn stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

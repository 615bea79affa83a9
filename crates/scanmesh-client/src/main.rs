mod bundle;
mod client;
mod colormap;
mod error;
mod pipeline;
mod preview;

use std::path::{Path, PathBuf};

use argh::FromArgs;

use crate::bundle::{write_bundle, BUNDLE_NAME};
use crate::client::ServerClient;
use crate::colormap::ColorScheme;
use crate::error::ClientError;
use crate::pipeline::{process_scan, OutputFormat, PipelineOptions};

#[derive(FromArgs)]
/// Convert E57 point clouds into PLY, OBJ or STL files through a scanmesh server.
struct Args {
    /// e57 files, or directories searched for them
    #[argh(positional)]
    inputs: Vec<PathBuf>,

    /// url of the conversion server
    #[argh(option, default = "String::from(\"http://127.0.0.1:5000\")")]
    server: String,

    /// output format: ply, obj, stl or zip
    #[argh(option, default = "OutputFormat::Ply")]
    format: OutputFormat,

    /// preview colors: viridis, plasma, cividis, inferno, magma, rainbow or jet
    #[argh(option, default = "ColorScheme::Viridis")]
    color_scheme: ColorScheme,

    /// directory for the converted files
    #[argh(option, default = "PathBuf::from(\"converted\")")]
    output_dir: PathBuf,

    /// ball radius used to mesh OBJ and STL exports
    #[argh(option, default = "0.03")]
    alpha: f64,

    /// width and height of the preview images in pixels
    #[argh(option, default = "800")]
    preview_size: u32,
}

fn is_e57(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("e57"))
        .unwrap_or(false)
}

// Expand directories into the E57 files below them.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = walkdir::WalkDir::new(input)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file() && is_e57(entry.path()))
                .map(|entry| entry.path().to_path_buf())
                .collect::<Vec<_>>();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

// The archive is written for several files, or for one with `--format zip`.
fn wants_bundle(format: OutputFormat, converted: usize) -> bool {
    converted > 1 || (format == OutputFormat::Zip && converted > 0)
}

/// Convert every input, bundle the results and return the converted files.
///
/// Scans the server rejects are reported and skipped.
fn run(args: &Args) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let inputs = collect_inputs(&args.inputs);
    if inputs.is_empty() {
        return Err("No E57 files to convert".into());
    }

    std::fs::create_dir_all(&args.output_dir)?;

    log::info!("🚀 Converting {} file(s) with {}", inputs.len(), args.server);

    let client = ServerClient::new(&args.server)?;
    let options = PipelineOptions {
        format: args.format,
        color_scheme: args.color_scheme,
        output_dir: args.output_dir.clone(),
        alpha: args.alpha,
        preview_size: args.preview_size,
    };

    let pb = indicatif::ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("##>-"),
    );

    let mut converted = Vec::new();
    for path in &inputs {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        pb.set_message(name.clone());

        match process_scan(&client, path, &options) {
            Ok(scan) => {
                log::info!("🖼️ Preview written to {}", scan.preview.display());
                converted.push(scan.file);
            }
            Err(ClientError::Server { message, .. }) => {
                pb.println(format!("⚠️ Error converting {name}: {message}"));
            }
            Err(err) => {
                pb.println(format!("⚠️ Error converting {name}: {err}"));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    for file in &converted {
        println!("🗂 {}", file.display());
    }

    if wants_bundle(args.format, converted.len()) {
        let dest = args.output_dir.join(BUNDLE_NAME);
        write_bundle(&dest, &converted)?;
        println!("📦 {}", dest.display());
    }

    Ok(converted)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();
    if run(&args)?.is_empty() {
        return Err("No file was converted".into());
    }

    Ok(())
}

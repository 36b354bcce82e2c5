//! `img-budget` command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use img_budget::cli::{Args, Commands};
use img_budget::constants::{OUTPUT_PREFIX, TIME_PREFIX};
use img_budget::logger::{set_verbosity, Verbosity};
use img_budget::search::{monotonicity_violations, size_curve};
use img_budget::utils::{folder_stats, format_file_size};
use img_budget::validation::{parse_size, prepare_output_dir, validate_file_exists};
use img_budget::{
    compress_input, load_image_asset, normalize, Codec, ColorMode, CompressionConfig,
    CompressionTarget, ConsoleReporter, ImageCodec, QualityRange,
};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    set_verbosity(Verbosity::from_flags(args.quiet, args.verbose));

    match args.command {
        Commands::Compress {
            input,
            output_dir,
            percent,
            max_size,
            min_quality,
            max_quality,
            flatten,
            keep_closest,
        } => {
            let target = match (percent, max_size) {
                (Some(percent), _) => CompressionTarget::percent(percent)?,
                (None, Some(size)) => CompressionTarget::absolute_bytes(parse_size(&size)?)?,
                (None, None) => anyhow::bail!("either --percent or --max-size is required"),
            };
            let config = CompressionConfig::new(target, min_quality, max_quality, keep_closest)?;
            run_compress(&input, &output_dir, &config, !flatten)?;
        }
        Commands::Probe {
            input,
            min_quality,
            max_quality,
            step,
        } => {
            let defaults = QualityRange::default();
            let range = QualityRange::new(
                min_quality.unwrap_or(defaults.min()),
                max_quality.unwrap_or(defaults.max()),
            )?;
            run_probe(&ImageCodec, &input, range, step)?;
        }
    }

    Ok(())
}

fn run_compress(
    input: &Path,
    output_dir: &Path,
    config: &CompressionConfig,
    preserve_structure: bool,
) -> Result<()> {
    validate_file_exists(input)?;
    let output_dir = prepare_output_dir(output_dir)
        .with_context(|| format!("cannot use output directory {}", output_dir.display()))?;

    img_budget::verbose!(
        "Target: {}, quality {}..={}",
        config.target,
        config.range.min(),
        config.range.max()
    );

    let start_time = Instant::now();
    let reporter = ConsoleReporter::new();
    compress_input(&ImageCodec, input, &output_dir, config, preserve_structure, &reporter)
        .with_context(|| format!("failed to compress {}", input.display()))?;
    let elapsed = start_time.elapsed();

    let stats = folder_stats(&output_dir)
        .with_context(|| format!("failed to read {}", output_dir.display()))?;
    img_budget::info!(
        "{} Output folder: {} ({} files, {})",
        OUTPUT_PREFIX,
        output_dir.display(),
        stats.file_count,
        format_file_size(stats.total_bytes)
    );
    img_budget::info!("{} Elapsed: {:.2?}", TIME_PREFIX, elapsed);

    Ok(())
}

fn run_probe<C: Codec>(codec: &C, input: &Path, range: QualityRange, step: u8) -> Result<()> {
    let asset = load_image_asset(codec, input)
        .with_context(|| format!("failed to decode {}", input.display()))?;
    let original_size = asset.original_size;
    let normalized = normalize(asset, input);

    println!(
        "{}: {}x{} {}, {}, encoding as {}",
        normalized.source_path.display(),
        normalized.image.width(),
        normalized.image.height(),
        ColorMode::from_color_type(normalized.image.color()),
        format_file_size(original_size),
        normalized.format
    );

    let curve = size_curve(codec, &normalized.image, normalized.format, range, step)?;
    for point in &curve {
        println!("  quality {:>3}: {}", point.quality, format_file_size(point.size));
    }

    let violations = monotonicity_violations(&curve);
    if violations.is_empty() {
        println!("Size grows with quality across the probed range.");
    } else {
        for (lower, higher) in violations {
            img_budget::warn!(
                "quality {} encodes smaller than quality {} ({} < {})",
                higher.quality,
                lower.quality,
                format_file_size(higher.size),
                format_file_size(lower.size)
            );
        }
    }

    Ok(())
}

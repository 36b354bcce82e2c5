//! Command-line arguments

use crate::constants::DEFAULT_PROBE_STEP;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-budget",
    about = "Compress images to a size budget at the highest quality that fits",
    long_about = "img-budget shrinks JPEG, PNG and WebP images until they fit a size budget, \
                  either a percentage of each file's original size or an absolute maximum. \
                  For every image it binary-searches the encoder quality and keeps the highest \
                  quality whose output fits. PNG input is re-encoded as JPEG.",
    version,
    after_help = "EXAMPLES:\n  \
    img-budget compress photo.jpg ./out --percent 50\n  \
    img-budget compress ./photos ./out --max-size 500KB --min-quality 30\n  \
    img-budget compress ./photos ./out -p 40 --flatten --keep-closest\n  \
    img-budget probe photo.webp --step 10"
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(
        short,
        long,
        global = true,
        help = "Log every trial encode",
        long_help = "Print the encoded size of every trial quality the search tries. \
                     Ignored when --quiet is given."
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress an image or a directory of images to a size budget",
        long_about = "Compress a single image, or every .jpg/.jpeg/.png/.webp file under a directory, \
                      so that each output is no larger than the budget. Files already within budget \
                      are skipped and nothing is written for them.",
        group(ArgGroup::new("target").required(true).args(["percent", "max_size"]))
    )]
    Compress {
        #[arg(help = "Input image file or directory")]
        input: PathBuf,

        #[arg(help = "Output directory (created if missing)")]
        output_dir: PathBuf,

        #[arg(
            short,
            long,
            help = "Target size as a percentage of each original (e.g. 50)",
            long_help = "Target size as a percentage of each file's original size. \
                         Must be greater than 0."
        )]
        percent: Option<f64>,

        #[arg(
            short = 's',
            long,
            help = "Maximum output size (e.g. 500KB, 1.5MB, 204800)",
            long_help = "Absolute maximum output size. Plain numbers are bytes; \
                         B, KB, MB and GB suffixes are 1024-based and case-insensitive."
        )]
        max_size: Option<String>,

        #[arg(long, help = "Lowest quality the search may use (1-100, default: 10)")]
        min_quality: Option<u8>,

        #[arg(long, help = "Highest quality the search may use (1-100, default: 95)")]
        max_quality: Option<u8>,

        #[arg(
            long,
            help = "Write every output directly into OUTPUT_DIR",
            long_help = "Do not mirror the input directory structure. Files with the same name \
                         in different subdirectories overwrite each other, last one wins."
        )]
        flatten: bool,

        #[arg(
            long,
            help = "Keep the lowest-quality output when the budget cannot be met",
            long_help = "When even the minimum quality is over budget, write that encoding anyway \
                         instead of skipping the file. Such files are reported as over target."
        )]
        keep_closest: bool,
    },

    #[command(
        about = "Print the encoded size of an image across qualities",
        long_about = "Encode an image at a series of qualities and print the resulting sizes. \
                      The quality search assumes size grows with quality; any drop is flagged."
    )]
    Probe {
        #[arg(help = "Image file to probe")]
        input: PathBuf,

        #[arg(long, help = "Lowest quality to probe (default: 10)")]
        min_quality: Option<u8>,

        #[arg(long, help = "Highest quality to probe (default: 95)")]
        max_quality: Option<u8>,

        #[arg(long, default_value_t = DEFAULT_PROBE_STEP, help = "Quality increment between samples")]
        step: u8,
    },
}

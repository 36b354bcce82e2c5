//! Size-budgeted image compression.
//!
//! Each image is re-encoded at the highest quality whose output fits a budget,
//! either a share of its original size or an absolute byte count.

pub mod batch;
pub mod cli;
pub mod codec;
pub mod constants;
pub mod error;
pub mod formats;
pub mod logger;
pub mod processing;
pub mod report;
pub mod search;
pub mod utils;
pub mod validation;

pub use batch::{compress_input, compress_tree, derive_output_path, BatchSummary};
pub use codec::{Codec, DecodedImage, ImageCodec};
pub use error::{CompressionError, Result};
pub use formats::{is_supported_image, ColorMode, OutputFormat, SourceFormat};
pub use processing::{
    compress_image, load_image_asset, normalize, CompressionConfig, CompressionResult,
    CompressionTarget, ImageAsset, MissPolicy, NormalizedAsset, Outcome,
};
pub use report::{ConsoleReporter, NullReporter, RecordingReporter, ReportEvent, Reporter};
pub use search::{search, search_quality, QualityRange, SearchOutcome, Trial};
pub use validation::parse_size;

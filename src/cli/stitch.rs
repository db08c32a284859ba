//! Stitch command implementation

use tracing::{debug, info};

use super::StitchArgs;
use crate::batch::{run_batch, BatchOptions};
use crate::codec::ImageCodec;
use crate::color::parse_color;
use crate::config::{load_config, merge_cli_overrides, CliOverrides, ConfigError, StitchConfig};
use crate::error::Result;
use crate::layout::StrategyRequest;

/// Run the stitch command
pub fn run_stitch(args: &StitchArgs) -> Result<()> {
    let config = effective_config(args)?;
    let options = batch_options(args, &config)?;

    let report = run_batch(&options, &ImageCodec)?;

    let (width, height) = report.plan.canvas_size();
    info!(
        tiles = report.tiles.len(),
        columns = report.plan.columns,
        rows = report.plan.rows,
        width,
        height,
        output = %report.output.display(),
        "done"
    );
    if let Some(ref metadata) = report.metadata {
        debug!(path = %metadata.display(), "metadata");
    }
    if args.remove {
        info!(removed = report.removed, of = report.tiles.len(), "inputs removed");
    }
    Ok(())
}

/// Load `stitch.toml` (explicit or discovered) and apply the command-line flags.
fn effective_config(args: &StitchArgs) -> Result<StitchConfig> {
    let mut config = load_config(args.config.as_deref())?;
    let overrides = CliOverrides {
        extension: args.ext.clone(),
        no_sort: args.no_sort,
        cell_size: args.cell,
        background: args.background.clone(),
        metadata: args.metadata,
        jobs: args.jobs.map(usize::from),
    };
    merge_cli_overrides(&mut config, &overrides)?;
    Ok(config)
}

fn strategy_request(args: &StitchArgs) -> StrategyRequest {
    StrategyRequest {
        auto: args.auto,
        horizontal: args.horizontal,
        vertical: args.vertical,
        explicit: args.explicit.clone(),
        index_auto: args.index_auto,
    }
}

fn batch_options(args: &StitchArgs, config: &StitchConfig) -> Result<BatchOptions> {
    let layout = config.layout_options();
    let strategy = config.strategy_for(&strategy_request(args)).resolve(&layout)?;
    // Validated with the rest of the config
    let background = parse_color(&config.output.background)
        .map_err(|e| ConfigError::Validation(vec![format!("output.background: {}", e)]))?;

    Ok(BatchOptions {
        input_dir: args.input.clone(),
        pattern: args.pattern.clone(),
        extension: config.input.extension.clone(),
        strategy,
        layout,
        background,
        output: args.output.clone(),
        jobs: config.decode.jobs,
        metadata: config.output.metadata,
        list: args.list,
        remove_inputs: args.remove,
    })
}

//! Convert command implementation

use tracing::info;

use super::ConvertArgs;
use crate::codec::ImageCodec;
use crate::convert::{convert_tree, ConvertAction, TraversalBudget};
use crate::error::Result;
use crate::resolve::compile_pattern;

/// Run the convert command
pub fn run_convert(args: &ConvertArgs) -> Result<()> {
    let root = match args.search_path {
        Some(ref sub) => args.base_path.join(sub),
        None => args.base_path.clone(),
    };
    let filter = compile_pattern(&args.filter)?;
    let budget = args.max.map(TraversalBudget::at_most).unwrap_or_default();
    let action = if args.print_only {
        ConvertAction::Print
    } else {
        ConvertAction::ConvertToPng { out_dir: args.output_path.clone() }
    };

    let report = convert_tree(&root, &filter, budget, &action, &ImageCodec)?;

    if args.print_only {
        for path in &report.matches {
            println!("{}", path.display());
        }
    }
    info!(
        files = report.summary.files,
        matched = report.summary.matched,
        converted = report.written.len(),
        stopped_early = report.summary.stopped_early,
        "done"
    );
    Ok(())
}

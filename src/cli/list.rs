//! List command implementation

use super::ListArgs;
use crate::error::Result;
use crate::resolve::resolve;

/// Run the list command: print `index<TAB>path` for every tile in batch order.
pub fn run_list(args: &ListArgs) -> Result<()> {
    let tiles = resolve(&args.input, args.pattern.as_deref(), &args.ext)?;
    for (index, path) in tiles.listing() {
        println!("{}\t{}", index, path.display());
    }
    if tiles.is_empty() {
        tracing::warn!(dir = %args.input.display(), "no tiles found");
    }
    Ok(())
}

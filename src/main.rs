//! library-pack command-line entrypoint

use anyhow::Result;

fn main() -> Result<()> {
    library_pack::cli::run()
}

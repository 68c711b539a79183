use anyhow::Result;
use tracing_subscriber::fmt;

/// Installs the stderr subscriber; stdout stays reserved for the JSON report.
pub fn init(verbose: bool) -> Result<()> {
    if !verbose {
        return Ok(());
    }
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .try_init();
    Ok(())
}

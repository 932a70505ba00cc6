//! Stdout structured logging, matching the timestamp/level/target/message
//! layout used throughout this codebase's other binaries.

use chrono::Local;

/// Initializes the global logger at `level`. Call once, at process start.
///
/// # Errors
/// Returns an error if a logger has already been installed.
pub fn init_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {} [{}] {}",
                Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, false),
                record.level(),
                record.target(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

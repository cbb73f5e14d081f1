use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Env};

/// Install the global logger, `info` unless `RUST_LOG` says otherwise.
/// With a `log_dir`, records are appended to `<log_dir>/pprcd.log` instead of stderr.
pub fn init_logger(log_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{:<5}] {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("pprcd.log"))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.try_init()?;
    Ok(())
}

use crate::numerical::DormandPrince::DP_main::SolutionPoint;
use csv::Writer;
use simplelog::*;
use std::fs::File;

/// where and how verbosely the solver logs
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub log_to_console: bool,
    pub log_file: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: LevelFilter::Info,
            log_to_console: true,
            log_file: None,
        }
    }
}

/// Initialize the global logger from the settings. Only the first successful call
/// installs a logger; later calls only move the global max level.
pub fn init_logger(settings: &LogSettings) {
    let level = settings.level;
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    // Console logger
    if settings.log_to_console {
        loggers.push(TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }

    // File logger
    if let Some(ref filename) = settings.log_file {
        match File::create(filename) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(e) => eprintln!("cannot create log file {}: {}", filename, e),
        }
    }

    if !loggers.is_empty() && CombinedLogger::init(loggers).is_err() {
        log::set_max_level(level);
    }
    if level == LevelFilter::Off {
        log::set_max_level(LevelFilter::Off);
    }
}

/// writes accepted points as csv: header is the argument name followed by the variable names
pub fn save_solution_to_csv(points: &[SolutionPoint], filename: &str) -> Result<(), csv::Error> {
    let mut writer = Writer::from_path(filename)?;
    if let Some(first) = points.first() {
        writer.write_record(first.names().iter())?;
    }
    for point in points {
        writer.write_record(point.values().iter().map(|val| val.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

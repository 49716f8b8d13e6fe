use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use daylog::config::LogConfig;
use daylog::logging::{self, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs live next to the executable: <exec dir>/log/<app name>/
    let config = LogConfig::from_current_exe()?;

    // Installs tracing and runs the startup sweep
    let logging = logging::init(&config)?;
    let logger = logging.logger().clone();

    logger.system(format_args!("{} started", config.app_name));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (level, message) = split_level(&line);
        match level {
            Level::Debug => logger.debug(message),
            Level::Info => logger.info(message),
            Level::Warn => logger.warn(message),
            Level::System => logger.system(message),
            Level::Error => logger.error(message),
            // Fatal would end the process mid-stream
            Level::Fatal => logger.error(message),
        }
    }

    logger.system(format_args!("{} stopped", config.app_name));
    logging.shutdown().await
}

/// Split a leading level word off a line; untagged lines are INFO
fn split_level(line: &str) -> (Level, &str) {
    if let Some((tag, rest)) = line.split_once(' ') {
        if let Some(level) = Level::parse(tag) {
            return (level, rest.trim_start());
        }
    }
    (Level::Info, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_level() {
        assert_eq!(split_level("WARN disk at 91%"), (Level::Warn, "disk at 91%"));
        assert_eq!(split_level("error  timeout"), (Level::Error, "timeout"));
        assert_eq!(split_level("plain line"), (Level::Info, "plain line"));
        assert_eq!(split_level("INFO"), (Level::Info, "INFO"));
    }
}

//! Per-run and per-map diagnostic message collection.

/// Severity of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Informational progress, surfaced only in per-run/per-map logs.
    Info,
    /// A recoverable problem, surfaced in `warnings.txt` as well.
    Warning,
}

/// Accumulates info/warning messages for one run or one map, matching the
/// two-stream split the output logs are built from.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    messages: Vec<(Level, String)>,
}

impl Logger {
    /// Create an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational message.
    pub fn log_info(&mut self, msg: impl Into<String>) {
        self.messages.push((Level::Info, msg.into()));
    }

    /// Record a warning message.
    pub fn log_warning(&mut self, msg: impl Into<String>) {
        self.messages.push((Level::Warning, msg.into()));
    }

    /// Every message at or above `min_level`, each prefixed with its level.
    #[must_use]
    pub fn get_messages(&self, min_level: Level) -> Vec<String> {
        self.messages
            .iter()
            .filter(|(level, _)| *level >= min_level)
            .map(|(level, msg)| {
                let prefix = match level {
                    Level::Info => "INFO: ",
                    Level::Warning => "WARNING: ",
                };
                format!("{prefix}{msg}")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filters_by_minimum_level() {
        let mut logger = Logger::new();
        logger.log_info("indexed 3 pk3s");
        logger.log_warning("missing texture");
        assert_eq!(logger.get_messages(Level::Warning), vec!["WARNING: missing texture"]);
        assert_eq!(logger.get_messages(Level::Info).len(), 2);
    }
}

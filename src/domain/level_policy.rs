use super::log_level::LogLevel;

/// Outcome of applying the two thresholds to a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decision {
    pub print: bool,
    pub send: bool,
}

/// Independent print and send thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPolicy {
    pub send_level: LogLevel,
    pub print_level: LogLevel,
}

impl LevelPolicy {
    pub fn new(send_level: LogLevel, print_level: LogLevel) -> Self {
        Self {
            send_level,
            print_level,
        }
    }

    pub fn decide(&self, level: LogLevel) -> Decision {
        Decision {
            print: level >= self.print_level,
            send: level >= self.send_level,
        }
    }

    /// True when the record has to reach the dispatcher at all.
    pub fn admits(&self, level: LogLevel) -> bool {
        let decision = self.decide(level);
        decision.print || decision.send
    }
}

use std::fmt;

/// Why the store holds what it holds.
///
/// Lets callers tell "defaults because this is a fresh install" apart from
/// "defaults because storage was unreadable".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Durable backend, nothing read yet.
    Pending,
    /// Non-durable backend; the seed is the data.
    Ephemeral,
    /// At least one collection was missing and was seeded and written back.
    Seeded { servers: bool, settings: bool },
    /// Both collections came from storage.
    Restored,
    /// Storage could not be read or parsed; running on the seed.
    Recovered { error: String },
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ephemeral => "ephemeral",
            Self::Seeded { .. } => "seeded",
            Self::Restored => "restored",
            Self::Recovered { .. } => "recovered",
        }
    }

    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seeded { servers, settings } => {
                write!(f, "seeded servers={} settings={}", servers, settings)
            }
            Self::Recovered { error } => write!(f, "recovered from: {}", error),
            other => f.write_str(other.as_str()),
        }
    }
}

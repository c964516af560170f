/// Connectivity as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkState {
    /// No network at all.
    #[default]
    Disconnected,
    /// Only a metered network (mobile data) is available.
    Metered,
    /// An unmetered network (Wi-Fi, ethernet) is available.
    Unmetered,
}

impl NetworkState {
    /// True when the only available network is metered.
    #[must_use]
    pub const fn is_metered_only(&self) -> bool {
        matches!(self, Self::Metered)
    }
}

impl std::fmt::Display for NetworkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Metered => write!(f, "Metered"),
            Self::Unmetered => write!(f, "Unmetered"),
        }
    }
}

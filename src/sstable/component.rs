use std::fmt;

/// One physical file of an sstable. `Data` and `Index` are mandatory for a
/// set to be usable; the rest are auxiliary and may be absent in legacy
/// layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    Data,
    Index,
    Filter,
    Statistics,
    Summary,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Data,
        Component::Index,
        Component::Filter,
        Component::Statistics,
        Component::Summary,
    ];

    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Data => "Data.db",
            Self::Index => "Index.db",
            Self::Filter => "Filter.db",
            Self::Statistics => "Statistics.db",
            Self::Summary => "Summary.db",
        }
    }

    pub fn parse(s: &str) -> Option<Component> {
        match s {
            "Data.db" => Some(Self::Data),
            "Index.db" => Some(Self::Index),
            "Filter.db" => Some(Self::Filter),
            "Statistics.db" => Some(Self::Statistics),
            "Summary.db" => Some(Self::Summary),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Data => "Data",
            Self::Index => "Index",
            Self::Filter => "Filter",
            Self::Statistics => "Statistics",
            Self::Summary => "Summary",
        };
        write!(f, "{}", name)
    }
}

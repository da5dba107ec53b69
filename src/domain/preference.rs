// src/domain/preference.rs

/// Bounded numeric setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekbarInfo {
    pub key: &'static str,
    pub default: i32,
    pub min: i32,
    pub max: i32,
}

/// Setting restricted to a fixed set of choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListInfo {
    pub key: &'static str,
    pub values: &'static [&'static str],
    pub default: &'static str,
}

pub const MAX_ITEMS: SeekbarInfo = SeekbarInfo {
    key: "maxItems",
    default: 4,
    min: 1,
    max: 10,
};

pub const MAX_LINES: SeekbarInfo = SeekbarInfo {
    key: "maxLines",
    default: 8,
    min: 1,
    max: 10,
};

pub const VIEW: ListInfo = ListInfo {
    key: "view",
    values: &["list", "grid"],
    default: "list",
};

pub const THEME: ListInfo = ListInfo {
    key: "theme",
    values: &["dark", "light", "followSystem"],
    default: "followSystem",
};

pub const DATE_FORMAT: ListInfo = ListInfo {
    key: "dateFormat",
    values: &["none", "relative", "absolute"],
    default: "relative",
};

pub const TEXT_SIZE: ListInfo = ListInfo {
    key: "textSize",
    values: &["small", "medium", "large"],
    default: "medium",
};

pub const SEEKBARS: &[SeekbarInfo] = &[MAX_ITEMS, MAX_LINES];
pub const LISTS: &[ListInfo] = &[VIEW, THEME, DATE_FORMAT, TEXT_SIZE];

/// A setting definition looked up by key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Seekbar(SeekbarInfo),
    List(ListInfo),
}

impl Preference {
    pub fn find(key: &str) -> Option<Preference> {
        SEEKBARS
            .iter()
            .find(|info| info.key == key)
            .map(|info| Preference::Seekbar(*info))
            .or_else(|| {
                LISTS
                    .iter()
                    .find(|info| info.key == key)
                    .map(|info| Preference::List(*info))
            })
    }
}

impl SeekbarInfo {
    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl ListInfo {
    pub fn accepts(&self, value: &str) -> bool {
        self.values.contains(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_known_keys_when_finding_then_returns_matching_kind() {
        assert_eq!(Preference::find("maxItems"), Some(Preference::Seekbar(MAX_ITEMS)));
        assert_eq!(Preference::find("theme"), Some(Preference::List(THEME)));
        assert_eq!(Preference::find("fontFamily"), None);
    }

    #[test]
    fn given_definitions_when_checking_defaults_then_defaults_are_valid() {
        for info in SEEKBARS {
            assert!(info.contains(info.default), "{} default out of range", info.key);
        }
        for info in LISTS {
            assert!(info.accepts(info.default), "{} default not a choice", info.key);
        }
    }
}

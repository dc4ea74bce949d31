use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(SubjectId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageId {
    Home,
    Register,
    Mark,
    Check,
    Admin,
}

impl PageId {
    pub const ALL: [PageId; 5] = [
        PageId::Home,
        PageId::Register,
        PageId::Mark,
        PageId::Check,
        PageId::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PageId::Home => "home",
            PageId::Register => "register",
            PageId::Mark => "mark",
            PageId::Check => "check",
            PageId::Admin => "admin",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PageId::Home => "Home",
            PageId::Register => "Register",
            PageId::Mark => "Mark",
            PageId::Check => "Records",
            PageId::Admin => "Admin",
        }
    }

    /// Pages whose content is derived from synced data and must be recomputed on entry.
    pub fn shows_derived_data(self) -> bool {
        matches!(self, PageId::Check)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown page id '{0}'")]
pub struct UnknownPage(pub String);

impl FromStr for PageId {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageId::ALL
            .into_iter()
            .find(|page| page.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPage(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceOutcome {
    Present,
    Late,
    Absent,
}

impl AttendanceOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceOutcome::Present => "Present",
            AttendanceOutcome::Late => "Late",
            AttendanceOutcome::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown attendance outcome '{0}'")]
pub struct UnknownOutcome(pub String);

impl FromStr for AttendanceOutcome {
    type Err = UnknownOutcome;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceOutcome::Present),
            "late" => Ok(AttendanceOutcome::Late),
            "absent" => Ok(AttendanceOutcome::Absent),
            _ => Err(UnknownOutcome(s.to_string())),
        }
    }
}

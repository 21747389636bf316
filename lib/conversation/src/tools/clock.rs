//! Current-time tool.

use crate::error::ToolError;
use crate::tool::{Tool, ToolSpec};
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use tracing::debug;

/// The `get_current_time` tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentTime;

impl Tool for CurrentTime {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "get_current_time",
            "Get the current time. format_type options: short, long, date, default",
            "format_type",
        )
    }

    fn call(&self, input: &str) -> Result<String, ToolError> {
        Ok(TimeFormat::parse_or_default(input).render(&Local::now()))
    }
}

/// Output formats understood by [`CurrentTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFormat {
    /// `HH:MM`
    Short,
    /// `YYYY-MM-DD HH:MM:SS`
    Long,
    /// `YYYY-MM-DD`
    Date,
    /// `Month DD, YYYY at HH:MM AM/PM`
    #[default]
    Default,
}

impl TimeFormat {
    /// Parses a format name; anything unrecognized is [`TimeFormat::Default`].
    #[must_use]
    pub fn parse_or_default(name: &str) -> Self {
        match name.trim() {
            "short" => Self::Short,
            "long" => Self::Long,
            "date" => Self::Date,
            "default" | "" => Self::Default,
            other => {
                debug!(format_type = other, "unrecognized time format, using default");
                Self::Default
            }
        }
    }

    /// The strftime pattern for this format.
    #[must_use]
    pub const fn pattern(&self) -> &'static str {
        match self {
            Self::Short => "%H:%M",
            Self::Long => "%Y-%m-%d %H:%M:%S",
            Self::Date => "%Y-%m-%d",
            Self::Default => "%B %d, %Y at %I:%M %p",
        }
    }

    /// Formats a timestamp.
    #[must_use]
    pub fn render<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: Display,
    {
        at.format(self.pattern()).to_string()
    }
}

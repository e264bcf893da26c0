use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A group of message metadata that can be copied into a parsed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyGroup {
    System,
    Application,
    Annotations,
}

impl PropertyGroup {
    pub const ALL: [PropertyGroup; 3] = [
        PropertyGroup::System,
        PropertyGroup::Application,
        PropertyGroup::Annotations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyGroup::System => "sys",
            PropertyGroup::Application => "app",
            PropertyGroup::Annotations => "anno",
        }
    }
}

impl fmt::Display for PropertyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyGroup::System => f.write_str("system"),
            PropertyGroup::Application => f.write_str("application"),
            PropertyGroup::Annotations => f.write_str("annotations"),
        }
    }
}

impl FromStr for PropertyGroup {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sys" | "system" => Ok(PropertyGroup::System),
            "app" | "application" => Ok(PropertyGroup::Application),
            "anno" | "annotations" => Ok(PropertyGroup::Annotations),
            _ => Err(ParseError::UnknownPropertyGroup(s.to_string())),
        }
    }
}

/// The set of property groups selected for output.
///
/// Built from selector strings: `sys`, `app`, `anno` (or their long forms)
/// and `all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PropertyGroups {
    groups: BTreeSet<PropertyGroup>,
}

impl PropertyGroups {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            groups: PropertyGroup::ALL.into_iter().collect(),
        }
    }

    pub fn parse<I, S>(selectors: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut groups = Self::none();
        for selector in selectors {
            let selector = selector.as_ref();
            if selector.trim().eq_ignore_ascii_case("all") {
                return Ok(Self::all());
            }
            groups.insert(selector.parse()?);
        }
        Ok(groups)
    }

    pub fn insert(&mut self, group: PropertyGroup) {
        self.groups.insert(group);
    }

    pub fn contains(&self, group: PropertyGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl TryFrom<Vec<String>> for PropertyGroups {
    type Error = ParseError;

    fn try_from(selectors: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(selectors)
    }
}

impl From<PropertyGroups> for Vec<String> {
    fn from(groups: PropertyGroups) -> Self {
        groups
            .groups
            .iter()
            .map(|group| group.as_str().to_string())
            .collect()
    }
}

/// Per-call parsing options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Treat messages as Plug and Play telemetry and read the interface name.
    pub pnp_context: bool,
    /// Interface name the messages are expected to carry.
    pub interface_name: Option<String>,
    pub properties: PropertyGroups,
    /// Content type to assume instead of the one declared on the message.
    pub content_type: Option<String>,
    /// Inject one synthetic issue per severity into every parse.
    pub simulate_errors: bool,
}

impl ParseOptions {
    pub fn with_pnp(mut self, interface_name: Option<&str>) -> Self {
        self.pnp_context = true;
        self.interface_name = interface_name.map(str::to_string);
        self
    }

    pub fn with_properties(mut self, properties: PropertyGroups) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_simulated_errors(mut self) -> Self {
        self.simulate_errors = true;
        self
    }
}

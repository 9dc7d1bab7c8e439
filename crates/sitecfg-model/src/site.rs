//! Sites discovered inside webspaces

use crate::config::NameValuePair;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A hosted application, as summarized by a webspace site listing
///
/// Sites are discovered, never constructed by the engine; the remote store
/// owns the authoritative copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Site {
    /// Site name, unique within a subscription
    pub name: String,
    /// Owning webspace
    #[serde(rename = "WebSpace")]
    pub webspace: String,
    /// Lifecycle state
    #[serde(default)]
    pub state: SiteState,
    /// Whether the site is enabled
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Host names currently serving traffic
    #[serde(default)]
    pub enabled_host_names: Vec<String>,
    /// All host names bound to the site
    #[serde(default)]
    pub host_names: Vec<String>,
    /// Last modification time reported by the service
    #[serde(default)]
    pub last_modified_time_utc: Option<NaiveDateTime>,
    /// Extra properties requested through [`SiteProperty`]
    #[serde(default, rename = "SiteProperties")]
    pub properties: Vec<NameValuePair>,
}

impl Site {
    /// Create a running site summary
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, webspace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            webspace: webspace.into(),
            state: SiteState::Running,
            enabled: Some(true),
            enabled_host_names: Vec::new(),
            host_names: Vec::new(),
            last_modified_time_utc: None,
            properties: Vec::new(),
        }
    }

    /// Add a host name, enabled
    #[inline]
    #[must_use]
    pub fn with_host_name(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.enabled_host_names.push(host.clone());
        self.host_names.push(host);
        self
    }

    /// Set a requested property
    #[inline]
    #[must_use]
    pub fn with_property(mut self, property: SiteProperty, value: impl Into<String>) -> Self {
        self.properties
            .push(NameValuePair::new(property.wire_name(), value));
        self
    }

    /// Site names compare ASCII-case-insensitively
    #[inline]
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Look up a requested property
    #[must_use]
    pub fn property(&self, property: SiteProperty) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(property.wire_name()))
            .and_then(|p| p.value.as_deref())
    }
}

/// Site lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteState {
    /// Serving
    #[default]
    Running,
    /// Stopped by the owner
    Stopped,
    /// Any state this model does not name
    Other(String),
}

impl From<String> for SiteState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Running" => Self::Running,
            "Stopped" => Self::Stopped,
            _ => Self::Other(s),
        }
    }
}

impl From<SiteState> for String {
    fn from(state: SiteState) -> Self {
        match state {
            SiteState::Running => "Running".to_string(),
            SiteState::Stopped => "Stopped".to_string(),
            SiteState::Other(s) => s,
        }
    }
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("Running"),
            Self::Stopped => f.write_str("Stopped"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Optional site properties a listing can be asked to include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteProperty {
    /// Source-control repository URI
    RepositoryUri,
    /// Deployment user name
    PublishingUsername,
    /// Deployment password
    PublishingPassword,
}

impl SiteProperty {
    /// Every property, in the order listings request them
    pub const ALL: [Self; 3] = [
        Self::RepositoryUri,
        Self::PublishingPassword,
        Self::PublishingUsername,
    ];

    /// Value used in the `propertiesToInclude` query parameter
    #[inline]
    #[must_use]
    pub const fn query_value(self) -> &'static str {
        match self {
            Self::RepositoryUri => "repositoryuri",
            Self::PublishingUsername => "publishingusername",
            Self::PublishingPassword => "publishingpassword",
        }
    }

    /// Property name as it appears in a listing
    #[inline]
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::RepositoryUri => "RepositoryUri",
            Self::PublishingUsername => "PublishingUsername",
            Self::PublishingPassword => "PublishingPassword",
        }
    }
}

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Controls whether integrations are installed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Enable {
    /// Always enabled.
    On,
    /// Never enabled.
    Off,
    /// Enabled unless the client runs in debug mode.
    #[default]
    Pass,
}

impl Enable {
    /// Resolves the setting against the debug flag of the client.
    pub fn resolve(self, debug: bool) -> bool {
        match self {
            Self::On => true,
            Self::Off => false,
            Self::Pass => !debug,
        }
    }
}

impl fmt::Display for Enable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("true"),
            Self::Off => f.write_str("false"),
            Self::Pass => f.write_str("pass"),
        }
    }
}

impl Serialize for Enable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::On => serializer.serialize_bool(true),
            Self::Off => serializer.serialize_bool(false),
            Self::Pass => serializer.serialize_str("pass"),
        }
    }
}

impl<'de> Deserialize<'de> for Enable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Bool(true) => Ok(Self::On),
            Repr::Bool(false) => Ok(Self::Off),
            Repr::Str(s) => match s.as_str() {
                "pass" => Ok(Self::Pass),
                "true" => Ok(Self::On),
                "false" => Ok(Self::Off),
                other => Err(serde::de::Error::custom(format!(
                    r#"invalid enable value "{other}": expected true, false or "pass""#
                ))),
            },
        }
    }
}

/// Sources of automatic breadcrumbs.
///
/// Configured either as a boolean or as a map of individual sources. A map is merged over the
/// defaults, `true` selects the defaults and `false` turns off every source.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct AutoBreadcrumbs {
    /// Record outgoing HTTP requests.
    pub xhr: bool,
    /// Record console and log output.
    pub console: bool,
    /// Record UI interaction.
    pub dom: bool,
    /// Record navigation.
    pub location: bool,
    /// Record a breadcrumb for every event sent by the client itself.
    pub sentry: bool,
}

impl AutoBreadcrumbs {
    /// No automatic breadcrumbs at all.
    pub const DISABLED: Self = Self {
        xhr: false,
        console: false,
        dom: false,
        location: false,
        sentry: false,
    };

    /// Returns `true` if any source is enabled.
    pub fn is_enabled(&self) -> bool {
        self.xhr || self.console || self.dom || self.location || self.sentry
    }
}

impl Default for AutoBreadcrumbs {
    fn default() -> Self {
        Self {
            xhr: true,
            console: true,
            dom: true,
            location: true,
            sentry: false,
        }
    }
}

impl<'de> Deserialize<'de> for AutoBreadcrumbs {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Partial {
            xhr: Option<bool>,
            console: Option<bool>,
            dom: Option<bool>,
            location: Option<bool>,
            sentry: Option<bool>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Map(Partial),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bool(true) => Self::default(),
            Repr::Bool(false) => Self::DISABLED,
            Repr::Map(partial) => {
                let defaults = Self::default();
                Self {
                    xhr: partial.xhr.unwrap_or(defaults.xhr),
                    console: partial.console.unwrap_or(defaults.console),
                    dom: partial.dom.unwrap_or(defaults.dom),
                    location: partial.location.unwrap_or(defaults.location),
                    sentry: partial.sentry.unwrap_or(defaults.sentry),
                }
            }
        })
    }
}

/// Instrumentation of user callbacks, configured as a boolean or as a map.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    /// Wrap callbacks handed to timers and event listeners to capture their errors.
    pub try_catch: bool,
}

impl Default for Instrument {
    fn default() -> Self {
        Self { try_catch: true }
    }
}

impl<'de> Deserialize<'de> for Instrument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Partial {
            #[serde(alias = "tryCatch")]
            try_catch: Option<bool>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Map(Partial),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bool(true) => Self::default(),
            Repr::Bool(false) => Self { try_catch: false },
            Repr::Map(partial) => Self {
                try_catch: partial.try_catch.unwrap_or(true),
            },
        })
    }
}

/// Controls the HTTP client used by the built-in transports.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Http {
    /// Timeout for requests to the collector in seconds.
    ///
    /// This covers the whole exchange, from connecting until the response body has been read.
    pub timeout: u32,
    /// Timeout for establishing connections with the collector in seconds.
    #[serde(alias = "connectionTimeout")]
    pub connection_timeout: u32,
}

impl Http {
    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.into())
    }

    /// Returns the connection timeout.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout.into())
    }
}

impl Default for Http {
    fn default() -> Self {
        Self {
            timeout: 5,
            connection_timeout: 3,
        }
    }
}

/// Describes which delivery mechanisms the host environment supports.
///
/// The client picks the first available mechanism in order: fetch, then XHR with CORS, then the
/// legacy cross-domain request.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportCapabilities {
    /// A fetch-style API is available.
    pub fetch: bool,
    /// An XHR-style API is available.
    pub xhr: bool,
    /// The XHR-style API supports cross-origin requests.
    pub cors: bool,
    /// The legacy cross-domain request API is available.
    #[serde(alias = "crossDomainRequest")]
    pub cross_domain_request: bool,
    /// Scheme of the page, used to resolve protocol-relative endpoints.
    #[serde(alias = "pageScheme")]
    pub page_scheme: String,
}

impl Default for TransportCapabilities {
    fn default() -> Self {
        Self {
            fetch: true,
            xhr: true,
            cors: true,
            cross_domain_request: false,
            page_scheme: "https".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_values() {
        assert_eq!(serde_json::from_str::<Enable>("true").unwrap(), Enable::On);
        assert_eq!(serde_json::from_str::<Enable>("false").unwrap(), Enable::Off);
        assert_eq!(
            serde_json::from_str::<Enable>(r#""pass""#).unwrap(),
            Enable::Pass
        );
        assert!(serde_json::from_str::<Enable>(r#""maybe""#).is_err());
    }

    #[test]
    fn test_enable_resolve() {
        assert!(Enable::Pass.resolve(false));
        assert!(!Enable::Pass.resolve(true));
        assert!(Enable::On.resolve(true));
        assert!(!Enable::Off.resolve(false));
    }

    #[test]
    fn test_auto_breadcrumbs_bool() {
        let crumbs: AutoBreadcrumbs = serde_json::from_str("true").unwrap();
        assert_eq!(crumbs, AutoBreadcrumbs::default());
        assert!(!crumbs.sentry);

        let crumbs: AutoBreadcrumbs = serde_json::from_str("false").unwrap();
        assert!(!crumbs.is_enabled());
    }

    #[test]
    fn test_auto_breadcrumbs_merged_over_defaults() {
        let crumbs: AutoBreadcrumbs =
            serde_json::from_str(r#"{"console": false, "sentry": true}"#).unwrap();

        assert_eq!(
            crumbs,
            AutoBreadcrumbs {
                xhr: true,
                console: false,
                dom: true,
                location: true,
                sentry: true,
            }
        );
    }

    #[test]
    fn test_instrument() {
        let instrument: Instrument = serde_json::from_str("false").unwrap();
        assert!(!instrument.try_catch);

        let instrument: Instrument = serde_json::from_str(r#"{"tryCatch": false}"#).unwrap();
        assert!(!instrument.try_catch);

        let instrument: Instrument = serde_json::from_str("{}").unwrap();
        assert!(instrument.try_catch);
    }
}

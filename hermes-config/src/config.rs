use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hermes_common::{
    DEFAULT_MAX_URL_LENGTH, DEFAULT_SERVER, DEFAULT_STACK_TRACE_LIMIT, MAX_BREADCRUMBS,
    Pattern, PatternList,
};
use hermes_protocol::{Object, Request, Value};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{AutoBreadcrumbs, Enable, Http, Instrument, TransportCapabilities};

/// Defines the source of a config error.
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error in the value of a single option.
    Field(&'static str),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    inner: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            inner: None,
        }
    }

    #[inline]
    fn wrap<E>(inner: E, kind: ConfigErrorKind) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            source: ConfigErrorSource::None,
            kind,
            inner: Some(Box::new(inner)),
        }
    }

    #[inline]
    fn for_field<E>(inner: E, field: &'static str) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::wrap(inner, ConfigErrorKind::InvalidValue).field(field)
    }

    #[inline]
    fn file<P: AsRef<Path>>(mut self, p: P) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::Field(name);
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ConfigErrorSource::None => self.kind.fmt(f),
            ConfigErrorSource::File(file_name) => {
                write!(f, "{} (file {})", self.kind, file_name.display())
            }
            ConfigErrorSource::Field(name) => write!(f, "{} (field {})", self.kind, name),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner
            .as_ref()
            .map(|err| err.as_ref() as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// The file extension does not name a supported format.
    #[error("unsupported config file format")]
    UnsupportedFormat,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config file")]
    BadJson,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
}

/// An invalid sample rate.
#[derive(Debug, thiserror::Error)]
#[error("sample rate must be a number between 0 and 1, got {0}")]
pub struct InvalidSampleRate(f64);

enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_server() -> String {
    DEFAULT_SERVER.to_owned()
}

fn default_logger() -> String {
    "rust".to_owned()
}

fn default_max_url_length() -> usize {
    DEFAULT_MAX_URL_LENGTH
}

fn default_stack_trace_limit() -> usize {
    DEFAULT_STACK_TRACE_LIMIT
}

fn default_max_breadcrumbs() -> usize {
    MAX_BREADCRUMBS
}

fn default_sample_rate() -> Option<f64> {
    Some(1.0)
}

/// Accepts the application key as string or number. Empty strings and `0` mean unset.
fn deserialize_app_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Int(i64),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        None | Some(Repr::Int(0)) => None,
        Some(Repr::Str(s)) if s.is_empty() => None,
        Some(Repr::Str(s)) => Some(s),
        Some(Repr::Int(i)) => Some(i.to_string()),
    })
}

/// All recognized options of the client.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// Whether integrations are installed, see [`Enable`].
    pub enable: Enable,

    /// Marks the client as running in a development build.
    ///
    /// Together with [`Enable::Pass`], this disables integrations.
    pub debug: bool,

    /// Base URL of the collector.
    pub server: String,

    /// Identifier of the reporting application, sent as `appKey`.
    #[serde(alias = "appKey", deserialize_with = "deserialize_app_key")]
    pub app_key: Option<String>,

    /// Logger name attached to events that do not name one.
    #[serde(default = "default_logger")]
    pub logger: String,

    /// Messages matching any of these patterns are not reported.
    ///
    /// The browser placeholders for cross-origin script errors are always ignored in addition.
    #[serde(alias = "ignoreErrors")]
    pub ignore_errors: PatternList,

    /// Errors originating from URLs matching these patterns are not reported.
    #[serde(alias = "ignoreUrls")]
    pub ignore_urls: PatternList,

    /// When non-empty, only errors originating from matching URLs are reported.
    #[serde(alias = "whitelistUrls")]
    pub whitelist_urls: PatternList,

    /// When non-empty, only frames with matching file names are marked as in-app.
    #[serde(alias = "includePaths")]
    pub include_paths: PatternList,

    /// Capture uncaught errors through the global error handler integration.
    #[serde(alias = "collectWindowErrors", default = "default_true")]
    pub collect_window_errors: bool,

    /// Capture unhandled promise rejections through the rejection integration.
    #[serde(alias = "captureUnhandledRejections", default = "default_true")]
    pub capture_unhandled_rejections: bool,

    /// Maximum length of messages and exception values. `0` means unlimited.
    #[serde(alias = "maxMessageLength")]
    pub max_message_length: usize,

    /// Maximum length of URLs in request metadata and breadcrumbs.
    #[serde(alias = "maxUrlLength", default = "default_max_url_length")]
    pub max_url_length: usize,

    /// Maximum number of frames in a stack trace.
    #[serde(alias = "stackTraceLimit", default = "default_stack_trace_limit")]
    pub stack_trace_limit: usize,

    /// Sources of automatic breadcrumbs.
    #[serde(alias = "autoBreadcrumbs")]
    pub auto_breadcrumbs: AutoBreadcrumbs,

    /// Instrumentation of user callbacks.
    pub instrument: Instrument,

    /// Fraction of events to send. `None` disables sampling.
    #[serde(alias = "sampleRate", default = "default_sample_rate")]
    pub sample_rate: Option<f64>,

    /// Values of keys matching these patterns are replaced before sending.
    #[serde(alias = "sanitizeKeys")]
    pub sanitize_keys: PatternList,

    /// Report page load timings through the performance integration.
    #[serde(alias = "performanceTiming", default = "default_true")]
    pub performance_timing: bool,

    /// Report page views.
    #[serde(default = "default_true")]
    pub pv: bool,

    /// Send events even if they repeat the previously sent event.
    #[serde(alias = "allowDuplicates")]
    pub allow_duplicates: bool,

    /// Maximum number of breadcrumbs retained. `0` selects the default, values above the hard
    /// limit are capped.
    #[serde(alias = "maxBreadcrumbs", default = "default_max_breadcrumbs")]
    pub max_breadcrumbs: usize,

    /// Attach a synthetic stack trace to every captured message.
    pub stacktrace: bool,

    /// The environment, for example `production`.
    pub environment: Option<String>,

    /// Name of the host, sent as `server_name`.
    #[serde(alias = "serverName")]
    pub server_name: Option<String>,

    /// Additional headers sent with every event.
    pub headers: Object<String>,

    /// Page or process metadata attached to every event.
    pub request: Option<Request>,

    /// Initial tags of the global context.
    pub tags: Object<String>,

    /// Initial extra data of the global context.
    pub extra: Object<Value>,

    /// Initial user of the global context.
    pub user: Option<Object<Value>>,

    /// HTTP client settings.
    pub http: Http,

    /// Delivery mechanisms supported by the host.
    pub transport: TransportCapabilities,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enable: Enable::default(),
            debug: false,
            server: default_server(),
            app_key: None,
            logger: default_logger(),
            ignore_errors: PatternList::default(),
            ignore_urls: PatternList::default(),
            whitelist_urls: PatternList::default(),
            include_paths: PatternList::default(),
            collect_window_errors: true,
            capture_unhandled_rejections: true,
            max_message_length: 0,
            max_url_length: DEFAULT_MAX_URL_LENGTH,
            stack_trace_limit: DEFAULT_STACK_TRACE_LIMIT,
            auto_breadcrumbs: AutoBreadcrumbs::default(),
            instrument: Instrument::default(),
            sample_rate: default_sample_rate(),
            sanitize_keys: PatternList::default(),
            performance_timing: true,
            pv: true,
            allow_duplicates: false,
            max_breadcrumbs: MAX_BREADCRUMBS,
            stacktrace: false,
            environment: None,
            server_name: None,
            headers: Object::new(),
            request: None,
            tags: Object::new(),
            extra: Object::new(),
            user: None,
            http: Http::default(),
            transport: TransportCapabilities::default(),
        }
    }
}

impl Options {
    /// Loads options from a YAML or JSON file, chosen by the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::new(ConfigErrorKind::UnsupportedFormat).file(path))?;

        let f = fs::File::open(path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(path))?;

        let options: Self = match format {
            ConfigFormat::Yaml => serde_yaml::from_reader(io::BufReader::new(f))
                .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml).file(path))?,
            ConfigFormat::Json => serde_json::from_reader(io::BufReader::new(f))
                .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson).file(path))?,
        };

        options.validate().map_err(|e| e.file(path))?;
        Ok(options)
    }

    /// Creates options from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_value(value)
            .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::BadJson))?;

        options.validate()?;
        Ok(options)
    }

    /// Checks values that cannot be validated during deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.server).map_err(|err| ConfigError::for_field(err, "server"))?;

        if let Some(rate) = self.sample_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::for_field(InvalidSampleRate(rate), "sample_rate"));
            }
        }

        Ok(())
    }

    /// Returns the effective breadcrumb limit.
    ///
    /// A limit of `0` selects the default of 100. Larger limits are capped at 100.
    pub fn breadcrumb_limit(&self) -> usize {
        match self.max_breadcrumbs {
            0 => MAX_BREADCRUMBS,
            limit => limit.min(MAX_BREADCRUMBS),
        }
    }

    /// Returns the error filter including the built-in placeholder messages that browsers report
    /// for cross-origin script errors.
    pub fn effective_ignore_errors(&self) -> PatternList {
        let mut patterns = self.ignore_errors.clone();
        patterns.push(Pattern::regex(r"^Script error\.?$"));
        patterns.push(Pattern::regex(r"^Javascript error: Script error\.? on line 0$"));
        patterns
    }

    /// Returns whether integrations should be installed.
    pub fn is_enabled(&self) -> bool {
        self.enable.resolve(self.debug)
    }
}

//! The processing pass from an assembled event to the collector.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use hermes_common::{
    ERROR_REPORT_PATH, PAGE_VIEW_PATH, PAYLOAD_CONTENT_TYPE, PatternList, USER_HEADER,
    duration_millis,
};
use hermes_config::Options;
use hermes_log::LogError;
use hermes_normalization::trim_event;
use hermes_pii::Sanitizer;
use hermes_protocol::{Breadcrumb, Event, EventId, Level, Object, Value, Values};
use parking_lot::{Mutex, MutexGuard};

use crate::backoff::BackoffController;
use crate::breadcrumbs::{self, BreadcrumbBuffer, BreadcrumbCallback};
use crate::capture::RawException;
use crate::context::GlobalContext;
use crate::dedup::{self, DedupKey};
use crate::identity::obfuscate_username;
use crate::integration::Integration;
use crate::notify::{Notification, Notifier};
use crate::sampling::Sampler;
use crate::transport::{HttpClient, Transport, TransportRequest, negotiate};

/// Key of the additional data entry holding the client's uptime in milliseconds.
const SESSION_DURATION_KEY: &str = "session:duration";

/// Callback that may replace an event before it is sent.
///
/// Returning `None` keeps the event unchanged.
pub type DataCallback = Arc<dyn Fn(&Event) -> Option<Event> + Send + Sync>;

/// Callback that decides whether an event is sent.
pub type ShouldSendCallback = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Why an event was not handed to the transport.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DropReason {
    /// The event matched an ignore or allow filter.
    Filtered,
    /// The event was empty after processing.
    Empty,
    /// A should-send callback declined the event.
    Declined,
    /// The collector requested a backoff that is still active.
    BackedOff,
    /// The event lost the sampling draw.
    Sampled,
    /// The event repeats the last event that was sent.
    Duplicate,
    /// No valid collector endpoint is configured.
    NotConfigured,
    /// The host supports no delivery mechanism.
    NoTransport,
}

impl DropReason {
    /// Returns the name of the reason for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Filtered => "filtered",
            Self::Empty => "empty",
            Self::Declined => "declined",
            Self::BackedOff => "backed_off",
            Self::Sampled => "sampled",
            Self::Duplicate => "duplicate",
            Self::NotConfigured => "not_configured",
            Self::NoTransport => "no_transport",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a capture.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SendOutcome {
    /// The collector accepted the event.
    Sent(EventId),
    /// The event was handed to the transport, but delivery failed.
    Failed(EventId),
    /// The event was dropped before reaching the transport.
    Dropped(DropReason),
}

impl SendOutcome {
    /// Returns the identifier of the event, if it reached the transport.
    pub fn event_id(&self) -> Option<EventId> {
        match self {
            Self::Sent(id) | Self::Failed(id) => Some(*id),
            Self::Dropped(_) => None,
        }
    }

    /// Returns `true` if the collector accepted the event.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    /// Returns the reason if the event was dropped.
    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Self::Dropped(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Collector endpoints derived from the configured server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Endpoints {
    pub error: String,
    pub view: String,
}

impl Endpoints {
    /// Returns `None` if the server is not a valid URL.
    pub fn from_server(server: &str) -> Option<Self> {
        url::Url::parse(server).ok()?;
        let base = server.trim_end_matches('/');

        Some(Self {
            error: format!("{base}{ERROR_REPORT_PATH}"),
            view: format!("{base}{PAGE_VIEW_PATH}"),
        })
    }
}

/// Mutable state of a client.
pub(crate) struct PipelineState {
    pub options: Options,
    pub endpoints: Option<Endpoints>,
    pub username: Option<String>,
    pub identity: String,
    pub context: GlobalContext,
    pub breadcrumbs: BreadcrumbBuffer,
    pub breadcrumb_callbacks: Vec<BreadcrumbCallback>,
    pub data_callbacks: Vec<DataCallback>,
    pub should_send_callbacks: Vec<ShouldSendCallback>,
    pub ignore_errors: PatternList,
    pub sanitizer: Sanitizer,
    pub sampler: Sampler,
    pub backoff: BackoffController,
    pub last_sent: Option<DedupKey>,
    pub last_event_id: Option<EventId>,
    pub last_exception: Option<Arc<RawException>>,
    pub http_client: Option<HttpClient>,
    pub negotiated_transport: Option<Arc<dyn Transport>>,
    pub custom_transport: Option<Arc<dyn Transport>>,
    pub integrations: Vec<Arc<dyn Integration>>,
    /// Number of integrations that have been set up, in registration order.
    pub integrations_setup: usize,
    pub installed: bool,
    not_configured_logged: bool,
}

impl PipelineState {
    pub fn new(options: Options) -> Self {
        let mut state = Self {
            options: Options::default(),
            endpoints: None,
            username: None,
            identity: obfuscate_username(None),
            context: GlobalContext::default(),
            breadcrumbs: BreadcrumbBuffer::default(),
            breadcrumb_callbacks: Vec::new(),
            data_callbacks: Vec::new(),
            should_send_callbacks: Vec::new(),
            ignore_errors: PatternList::default(),
            sanitizer: Sanitizer::default(),
            sampler: Sampler::new(),
            backoff: BackoffController::new(),
            last_sent: None,
            last_event_id: None,
            last_exception: None,
            http_client: None,
            negotiated_transport: None,
            custom_transport: None,
            integrations: Vec::new(),
            integrations_setup: 0,
            installed: false,
            not_configured_logged: false,
        };

        state.apply_options(options);
        state
    }

    /// Replaces the options and everything derived from them.
    ///
    /// Context from the options replaces the global context where it is set.
    pub fn apply_options(&mut self, options: Options) {
        if !options.tags.is_empty() {
            self.context.tags = options.tags.clone();
        }
        if !options.extra.is_empty() {
            self.context.extra = options.extra.clone();
        }
        if options.user.is_some() {
            self.context.set_user(options.user.clone());
        }

        self.endpoints = Endpoints::from_server(&options.server);
        if self.endpoints.is_none() {
            hermes_log::error!(server = %options.server, "invalid collector server");
        }

        self.ignore_errors = options.effective_ignore_errors();
        self.sanitizer = Sanitizer::new(options.sanitize_keys.clone());
        self.breadcrumbs.set_max(options.breadcrumb_limit());
        self.http_client = match HttpClient::new(&options.http) {
            Ok(client) => Some(client),
            Err(error) => {
                hermes_log::error!(error = %LogError(&error), "could not create http client");
                None
            }
        };
        self.negotiated_transport = self
            .http_client
            .as_ref()
            .and_then(|client| negotiate_transport(&options, client));
        self.options = options;
    }

    /// Sets the user name and resets the backoff.
    pub fn set_username(&mut self, username: Option<String>) {
        self.username = username.filter(|name| !name.is_empty());
        self.identity = obfuscate_username(self.username.as_deref());
        self.backoff.reset();
    }

    /// Returns the error endpoint, logging once if none is configured.
    pub fn error_endpoint(&mut self) -> Option<String> {
        if let Some(endpoints) = &self.endpoints {
            return Some(endpoints.error.clone());
        }

        if !self.not_configured_logged {
            self.not_configured_logged = true;
            hermes_log::error!("client has not been configured");
        }
        None
    }

    /// Returns the transport set by the user, or the negotiated one.
    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.custom_transport
            .clone()
            .or_else(|| self.negotiated_transport.clone())
    }

    /// Returns the headers sent with every request to the collector.
    pub fn request_headers(&self) -> Object<String> {
        let mut headers = self.options.headers.clone();
        headers.insert("content-type".to_owned(), PAYLOAD_CONTENT_TYPE.to_owned());
        headers.insert(USER_HEADER.to_owned(), self.identity.clone());
        headers
    }
}

fn negotiate_transport(options: &Options, client: &HttpClient) -> Option<Arc<dyn Transport>> {
    match negotiate(&options.transport, client) {
        Ok(transport) => Some(transport),
        Err(error) => {
            hermes_log::error!(error = %LogError(&error), "could not select transport");
            None
        }
    }
}

/// Copies summary fields of the first exception to the top level of the event.
///
/// The location is taken from the newest frame with both a line and a column.
fn fill_summary(event: &mut Event) {
    let Some(exception) = event.first_exception() else {
        return;
    };

    let ty = exception.ty.clone();
    let value = exception.value.clone();
    let location = exception.stacktrace.as_ref().and_then(|stacktrace| {
        stacktrace
            .frames
            .iter()
            .rev()
            .find(|frame| {
                frame.lineno.is_some_and(|line| line > 0) && frame.colno.is_some_and(|col| col > 0)
            })
            .map(|frame| (frame.lineno, frame.colno, frame.filename.clone()))
    });

    if let Some((line_no, col_no, file)) = location {
        event.line_no = line_no;
        event.col_no = col_no;
        event.file = file;
    }

    event.ty = ty;
    event.message = value;
}

/// Creates the breadcrumb recording that an event was sent.
fn sentry_breadcrumb(event: &Event) -> Breadcrumb {
    let message = match event.first_exception() {
        Some(exception) => exception.prefixed_value(),
        None => event.message.clone().unwrap_or_default(),
    };

    Breadcrumb {
        message: Some(message),
        event_id: event.event_id,
        level: Some(event.level.unwrap_or(Level::Error)),
        ..Default::default()
    }
}

/// Shared core of a [`Client`](crate::Client).
pub(crate) struct Pipeline {
    state: Mutex<PipelineState>,
    notifier: Notifier,
    start: Instant,
}

impl Pipeline {
    pub fn new(options: Options) -> Self {
        Self {
            state: Mutex::new(PipelineState::new(options)),
            notifier: Notifier::new(),
            start: Instant::now(),
        }
    }

    /// Locks the state. The guard must not be held across await points or callbacks.
    pub fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Records a breadcrumb, running the breadcrumb callbacks outside of the lock.
    pub fn record_breadcrumb(&self, crumb: Breadcrumb) -> bool {
        let callbacks = self.state().breadcrumb_callbacks.clone();

        match breadcrumbs::process_breadcrumb(crumb, &callbacks) {
            Some(crumb) => {
                self.state().breadcrumbs.push(crumb);
                true
            }
            None => false,
        }
    }

    /// Merges the global context, scrubs and bounds the event.
    fn prepare(&self, state: &PipelineState, mut event: Event) -> Event {
        let mut tags = state.context.tags.clone();
        tags.append(&mut event.tags);
        event.tags = tags;

        let mut extra = state.context.extra.clone();
        extra.append(&mut event.extra);
        event.extra = extra;
        event.extra.insert(
            SESSION_DURATION_KEY.to_owned(),
            Value::from(duration_millis(self.start.elapsed())),
        );

        if event.user.is_none() {
            event.user = state.context.user.clone();
        }

        if !state.breadcrumbs.is_empty() {
            event.breadcrumbs = Some(Values::new(state.breadcrumbs.snapshot()));
        }

        if event.request.is_none() {
            event.request = state.options.request.clone();
        }
        if event.logger.is_none() {
            event.logger = Some(state.options.logger.clone());
        }

        let options = &state.options;
        if state.username.is_some() {
            event.username = state.username.clone();
        }
        if options.app_key.is_some() {
            event.app_key = options.app_key.clone();
        }
        if options.environment.is_some() {
            event.environment = options.environment.clone();
        }
        if options.server_name.is_some() {
            event.server_name = options.server_name.clone();
        }

        state.sanitizer.sanitize_event(&mut event);
        trim_event(&mut event, options.max_message_length, options.max_url_length);
        event.prune_empty();
        event
    }

    /// Runs an assembled event through the pipeline and hands it to the transport.
    pub async fn process(&self, event: Event) -> SendOutcome {
        let (mut event, data_callbacks, should_send_callbacks) = {
            let state = self.state();
            let event = self.prepare(&state, event);
            (
                event,
                state.data_callbacks.clone(),
                state.should_send_callbacks.clone(),
            )
        };

        for callback in &data_callbacks {
            if let Some(replacement) = callback(&event) {
                event = replacement;
            }
        }

        if event.is_empty() {
            return SendOutcome::Dropped(DropReason::Empty);
        }

        if !should_send_callbacks.iter().all(|callback| callback(&event)) {
            hermes_log::debug!("event declined by callback");
            return SendOutcome::Dropped(DropReason::Declined);
        }

        let (event_id, request, transport, dedup_key, crumb) = {
            let mut state = self.state();

            if state.backoff.should_backoff() {
                hermes_log::warn!("dropped event due to backoff");
                return SendOutcome::Dropped(DropReason::BackedOff);
            }

            let sample_rate = state.options.sample_rate;
            if !state.sampler.admit(sample_rate) {
                return SendOutcome::Dropped(DropReason::Sampled);
            }

            let Some(url) = state.error_endpoint() else {
                return SendOutcome::Dropped(DropReason::NotConfigured);
            };

            trim_event(
                &mut event,
                state.options.max_message_length,
                state.options.max_url_length,
            );

            let event_id = *event.event_id.get_or_insert_with(EventId::new);
            state.last_event_id = Some(event_id);

            if !state.options.allow_duplicates
                && dedup::is_repeat(&event, state.last_sent.as_ref())
            {
                hermes_log::warn!(%event_id, "dropped repeat event");
                return SendOutcome::Dropped(DropReason::Duplicate);
            }

            let Some(transport) = state.transport() else {
                hermes_log::error!(%event_id, "no transport available");
                return SendOutcome::Dropped(DropReason::NoTransport);
            };

            let dedup_key = DedupKey::from_event(&event);
            fill_summary(&mut event);

            let crumb = state
                .options
                .auto_breadcrumbs
                .sentry
                .then(|| sentry_breadcrumb(&event));

            let request = TransportRequest {
                url,
                event: Arc::new(event),
                headers: state.request_headers(),
            };

            (event_id, request, transport, dedup_key, crumb)
        };

        if let Some(crumb) = crumb {
            self.record_breadcrumb(crumb);
        }

        let event = Arc::clone(&request.event);
        let url = request.url.clone();

        hermes_log::debug!(
            %event_id,
            transport = transport.name(),
            payload = ?event,
            "sending event"
        );

        match transport.send(request).await {
            Ok(()) => {
                {
                    let mut state = self.state();
                    state.backoff.on_success();
                    state.last_sent = Some(dedup_key);
                }

                self.notifier.notify(Notification::Success { event, url });
                SendOutcome::Sent(event_id)
            }
            Err(error) => {
                hermes_log::error!(
                    %event_id,
                    error = %LogError(&error),
                    "transport failed to send event"
                );

                self.state()
                    .backoff
                    .on_failure(error.status(), error.retry_after());

                self.notifier.notify(Notification::Failure {
                    event,
                    url,
                    error: error.to_string(),
                });
                SendOutcome::Failed(event_id)
            }
        }
    }
}

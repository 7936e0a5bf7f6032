use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hermes_common::{PatternList, duration_millis};
use hermes_config::Options;
use hermes_normalization::{RawStacktrace, StacktraceNormalizer};
use hermes_protocol::{
    Breadcrumb, Event, EventId, Exception, Frame, Object, Stacktrace, Value, Values,
};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::capture::{
    CaptureKind, CaptureOptions, CaptureRequest, ExceptionValue, RawException, keys_fingerprint,
    serialize_exception, serialize_keys_for_message,
};
use crate::context::GlobalContext;
use crate::integration::Integration;
use crate::notify::Notification;
use crate::pipeline::{
    DataCallback, DropReason, Pipeline, PipelineState, SendOutcome, ShouldSendCallback,
};
use crate::transport::{Transport, TransportError};
use crate::{BreadcrumbAction, BreadcrumbCallback};

/// Name of the page view event understood by the collector.
const PAGE_VIEW_EVENT: &str = "_page";

/// An error returned when reporting views.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// No valid collector endpoint is configured.
    #[error("client has not been configured")]
    NotConfigured,

    /// Page view reporting is disabled in the options.
    #[error("page view reporting is disabled")]
    Disabled,

    /// The view could not be delivered.
    #[error("could not send view")]
    Transport(#[from] TransportError),
}

#[derive(Serialize)]
struct PageView<'a> {
    event: &'static str,
    duration: u64,
    tag: &'a str,
}

/// The telemetry client.
///
/// The client collects exceptions, messages and breadcrumbs and delivers them to the collector.
/// It is cheap to clone; all clones share the same state.
///
/// ```no_run
/// # async fn run() {
/// use hermes_client::{CaptureOptions, Client, RawException};
/// use hermes_config::Options;
///
/// let client = Client::new(Options::default());
/// client.set_username(Some("jane"));
///
/// let outcome = client
///     .capture_exception(RawException::new("TypeError", "x is undefined"), CaptureOptions::default())
///     .await;
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pipeline: Arc<Pipeline>,
}

impl Client {
    /// Creates a client with the given options.
    ///
    /// The collector endpoint and transport are derived from the options. Invalid servers are
    /// logged; captures are then dropped until the client is reconfigured.
    pub fn new(options: Options) -> Self {
        Self {
            pipeline: Arc::new(Pipeline::new(options)),
        }
    }

    fn state(&self) -> parking_lot::MutexGuard<'_, PipelineState> {
        self.pipeline.state()
    }

    /// Reconfigures the client with a user name and a new set of options.
    pub fn config(&self, username: Option<&str>, options: Options) {
        if username.is_none_or(str::is_empty) {
            hermes_log::warn!("username should be configured");
        }

        let mut state = self.state();
        state.apply_options(options);
        state.set_username(username.map(str::to_owned));
    }

    /// Sets the user name reported with every event and resets the backoff.
    pub fn set_username(&self, username: Option<&str>) {
        self.state().set_username(username.map(str::to_owned));
    }

    /// Returns a copy of the current options.
    pub fn options(&self) -> Options {
        self.state().options.clone()
    }

    /// Installs all registered integrations.
    ///
    /// Integrations are only installed if the client is enabled and configured. Returns `true`
    /// if the client is installed afterwards.
    pub fn install(&self) -> bool {
        let pending = {
            let mut state = self.state();
            if state.installed {
                return true;
            }
            if !state.options.is_enabled() || state.error_endpoint().is_none() {
                return false;
            }

            state.installed = true;
            take_pending(&mut state)
        };

        self.setup_integrations(pending);
        true
    }

    /// Removes all installed integrations.
    pub fn uninstall(&self) {
        let installed = {
            let mut state = self.state();
            let count = state.integrations_setup;
            state.installed = false;
            state.integrations_setup = 0;
            state.integrations[..count].to_vec()
        };

        for integration in installed.iter().rev() {
            hermes_log::debug!(integration = integration.name(), "removing integration");
            integration.teardown(self);
        }
    }

    /// Returns `true` if [`install`](Self::install) succeeded and the client was not uninstalled.
    pub fn is_installed(&self) -> bool {
        self.state().installed
    }

    /// Registers an integration. It is set up immediately if the client is installed.
    pub fn add_integration<I>(&self, integration: I)
    where
        I: Integration + 'static,
    {
        let pending = {
            let mut state = self.state();
            state.integrations.push(Arc::new(integration));
            if !state.installed {
                return;
            }
            take_pending(&mut state)
        };

        self.setup_integrations(pending);
    }

    fn setup_integrations(&self, integrations: Vec<Arc<dyn Integration>>) {
        for integration in integrations {
            hermes_log::debug!(integration = integration.name(), "setting up integration");
            integration.setup(self);
        }
    }

    /// Sets the user reported with every event. `None` removes the user.
    pub fn set_user_context(&self, user: Option<Object<Value>>) {
        self.state().context.set_user(user);
    }

    /// Merges additional data into the global context. `None` removes all data.
    pub fn set_extra_context(&self, extra: Option<Object<Value>>) {
        self.state().context.merge_extra(extra);
    }

    /// Merges tags into the global context. `None` removes all tags.
    pub fn set_tags_context(&self, tags: Option<Object<String>>) {
        self.state().context.merge_tags(tags);
    }

    /// Removes the user, tags and additional data from the global context.
    pub fn clear_context(&self) {
        self.state().context.clear();
    }

    /// Returns a copy of the global context.
    pub fn get_context(&self) -> GlobalContext {
        self.state().context.clone()
    }

    /// Sets the environment reported with every event.
    pub fn set_environment(&self, environment: Option<String>) {
        self.state().options.environment = environment;
    }

    /// Adds a callback that may replace events before they are sent.
    ///
    /// Callbacks run in registration order, each receiving the result of the previous one.
    pub fn set_data_callback<F>(&self, callback: F)
    where
        F: Fn(&Event) -> Option<Event> + Send + Sync + 'static,
    {
        let callback: DataCallback = Arc::new(callback);
        self.state().data_callbacks.push(callback);
    }

    /// Adds a callback that inspects breadcrumbs before they are recorded.
    pub fn set_breadcrumb_callback<F>(&self, callback: F)
    where
        F: Fn(&Breadcrumb) -> BreadcrumbAction + Send + Sync + 'static,
    {
        let callback: BreadcrumbCallback = Arc::new(callback);
        self.state().breadcrumb_callbacks.push(callback);
    }

    /// Adds a callback that decides whether an event is sent.
    ///
    /// An event is dropped if any callback returns `false`.
    pub fn set_should_send_callback<F>(&self, callback: F)
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let callback: ShouldSendCallback = Arc::new(callback);
        self.state().should_send_callbacks.push(callback);
    }

    /// Replaces the negotiated transport. `None` restores it.
    pub fn set_transport(&self, transport: Option<Arc<dyn Transport>>) {
        self.state().custom_transport = transport;
    }

    /// Returns the last exception passed to [`capture_exception`](Self::capture_exception).
    pub fn last_exception(&self) -> Option<Arc<RawException>> {
        self.state().last_exception.clone()
    }

    /// Returns the identifier of the last event that passed sampling and backoff.
    pub fn last_event_id(&self) -> Option<EventId> {
        self.state().last_event_id
    }

    /// Returns `true` if a valid collector endpoint is configured.
    pub fn is_setup(&self) -> bool {
        self.state().error_endpoint().is_some()
    }

    /// Subscribes to notifications of the capture pipeline.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.pipeline.notifier().subscribe()
    }

    /// Reports an arbitrary view to the view endpoint.
    ///
    /// The data is sent as base64-encoded JSON in the `data` query parameter.
    pub async fn report_url_view<T>(&self, data: &T) -> Result<(), ViewError>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_vec(data).map_err(TransportError::from)?;
        let encoded = data_encoding::BASE64.encode(&json);

        let (url, identity, client) = {
            let mut state = self.state();
            if state.error_endpoint().is_none() {
                return Err(ViewError::NotConfigured);
            }
            let (Some(endpoints), Some(client)) =
                (state.endpoints.clone(), state.http_client.clone())
            else {
                return Err(ViewError::NotConfigured);
            };
            (endpoints.view, state.identity.clone(), client)
        };

        let response = client
            .inner()
            .get(url)
            .query(&[("data", encoded)])
            .header(hermes_common::USER_HEADER, identity)
            .send()
            .await
            .map_err(TransportError::from)?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                status: response.status().as_u16(),
                retry_after: None,
            }
            .into());
        }

        Ok(())
    }

    /// Reports a visit of `page` that lasted `duration`.
    pub async fn report_page_view(&self, page: &str, duration: Duration) -> Result<(), ViewError> {
        if !self.state().options.pv {
            return Err(ViewError::Disabled);
        }

        let view = PageView {
            event: PAGE_VIEW_EVENT,
            duration: duration_millis(duration),
            tag: page,
        };

        self.report_url_view(&view).await
    }

    /// Records a breadcrumb. Returns `true` if no callback discarded it.
    pub fn capture_breadcrumb(&self, crumb: Breadcrumb) -> bool {
        self.pipeline.record_breadcrumb(crumb)
    }

    /// Captures a request submitted by instrumentation.
    pub async fn capture(&self, request: CaptureRequest) -> SendOutcome {
        let CaptureRequest { kind, options } = request;
        match kind {
            CaptureKind::Exception(exception) => {
                self.capture_exception(ExceptionValue::Error(exception), options)
                    .await
            }
            CaptureKind::Message(message) => self.capture_message(message, options).await,
            CaptureKind::PlainObject(object) => {
                self.capture_exception(ExceptionValue::PlainObject(object), options)
                    .await
            }
        }
    }

    /// Captures an exception.
    ///
    /// Plain objects are grouped by their keys. Other values are captured as messages with a
    /// synthetic stack trace.
    pub async fn capture_exception(
        &self,
        value: impl Into<ExceptionValue>,
        mut options: CaptureOptions,
    ) -> SendOutcome {
        let (exception, message) = match value.into() {
            ExceptionValue::Error(exception) => (exception, None),
            ExceptionValue::PlainObject(object) => {
                let keys: Vec<&str> = object.keys().map(String::as_str).collect();
                let message = format!(
                    "Non-Error exception captured with keys: {}",
                    serialize_keys_for_message(&keys)
                );

                options.fingerprint = Some(vec![keys_fingerprint(&keys)]);
                options
                    .extra
                    .insert("__serialized__".to_owned(), serialize_exception(&object));

                let exception = RawException::new("Error", message.clone())
                    .with_stacktrace(RawStacktrace::capture());
                (exception, Some(message))
            }
            ExceptionValue::Other(text) => {
                options.stacktrace = Some(true);
                options.trim_head_frames += 1;
                return self.capture_message(text, options).await;
            }
        };

        let exception = Arc::new(exception);
        self.state().last_exception = Some(Arc::clone(&exception));
        self.pipeline.notifier().notify(Notification::Handled {
            exception: Arc::clone(&exception),
        });

        let event = {
            let state = self.state();
            build_exception_event(&state, &exception, options, message)
        };

        match event {
            Ok(event) => self.pipeline.process(event).await,
            Err(reason) => SendOutcome::Dropped(reason),
        }
    }

    /// Captures a message.
    ///
    /// A synthetic stack trace is attached if enabled in the options or for this capture.
    pub async fn capture_message(
        &self,
        message: impl Into<String>,
        options: CaptureOptions,
    ) -> SendOutcome {
        let message = message.into();

        let (with_trace, needs_url) = {
            let state = self.state();
            if state.ignore_errors.is_match(&message) {
                return SendOutcome::Dropped(DropReason::Filtered);
            }

            let with_trace = state.options.stacktrace || options.stacktrace == Some(true);
            let needs_url =
                !state.options.ignore_urls.is_empty() || !state.options.whitelist_urls.is_empty();
            (with_trace, needs_url)
        };

        let stack = (with_trace || needs_url).then(RawStacktrace::capture);

        let event = {
            let state = self.state();
            build_message_event(&state, message, stack.as_ref(), with_trace, options)
        };

        match event {
            Ok(event) => self.pipeline.process(event).await,
            Err(reason) => SendOutcome::Dropped(reason),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Client")
            .field("server", &state.options.server)
            .field("username", &state.username)
            .field("installed", &state.installed)
            .finish_non_exhaustive()
    }
}

/// Marks all registered integrations as set up and returns those that were not yet.
fn take_pending(state: &mut PipelineState) -> Vec<Arc<dyn Integration>> {
    let pending = state.integrations[state.integrations_setup..].to_vec();
    state.integrations_setup = state.integrations.len();
    pending
}

/// Returns `true` if the URL passes the ignore and allow lists.
fn is_url_allowed(url: &str, ignore_urls: &PatternList, whitelist_urls: &PatternList) -> bool {
    if ignore_urls.is_match(url) {
        return false;
    }
    whitelist_urls.is_empty() || whitelist_urls.is_match(url)
}

/// Copies per-capture options into the event.
fn apply_capture_options(event: &mut Event, options: CaptureOptions) {
    let CaptureOptions {
        trim_head_frames: _,
        fingerprint,
        extra,
        tags,
        user,
        stacktrace: _,
        level,
        logger,
        culprit,
        event_id,
    } = options;

    if fingerprint.is_some() {
        event.fingerprint = fingerprint;
    }
    event.extra.extend(extra);
    event.tags.extend(tags);
    if user.is_some() {
        event.user = user;
    }
    if level.is_some() {
        event.level = level;
    }
    if logger.is_some() {
        event.logger = logger;
    }
    if culprit.is_some() {
        event.culprit = culprit;
    }
    if event_id.is_some() {
        event.event_id = event_id;
    }
}

fn build_exception_event(
    state: &PipelineState,
    exception: &RawException,
    options: CaptureOptions,
    message: Option<String>,
) -> Result<Event, DropReason> {
    let prefixed = match exception.name.as_str() {
        "" => exception.message.clone(),
        name => format!("{name}: {}", exception.message),
    };

    if state.ignore_errors.is_match(&exception.message) || state.ignore_errors.is_match(&prefixed)
    {
        return Err(DropReason::Filtered);
    }

    let normalizer = StacktraceNormalizer::new(
        &state.options.include_paths,
        state.options.stack_trace_limit,
    );
    let mut frames = normalizer.normalize(&exception.stack, options.trim_head_frames);

    let mut file_url = exception.stack.url.clone();
    let stacktrace = if let Some(newest) = frames.first() {
        file_url = newest.filename.clone().or(file_url);
        frames.reverse();
        Some(Stacktrace::new(frames))
    } else {
        file_url.as_ref().map(|url| {
            Stacktrace::new(vec![Frame {
                filename: Some(url.clone()),
                lineno: exception.stack.lineno,
                in_app: Some(true),
                ..Default::default()
            }])
        })
    };

    let url = file_url.as_deref().unwrap_or_default();
    if !is_url_allowed(
        url,
        &state.options.ignore_urls,
        &state.options.whitelist_urls,
    ) {
        return Err(DropReason::Filtered);
    }

    let mut event = Event {
        message,
        exception: Some(Values::new(vec![Exception {
            ty: Some(exception.name.clone()).filter(|name| !name.is_empty()),
            value: Some(exception.message.clone()),
            stacktrace,
        }])),
        culprit: file_url,
        ..Default::default()
    };

    apply_capture_options(&mut event, options);
    Ok(event)
}

fn build_message_event(
    state: &PipelineState,
    message: String,
    stack: Option<&RawStacktrace>,
    with_trace: bool,
    options: CaptureOptions,
) -> Result<Event, DropReason> {
    let normalizer = StacktraceNormalizer::new(
        &state.options.include_paths,
        state.options.stack_trace_limit,
    );
    let trim_head_frames = options.trim_head_frames + 1;
    let frames = stack
        .map(|stack| normalizer.normalize(stack, trim_head_frames))
        .unwrap_or_default();

    let file_url = frames
        .iter()
        .find(|frame| frame.in_app == Some(true))
        .and_then(|frame| frame.filename.as_deref())
        .unwrap_or_default();

    if !is_url_allowed(
        file_url,
        &state.options.ignore_urls,
        &state.options.whitelist_urls,
    ) {
        return Err(DropReason::Filtered);
    }

    let mut event = Event {
        message: Some(message.clone()),
        ..Default::default()
    };

    if with_trace {
        event.fingerprint = Some(vec![message]);

        let mut frames = frames;
        frames.reverse();
        event.stacktrace = Some(Stacktrace::new(frames));
    }

    apply_capture_options(&mut event, options);
    Ok(event)
}

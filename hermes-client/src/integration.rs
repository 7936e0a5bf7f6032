use crate::Client;

/// Instrumentation that is installed together with the client.
///
/// Integrations hook into their environment in [`setup`](Self::setup) and report through the
/// capture methods of the [`Client`] they receive. They are set up by [`Client::install`], or
/// immediately when added to an installed client.
pub trait Integration: Send + Sync {
    /// A unique name of the integration, used for logging.
    fn name(&self) -> &'static str;

    /// Installs the integration.
    fn setup(&self, client: &Client);

    /// Removes the integration again. Called by [`Client::uninstall`].
    fn teardown(&self, _client: &Client) {}
}

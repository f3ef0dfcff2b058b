//! Notification delivery for the GPU temperature monitor.
//!
//! A [`Notifier`] renders a named template against a context and POSTs it to
//! the webhook, but only while the host can reach the network. Connectivity
//! failures are retried with a fixed delay up to a bound; once the bound is
//! exhausted the host is shut down.

pub mod dispatch;
pub mod probe;
pub mod render;
pub mod shutdown;
pub mod template;
pub mod transport;

pub use dispatch::{Delivery, Notifier, NotifierSettings, RetryState};
pub use probe::{ConnectivityProbe, TcpProbe};
pub use render::render;
pub use shutdown::{CommandShutdown, ShutdownAction};
pub use template::{Template, TemplateStore};
pub use transport::{Transport, WebhookTransport};

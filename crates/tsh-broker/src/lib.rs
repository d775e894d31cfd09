//! tsh-broker
//!
//! Venue side of the console.
//!
//! - [`SessionTransport`] sends orders; execution reports come back
//!   asynchronously through a [`ReportSink`].
//! - [`RestTransport`] covers cancels, balances, order listings and previews.
//! - [`VenueRouter`] combines the two, owns order-entry bookkeeping for
//!   attached stops, and is the [`tsh_oco::ContingencyDispatcher`] used when a
//!   stop fires.
//!
//! Implementations: [`PrimeRestClient`] + [`RestOrderSession`] for the real
//! venue, [`PaperVenue`] for an in-memory one.

mod paper;
mod prime;
mod rest_session;
mod router;
mod sink;
mod transport;
mod types;

pub use paper::PaperVenue;
pub use prime::{PrimeRestClient, RestError};
pub use rest_session::RestOrderSession;
pub use router::VenueRouter;
pub use sink::ReconcilingSink;
pub use transport::{ReportSink, RestTransport, SessionTransport, TransportError};
pub use types::{format_usd, Balance, NewOrder, OrderPreview, OrderSummary, TimeInForce};

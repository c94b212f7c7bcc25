//! Client for the remote appointment workflow.
//!
//! [`StepExecutor`] submits one form step and sniffs the page for success;
//! [`JourneyNavigator`] sequences the type, day, and time steps and extracts
//! their content.

pub mod error;
pub mod extract;
pub mod geocode;
pub mod journey;
mod retry;
pub mod schema;
pub mod step;

pub use error::{ScraperError, StepError};
pub use geocode::{GeocodeError, Geocoder, NominatimGeocoder};
pub use journey::{JourneyNavigator, JourneySession, JourneyState};
pub use schema::{StepKind, StepRequest};
pub use step::{classify_response, HttpStepExecutor, ResponseClass, StepExecutor};

//! RFC 3161 Time-Stamp Protocol, client side.
//!
//! [`TsRequest`] and [`TsResponse`] are the wire messages, [`TimestampToken`]
//! is the TSTInfo carried inside the token's SignedData. A [`Timestamper`]
//! turns a request into a response; [`HttpTimestamper`] does so over HTTP.

pub mod error;
mod http;
mod request;
mod response;
mod token;

pub use error::{Error, Result};
pub use http::{HttpTimestamper, TimestamperConfig};
pub use request::TsRequest;
pub use response::{FailureInfo, PkiStatus, TsResponse};
pub use token::{Accuracy, TimestampToken};

/// Obtains timestamps from a time-stamping authority.
pub trait Timestamper {
    fn generate_timestamp(&self, request: &TsRequest) -> Result<TsResponse>;
}

impl<T: Timestamper + ?Sized> Timestamper for &T {
    fn generate_timestamp(&self, request: &TsRequest) -> Result<TsResponse> {
        (**self).generate_timestamp(request)
    }
}

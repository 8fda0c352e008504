//! Turns decoded GT7 packets into recordings.
//!
//! [`SessionStateMachine`] owns the per-tick lifecycle: gap reconciliation,
//! session start and end, warm-up, lap boundaries and venue inference. It
//! drives any [`LogSink`](gt7_telemetry_core::LogSink) synchronously.

#![deny(static_mut_refs)]

pub mod cars;
pub mod derive;
pub mod detector;
pub mod frame;
pub mod machine;
pub mod projection;
pub mod snapshot;
pub mod venues;

pub use cars::CarTable;
pub use derive::{DerivationContext, derive_channels};
pub use detector::TrackDetector;
pub use frame::{Vector, rotate_into_frame};
pub use machine::{
    DEFAULT_MAX_GAP_FILL, SessionConfig, SessionState, SessionStateMachine, SessionStats,
    WARM_UP_TICKS,
};
pub use projection::{CoordinateProjection, Equirectangular, GeoOrigin};
pub use snapshot::LiveSnapshot;
pub use venues::{Bounds, Venue, VenueTable, load_default_venues};

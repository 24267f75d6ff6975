//! Data model for monitored users and its assembly from the remote store.

pub mod assembly;
pub mod records;

// Re-export commonly used types
pub use assembly::{
    assemble_user, fetch_events, fetch_profile, fetch_profiles, fetch_session,
    fetch_session_dates, fetch_sessions,
};
pub use records::{
    format_hhmmss, AccelData, Channel, Events, HeartData, ProfileRecord, SessionRecord,
    UserRecord, METADATA_KEY,
};

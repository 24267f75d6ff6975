//! Assembling user records from the remote store.
//!
//! A user record needs three independent reads (profile, events, session
//! listing) and one read per session. Any failed read aborts the whole
//! assembly; there is no partial record.

use crate::core::date_key::DateKey;
use crate::error::AssemblyError;
use crate::model::records::{Events, ProfileRecord, SessionRecord, UserRecord, METADATA_KEY};
use crate::remote::RemoteStore;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

fn profile_path(user_id: &str) -> String {
    format!("{user_id}/{METADATA_KEY}/Profile")
}

fn events_path(user_id: &str) -> String {
    format!("{user_id}/{METADATA_KEY}/Events")
}

fn session_path(user_id: &str, date: &DateKey) -> String {
    format!("{user_id}/{date}")
}

/// Read a user's profile. An empty response yields default fields.
pub fn fetch_profile<S: RemoteStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<ProfileRecord, AssemblyError> {
    let map = store.read(&profile_path(user_id), false)?;
    ProfileRecord::from_json(&map)
}

/// Read profiles for several users, keyed by id.
pub fn fetch_profiles<S, I, T>(
    store: &S,
    user_ids: I,
) -> Result<BTreeMap<String, ProfileRecord>, AssemblyError>
where
    S: RemoteStore + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    user_ids
        .into_iter()
        .map(|id| {
            let id = id.as_ref();
            Ok((id.to_string(), fetch_profile(store, id)?))
        })
        .collect()
}

/// Read a user's events, with their types when `with_types` is set.
///
/// Without types the listing is read shallow.
pub fn fetch_events<S: RemoteStore + ?Sized>(
    store: &S,
    user_id: &str,
    with_types: bool,
) -> Result<Events, AssemblyError> {
    let map = store.read(&events_path(user_id), !with_types)?;

    if !with_types {
        let dates = map
            .keys()
            .map(|k| DateKey::parse(k))
            .collect::<Result<BTreeSet<_>, _>>()?;
        return Ok(Events::Dates(dates));
    }

    let typed = map
        .into_iter()
        .map(|(k, v)| {
            let kind = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            Ok((DateKey::parse(&k)?, kind))
        })
        .collect::<Result<BTreeMap<_, _>, AssemblyError>>()?;
    Ok(Events::Typed(typed))
}

/// List a user's session dates in chronological order.
///
/// The metadata entry is dropped; its absence is not an error.
pub fn fetch_session_dates<S: RemoteStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<Vec<DateKey>, AssemblyError> {
    let mut listing = store.read(user_id, true)?;
    listing.remove(METADATA_KEY);

    let mut dates = listing
        .keys()
        .map(|k| DateKey::parse(k))
        .collect::<Result<Vec<_>, _>>()?;
    dates.sort();
    Ok(dates)
}

/// Read one session.
pub fn fetch_session<S: RemoteStore + ?Sized>(
    store: &S,
    user_id: &str,
    date: &DateKey,
) -> Result<SessionRecord, AssemblyError> {
    let map = store.read(&session_path(user_id, date), false)?;
    SessionRecord::from_json(&map)
}

/// Read the given sessions, one remote read each.
pub fn fetch_sessions<S: RemoteStore + ?Sized>(
    store: &S,
    user_id: &str,
    dates: &[DateKey],
) -> Result<BTreeMap<DateKey, SessionRecord>, AssemblyError> {
    dates
        .iter()
        .map(|date| Ok((date.clone(), fetch_session(store, user_id, date)?)))
        .collect()
}

/// Assemble a complete user record.
pub fn assemble_user<S: RemoteStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<UserRecord, AssemblyError> {
    let profile = fetch_profile(store, user_id)?;
    let events = fetch_events(store, user_id, true)?;
    let dates = fetch_session_dates(store, user_id)?;
    let sessions = fetch_sessions(store, user_id, &dates)?;

    tracing::info!(
        user_id,
        sessions = sessions.len(),
        events = events.len(),
        "assembled user record"
    );

    Ok(UserRecord {
        user_id: user_id.to_string(),
        profile,
        events,
        sessions,
        dates,
    })
}

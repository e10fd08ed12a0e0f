//! Home screen data: current user, calendar link status, upcoming events

use shared::dto::{CalendarEvent, CalendarLinkStatus, NewCalendarEvent, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::{Field, LoadStatus, StoreCore, StoreState};
use crate::core::{ApiService, Result, Unsubscribe};
use crate::services::session::AuthSession;

pub const HOME_TTL: Duration = Duration::from_secs(3 * 60);

const USER: &str = "user";
const CALENDAR: &str = "calendar";
const EVENTS: &str = "events";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeState {
    pub user: Option<UserProfile>,
    pub calendar: CalendarLinkStatus,
    pub events: Vec<CalendarEvent>,
    pub user_loading: bool,
    pub calendar_loading: bool,
    pub events_loading: bool,
    pub status: LoadStatus,
}

impl StoreState for HomeState {
    fn status(&self) -> &LoadStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut LoadStatus {
        &mut self.status
    }
}

const USER_FIELD: Field<HomeState, Option<UserProfile>> = Field {
    name: USER,
    get: |s| &s.user,
    get_mut: |s| &mut s.user,
    loading: |s| &mut s.user_loading,
};

const CALENDAR_FIELD: Field<HomeState, CalendarLinkStatus> = Field {
    name: CALENDAR,
    get: |s| &s.calendar,
    get_mut: |s| &mut s.calendar,
    loading: |s| &mut s.calendar_loading,
};

const EVENTS_FIELD: Field<HomeState, Vec<CalendarEvent>> = Field {
    name: EVENTS,
    get: |s| &s.events,
    get_mut: |s| &mut s.events,
    loading: |s| &mut s.events_loading,
};

pub struct HomeStore {
    core: StoreCore<HomeState>,
    api: Arc<dyn ApiService>,
    session: AuthSession,
}

impl HomeStore {
    pub fn new(api: Arc<dyn ApiService>, session: AuthSession) -> Self {
        Self {
            core: StoreCore::new("home", HOME_TTL),
            api,
            session,
        }
    }

    pub fn get_snapshot(&self) -> Arc<HomeState> {
        self.core.snapshot()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        self.core.subscribe(listener)
    }

    /// `/auth/me`; a successful read also refreshes the cached profile fields
    pub async fn fetch_user(&self, force: bool) -> Option<UserProfile> {
        let api = &self.api;
        let session = &self.session;
        self.core
            .load(&USER_FIELD, force, &self.session, |token| async move {
                let user = api.get_me(&token).await;
                if let Ok(user) = &user {
                    if let Err(e) = session.cache_profile(user).await {
                        warn!(error = %e, "Failed to cache profile");
                    }
                }
                user.map(Some)
            })
            .await
    }

    /// Install a profile read elsewhere (login) as a fresh `/auth/me` result
    pub async fn set_user(&self, user: UserProfile) {
        if let Err(e) = self.session.cache_profile(&user).await {
            warn!(error = %e, "Failed to cache profile");
        }
        self.core.store(&USER_FIELD, Some(user));
    }

    pub async fn fetch_calendar_status(&self, force: bool) -> CalendarLinkStatus {
        let api = &self.api;
        self.core
            .load(&CALENDAR_FIELD, force, &self.session, |token| async move {
                api.calendar_link_status(&token).await
            })
            .await
    }

    pub async fn fetch_events(&self, force: bool) -> Vec<CalendarEvent> {
        let api = &self.api;
        self.core
            .load(&EVENTS_FIELD, force, &self.session, |token| async move {
                api.list_events(&token).await
            })
            .await
    }

    pub async fn fetch_all(&self, force: bool) {
        self.core
            .load_all(force, &[USER, CALENDAR, EVENTS], async {
                tokio::join!(
                    self.fetch_user(force),
                    self.fetch_calendar_status(force),
                    self.fetch_events(force),
                );
            })
            .await;
    }

    pub fn invalidate(&self) {
        self.core.invalidate();
    }

    pub async fn refresh(&self) {
        self.fetch_all(true).await;
    }

    /// Insert or replace by id, keeping events ordered by start
    pub fn add_event(&self, event: CalendarEvent) {
        self.core.modify(|s| {
            s.events.retain(|e| e.id != event.id);
            s.events.push(event);
            s.events.sort_by(|a, b| a.start.cmp(&b.start));
        });
    }

    pub fn remove_event(&self, event_id: &str) {
        self.core.modify(|s| s.events.retain(|e| e.id != event_id));
    }

    pub async fn create_event(&self, event: &NewCalendarEvent) -> Result<CalendarEvent> {
        let token = self.session.require_token().await?;
        let created = self.api.create_event(&token, event).await?;
        self.add_event(created.clone());
        Ok(created)
    }

    /// Removes locally first; not restored if the server call fails
    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        let token = self.session.require_token().await?;
        self.remove_event(event_id);
        self.api.delete_event(&token, event_id).await
    }
}

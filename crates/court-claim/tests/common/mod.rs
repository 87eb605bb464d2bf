//! Shared fixtures: an in-memory portal and a manual clock.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use court_claim::{
    ClaimError, ClaimResult, Clock, Config, ElementMutation, PortalDriver, PortalPage,
    RunContext, Selector, SiteLayout, WaitState,
};

pub const ADDRESS: &str = "  Tennis Elisabeth   7-15 avenue Paul Appell   75014 Paris  ";
pub const WHEN: &str = "\n   le vendredi 5 juin 2026   de 09h00 à 10h00  ";

/// Config with two locations, hours 8 then 9, two players.
pub fn config() -> Config {
    Config::from_json(
        r#"{
        "account": { "email": "player@example.com", "password": "secret" },
        "locations": ["Elisabeth", "Henry de Montherlant"],
        "date": "5/06/2026",
        "hours": ["8", "9"],
        "priceType": ["Tarif plein"],
        "courtType": ["Couvert"],
        "players": [
            { "firstName": "Ada", "lastName": "Lovelace" },
            { "firstName": "Alan", "lastName": "Turing" }
        ],
        "interval": 5,
        "warmUpTime": 10,
        "stopInterval": 30,
        "intervalVariability": 0,
        "targetTime": "08:00:00",
        "snapshotPath": "attempt-failure.png"
    }"#,
    )
    .unwrap()
}

pub fn target_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 5).unwrap()
}

pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn context(config: Config) -> RunContext {
    RunContext::new(config, at(7, 0, 0)).unwrap()
}

// ─────────────────────── fake portal ───────────────────────

#[derive(Debug, Clone)]
pub struct FakeSlot {
    pub court_id: String,
    pub descriptor: String,
    /// Clicking it lands on the reservation page.
    pub claimable: bool,
    /// The button carries no court id attribute.
    pub missing_court_id: bool,
    /// Reading the descriptor cell fails.
    pub broken_descriptor: bool,
}

impl FakeSlot {
    pub fn new(court_id: &str, price: &str, court: &str) -> Self {
        Self {
            court_id: court_id.to_string(),
            descriptor: format!("{price}<br>{court}"),
            claimable: true,
            missing_court_id: false,
            broken_descriptor: false,
        }
    }

    pub fn lost(mut self) -> Self {
        self.claimable = false;
        self
    }

    pub fn without_court_id(mut self) -> Self {
        self.missing_court_id = true;
        self
    }

    /// Descriptor with no price/court separator.
    pub fn unreadable(mut self) -> Self {
        self.descriptor = "Indisponible".to_string();
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken_descriptor = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeHour {
    pub hour: String,
    pub collapsed: bool,
    pub slots: Vec<FakeSlot>,
}

/// What the portal offers and how it misbehaves.
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pub results: HashMap<String, Vec<FakeHour>>,
    pub interstitial: bool,
    pub login_fails: bool,
    /// Any operation on a selector containing this text times out.
    pub fail_on: Option<String>,
}

impl FakeSite {
    pub fn offer(mut self, location: &str, hour: &str, slots: Vec<FakeSlot>) -> Self {
        self.results
            .entry(location.to_string())
            .or_default()
            .push(FakeHour {
                hour: hour.to_string(),
                collapsed: false,
                slots,
            });
        self
    }

    pub fn offer_collapsed(mut self, location: &str, hour: &str, slots: Vec<FakeSlot>) -> Self {
        self.results
            .entry(location.to_string())
            .or_default()
            .push(FakeHour {
                hour: hour.to_string(),
                collapsed: true,
                slots,
            });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Blank,
    Entry,
    Search,
    Reservation,
    Payment,
    Confirmed,
}

/// Everything the fake saw, for assertions.
#[derive(Debug)]
pub struct FakeState {
    pub site: FakeSite,
    pub layout: SiteLayout,
    pub date: NaiveDate,
    pub stage: Stage,
    pub title: String,
    pub location: Option<String>,
    pub expanded: HashSet<String>,
    pub gotos: Vec<String>,
    pub clicks: Vec<String>,
    pub waits: Vec<(String, WaitState)>,
    pub fills: Vec<(String, String)>,
    pub typed: Vec<(String, String)>,
    pub keys: Vec<String>,
    pub mutations: Vec<(String, Vec<ElementMutation>)>,
    pub snapshots: Vec<PathBuf>,
    pub popups: usize,
    pub opened: usize,
    pub closed: usize,
}

impl FakeState {
    fn new(site: FakeSite) -> Self {
        Self {
            site,
            layout: SiteLayout::default(),
            date: target_date(),
            stage: Stage::Blank,
            title: String::new(),
            location: None,
            expanded: HashSet::new(),
            gotos: Vec::new(),
            clicks: Vec::new(),
            waits: Vec::new(),
            fills: Vec::new(),
            typed: Vec::new(),
            keys: Vec::new(),
            mutations: Vec::new(),
            snapshots: Vec::new(),
            popups: 0,
            opened: 0,
            closed: 0,
        }
    }

    fn check(&self, selector: &Selector) -> ClaimResult<()> {
        match &self.site.fail_on {
            Some(pattern) if selector.css.contains(pattern.as_str()) => Err(ClaimError::Timeout {
                what: selector.to_string(),
                timeout_ms: 120_000,
            }),
            _ => Ok(()),
        }
    }

    fn hours_here(&self) -> &[FakeHour] {
        self.location
            .as_ref()
            .and_then(|l| self.site.results.get(l))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn hour_for_slots(&self, selector: &Selector) -> Option<&FakeHour> {
        if self.stage != Stage::Search {
            return None;
        }
        self.hours_here()
            .iter()
            .find(|h| self.layout.hour_slots(self.date, &h.hour).css == selector.css)
    }

    fn slot_for_button(&self, selector: &Selector) -> Option<(&FakeHour, &FakeSlot)> {
        if self.stage != Stage::Search {
            return None;
        }
        self.hours_here().iter().find_map(|h| {
            h.slots
                .iter()
                .find(|s| self.layout.slot_button(self.date, &h.hour, &s.court_id).css == selector.css)
                .map(|s| (h, s))
        })
    }

    fn hour_visible(&self, hour: &FakeHour) -> bool {
        !hour.collapsed || self.expanded.contains(&hour.hour)
    }

    /// Court ids whose claim button was clicked, in order.
    pub fn claimed(&self) -> Vec<String> {
        self.clicks
            .iter()
            .filter(|c| c.starts_with("[courtid="))
            .cloned()
            .collect()
    }
}

pub type Shared = Arc<Mutex<FakeState>>;

pub struct FakeDriver {
    pub state: Shared,
    pub open_fails: bool,
}

impl FakeDriver {
    pub fn new(site: FakeSite) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::new(site))),
            open_fails: false,
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl PortalDriver for FakeDriver {
    async fn open_page(&self) -> ClaimResult<Box<dyn PortalPage>> {
        if self.open_fails {
            return Err(ClaimError::Portal("browser failed to launch".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.opened += 1;
        state.stage = Stage::Blank;
        state.title.clear();
        state.location = None;
        state.expanded.clear();
        Ok(Box::new(FakePage {
            state: Arc::clone(&self.state),
            popup: false,
        }))
    }
}

pub struct FakePage {
    state: Shared,
    popup: bool,
}

impl FakePage {
    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl PortalPage for FakePage {
    async fn goto(&mut self, url: &str) -> ClaimResult<()> {
        let mut s = self.lock();
        s.gotos.push(url.to_string());
        if url == s.layout.entry_url {
            s.stage = Stage::Entry;
            s.title = "Paris | TENNIS".to_string();
        } else if url == s.layout.search_url {
            s.stage = Stage::Search;
            s.title = "Paris | TENNIS - Recherche".to_string();
            s.location = None;
            s.expanded.clear();
        } else if url == s.layout.reservation_url {
            s.stage = Stage::Reservation;
        }
        Ok(())
    }

    async fn wait_for_load(&self) -> ClaimResult<()> {
        Ok(())
    }

    async fn exists(&self, selector: &Selector) -> ClaimResult<bool> {
        let s = self.lock();
        s.check(selector)?;
        if selector.css == s.layout.interstitial_marker {
            let reloaded = s.gotos.contains(&s.layout.reservation_url);
            return Ok(s.site.interstitial && s.stage == Stage::Reservation && !reloaded);
        }
        Ok(s.hour_for_slots(selector).is_some_and(|h| !h.slots.is_empty()))
    }

    async fn count(&self, selector: &Selector) -> ClaimResult<usize> {
        let s = self.lock();
        s.check(selector)?;
        Ok(s.hour_for_slots(selector).map_or(0, |h| h.slots.len()))
    }

    async fn is_visible(&self, selector: &Selector) -> ClaimResult<bool> {
        let s = self.lock();
        s.check(selector)?;
        Ok(s.hour_for_slots(selector).is_some_and(|h| s.hour_visible(h)))
    }

    async fn wait_for(&self, selector: &Selector, state: WaitState) -> ClaimResult<()> {
        let mut s = self.lock();
        s.check(selector)?;
        s.waits.push((selector.to_string(), state));
        if selector.css == s.layout.authenticated_marker && s.site.login_fails {
            return Err(ClaimError::Timeout {
                what: selector.to_string(),
                timeout_ms: 120_000,
            });
        }
        if let Some(hour) = s.hour_for_slots(selector) {
            if state == WaitState::Visible && !s.hour_visible(hour) {
                return Err(ClaimError::Timeout {
                    what: selector.to_string(),
                    timeout_ms: 120_000,
                });
            }
        }
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> ClaimResult<()> {
        let mut s = self.lock();
        s.check(selector)?;
        s.clicks.push(selector.to_string());

        let header_hour = s
            .hours_here()
            .iter()
            .map(|h| h.hour.clone())
            .find(|hour| {
                let loc = s.location.clone().unwrap_or_default();
                s.layout.hour_group_header(&loc, hour).css == selector.css
            });
        if let Some(hour) = header_hour {
            s.expanded.insert(hour);
            return Ok(());
        }

        if let Some(claimable) = s.slot_for_button(selector).map(|(_, slot)| slot.claimable) {
            if claimable {
                s.stage = Stage::Reservation;
                s.title = s.layout.reservation_title.clone();
            }
            return Ok(());
        }

        if selector.css == s.layout.final_submit && s.stage == Stage::Payment {
            s.stage = Stage::Confirmed;
        }
        Ok(())
    }

    async fn click_for_popup(&self, selector: &Selector) -> ClaimResult<Box<dyn PortalPage>> {
        let mut s = self.lock();
        s.check(selector)?;
        s.clicks.push(selector.to_string());
        s.popups += 1;
        Ok(Box::new(FakePage {
            state: Arc::clone(&self.state),
            popup: true,
        }))
    }

    async fn fill(&self, selector: &Selector, value: &str) -> ClaimResult<()> {
        let mut s = self.lock();
        s.check(selector)?;
        s.fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn type_text(&self, selector: &Selector, text: &str) -> ClaimResult<()> {
        let mut s = self.lock();
        s.check(selector)?;
        s.typed.push((selector.to_string(), text.to_string()));
        if selector.css == s.layout.location_input {
            s.location = Some(text.to_string());
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> ClaimResult<()> {
        let mut s = self.lock();
        s.keys.push(key.to_string());
        if s.stage == Stage::Reservation {
            s.stage = Stage::Payment;
        }
        Ok(())
    }

    async fn title(&self) -> ClaimResult<String> {
        Ok(self.lock().title.clone())
    }

    async fn attribute(&self, selector: &Selector, name: &str) -> ClaimResult<Option<String>> {
        let s = self.lock();
        s.check(selector)?;
        if name != s.layout.court_id_attribute {
            return Ok(None);
        }
        Ok(s.hour_for_slots(selector).and_then(|h| {
            h.slots
                .get(selector.nth.unwrap_or(0))
                .filter(|slot| !slot.missing_court_id)
                .map(|slot| slot.court_id.clone())
        }))
    }

    async fn text_content(&self, selector: &Selector) -> ClaimResult<String> {
        let s = self.lock();
        s.check(selector)?;
        if s.stage != Stage::Confirmed {
            return Err(ClaimError::ElementNotFound(selector.to_string()));
        }
        if selector.css == s.layout.confirmed_address {
            Ok(ADDRESS.to_string())
        } else if selector.css == s.layout.confirmed_date {
            Ok(WHEN.to_string())
        } else {
            Err(ClaimError::ElementNotFound(selector.to_string()))
        }
    }

    async fn inner_html(&self, selector: &Selector) -> ClaimResult<String> {
        let s = self.lock();
        s.check(selector)?;
        let anchor = selector
            .left_of
            .as_deref()
            .ok_or_else(|| ClaimError::ElementNotFound(selector.to_string()))?;
        match s.slot_for_button(anchor) {
            Some((_, slot)) if !slot.broken_descriptor => Ok(slot.descriptor.clone()),
            _ => Err(ClaimError::ElementNotFound(selector.to_string())),
        }
    }

    async fn mutate(&self, selector: &Selector, mutations: &[ElementMutation]) -> ClaimResult<()> {
        let mut s = self.lock();
        s.check(selector)?;
        s.mutations.push((selector.to_string(), mutations.to_vec()));
        Ok(())
    }

    async fn snapshot(&self, path: &Path) -> ClaimResult<()> {
        self.lock().snapshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(self: Box<Self>) -> ClaimResult<()> {
        if !self.popup {
            self.lock().closed += 1;
        }
        Ok(())
    }
}

// ─────────────────────── fake clock ───────────────────────

/// Clock that only moves when slept on or advanced by hand.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::from_std(by).unwrap();
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

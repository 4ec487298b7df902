use std::sync::{Arc, Mutex, RwLock};

use crate::alert::RiskTransition;
use crate::feed::swpc::defaulted_reading;
use crate::history::SampleHistory;
use crate::hud::ViewState;
use crate::types::{now_ms, KpSnapshot, LatestReading, NoticesOutcome, RawRecords, Sample};

/// Process-wide state container. Single writer role per field (the poll
/// handlers), many readers (API handlers, each other). The published view
/// state is replaced wholesale behind an `Arc` so readers never observe a
/// partially-written record.
pub struct StateStore {
    latest: RwLock<LatestReading>,
    history: Mutex<SampleHistory>,
    kp: RwLock<Option<KpSnapshot>>,
    notices: RwLock<NoticesOutcome>,
    raw: RwLock<Option<RawRecords>>,
    view: RwLock<Arc<ViewState>>,
    last_transition: RwLock<Option<RiskTransition>>,
    /// Observer latitude from config; immutable for the process lifetime.
    observer_lat: Option<f64>,
}

impl StateStore {
    pub fn new(observer_lat: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            // Until the first poll lands, readers see the documented
            // fallback reading rather than zeros.
            latest: RwLock::new(defaulted_reading(now_ms())),
            history: Mutex::new(SampleHistory::new()),
            kp: RwLock::new(None),
            notices: RwLock::new(NoticesOutcome::Unavailable),
            raw: RwLock::new(None),
            view: RwLock::new(Arc::new(ViewState::default())),
            last_transition: RwLock::new(None),
            observer_lat,
        })
    }

    pub fn observer_lat(&self) -> Option<f64> {
        self.observer_lat
    }

    // --- latest reading ---------------------------------------------------

    pub fn set_latest(&self, reading: LatestReading) {
        *self.latest.write().expect("latest lock poisoned") = reading;
    }

    pub fn latest(&self) -> LatestReading {
        self.latest.read().expect("latest lock poisoned").clone()
    }

    // --- history ----------------------------------------------------------

    pub fn append_sample(&self, sample: Sample) {
        self.history
            .lock()
            .expect("history lock poisoned")
            .append(sample);
    }

    pub fn seed_history(&self, samples: Vec<Sample>) -> usize {
        self.history
            .lock()
            .expect("history lock poisoned")
            .seed(samples)
    }

    pub fn history_window(&self, n: usize) -> Vec<Sample> {
        self.history
            .lock()
            .expect("history lock poisoned")
            .window(n)
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().expect("history lock poisoned").len()
    }

    // --- kp / notices / raw -----------------------------------------------

    pub fn set_kp(&self, snapshot: KpSnapshot) {
        *self.kp.write().expect("kp lock poisoned") = Some(snapshot);
    }

    pub fn kp(&self) -> Option<KpSnapshot> {
        self.kp.read().expect("kp lock poisoned").clone()
    }

    pub fn set_notices(&self, outcome: NoticesOutcome) {
        *self.notices.write().expect("notices lock poisoned") = outcome;
    }

    pub fn notices(&self) -> NoticesOutcome {
        self.notices.read().expect("notices lock poisoned").clone()
    }

    pub fn set_raw(&self, raw: RawRecords) {
        *self.raw.write().expect("raw lock poisoned") = Some(raw);
    }

    pub fn raw(&self) -> Option<RawRecords> {
        self.raw.read().expect("raw lock poisoned").clone()
    }

    // --- view state -------------------------------------------------------

    /// Atomic wholesale replacement of the published view state.
    pub fn publish_view(&self, view: ViewState) {
        *self.view.write().expect("view lock poisoned") = Arc::new(view);
    }

    pub fn view(&self) -> Arc<ViewState> {
        Arc::clone(&self.view.read().expect("view lock poisoned"))
    }

    // --- alerts -----------------------------------------------------------

    pub fn set_last_transition(&self, transition: RiskTransition) {
        *self
            .last_transition
            .write()
            .expect("transition lock poisoned") = Some(transition);
    }

    pub fn last_transition(&self) -> Option<RiskTransition> {
        self.last_transition
            .read()
            .expect("transition lock poisoned")
            .clone()
    }
}

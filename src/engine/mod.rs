//! The template engine.
//!
//! Ties the pieces together: the serial index names which serials exist
//! for the active scope, the navigator moves over them, the fetch
//! coordinator resolves windows into the batch cache, and the display
//! sync publishes the gap-free visible list. `TemplateEngine` is the
//! single entry point callers drive.

pub mod coordinator;
pub mod display;
pub mod index;
pub mod navigator;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{HttpTemplateGateway, TemplateGateway};
use crate::cache::{BatchCache, Window};
use crate::config::EngineConfig;
use crate::models::{Scope, TemplateRecord};

pub use coordinator::{EnsureAction, FetchCoordinator, WindowFetchStatus, WindowOutcome};
pub use display::DisplaySync;
pub use index::CategorySerialIndex;
pub use navigator::SerialNavigator;

/// Lifecycle of the engine for the active scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// No scope activated yet.
    Empty,
    /// Fetching the category list to build the serial index.
    LoadingIndex,
    /// Index built, but no window has resolved yet.
    Indexed,
    /// One or more window fetches in flight.
    LoadingWindow,
    /// Every requested window resolved, nothing in flight.
    Cached,
}

/// Serial-windowed template fetch, cache, and navigation engine.
pub struct TemplateEngine {
    config: EngineConfig,
    index: CategorySerialIndex,
    navigator: SerialNavigator,
    coordinator: FetchCoordinator,
    display: DisplaySync,
    phase: EnginePhase,
}

impl TemplateEngine {
    pub fn new(config: EngineConfig, gateway: Arc<dyn TemplateGateway>) -> Self {
        let coordinator = FetchCoordinator::new(gateway, config.window_size);
        let display = DisplaySync::new(config.prefetch_threshold);
        Self {
            config,
            index: CategorySerialIndex::default(),
            navigator: SerialNavigator::default(),
            coordinator,
            display,
            phase: EnginePhase::Empty,
        }
    }

    /// Engine over the HTTP gateway built from the config's candidate
    /// endpoint list.
    pub fn with_http_gateway(config: EngineConfig) -> Result<Self> {
        let gateway = Arc::new(HttpTemplateGateway::new(&config)?);
        Ok(Self::new(config, gateway))
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn index(&self) -> &CategorySerialIndex {
        &self.index
    }

    pub fn current_serial(&self) -> u32 {
        self.navigator.current()
    }

    pub fn cache(&self) -> &BatchCache {
        self.coordinator.cache()
    }

    /// The record at the current serial, if its window has resolved.
    pub fn current_record(&self) -> Option<&TemplateRecord> {
        self.coordinator.cache().record_at(self.navigator.current())
    }

    /// Receiver for the published visible list.
    pub fn subscribe_display(&self) -> watch::Receiver<Vec<TemplateRecord>> {
        self.display.subscribe()
    }

    /// Switch to a new (category, religion) scope: invalidate in-flight
    /// fetches, rebuild the serial index from the category list, land on
    /// the first serial, and load its window with retries.
    pub async fn activate_scope(&mut self, scope: Scope) {
        info!(category = %scope.category, "activating scope");
        self.phase = EnginePhase::LoadingIndex;
        self.coordinator.activate_scope(scope.clone());

        let records = match self.coordinator.gateway().fetch_category_list(&scope).await {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, "category list fetch failed, index degrades to [1]");
                Vec::new()
            }
        };

        self.index = CategorySerialIndex::rebuild(&records);
        self.navigator.jump_to(self.index.first().unwrap_or(1));
        self.phase = EnginePhase::LoadingWindow;

        self.coordinator
            .load_initial(self.navigator.current(), self.config.initial_load_attempts)
            .await;

        self.display.publish(self.coordinator.cache());
        self.refresh_phase();
    }

    /// Move to the next serial (wrapping) and make sure its window is
    /// resolved or being fetched.
    pub fn next(&mut self) -> u32 {
        let serial = self.navigator.next(&self.index);
        self.after_navigation(serial);
        serial
    }

    /// Move to the previous serial (wrapping).
    pub fn previous(&mut self) -> u32 {
        let serial = self.navigator.previous(&self.index);
        self.after_navigation(serial);
        serial
    }

    /// Jump straight to a serial.
    pub fn jump_to(&mut self, serial: u32) -> u32 {
        self.navigator.jump_to(serial);
        let serial = self.navigator.current();
        self.after_navigation(serial);
        serial
    }

    fn after_navigation(&mut self, serial: u32) {
        self.coordinator.ensure_window_for(serial);
        self.display.publish(self.coordinator.cache());
        self.refresh_phase();
    }

    /// Report the viewer's position in the visible list. Near the end of
    /// the list, the window covering the first unresolved serial past the
    /// visible prefix is prefetched ahead of demand. Records cached
    /// beyond a gap do not count toward the boundary: the viewer can only
    /// scroll through the gap-free prefix.
    pub fn notify_position(&mut self, visible_index: usize) {
        let visible_len = self.display.publish(self.coordinator.cache());
        if self.display.near_boundary(visible_index, visible_len) {
            let next_serial = self.coordinator.cache().first_unknown_serial();
            self.coordinator.ensure_window_for(next_serial);
            self.refresh_phase();
        }
    }

    /// Drain finished fetches, republish the visible list when anything
    /// changed. Returns how many outcomes changed the cache.
    pub fn poll_completions(&mut self) -> usize {
        let changed = self.coordinator.poll_completions();
        if changed > 0 {
            self.display.publish(self.coordinator.cache());
        }
        self.refresh_phase();
        changed
    }

    /// Wait for one fetch to finish, merge it, and republish. Returns
    /// the window it covered.
    pub async fn process_next_completion(&mut self) -> Option<Window> {
        let window = self.coordinator.next_completion().await?;
        self.display.publish(self.coordinator.cache());
        self.refresh_phase();
        Some(window)
    }

    fn refresh_phase(&mut self) {
        // Only meaningful once the index exists.
        if matches!(self.phase, EnginePhase::Empty | EnginePhase::LoadingIndex) {
            return;
        }
        self.phase = if self.coordinator.in_flight_len() > 0 {
            EnginePhase::LoadingWindow
        } else if self.coordinator.cache().is_empty() {
            EnginePhase::Indexed
        } else {
            EnginePhase::Cached
        };
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::coordinator::tests::{init_tracing, scope, MockGateway};
    use super::*;
    use crate::models::ReligionFilter;

    fn engine_with(gateway: Arc<MockGateway>) -> TemplateEngine {
        let config = EngineConfig {
            window_size: 5,
            prefetch_threshold: 2,
            initial_load_attempts: 3,
            ..Default::default()
        };
        TemplateEngine::new(config, gateway as _)
    }

    #[tokio::test(start_paused = true)]
    async fn activate_scope_builds_index_and_first_window() {
        let gateway = Arc::new(MockGateway::with_serials(1..=12));
        let mut engine = engine_with(Arc::clone(&gateway));

        engine.activate_scope(scope()).await;

        assert_eq!(engine.index().total_serials(), 12);
        assert_eq!(engine.current_serial(), 1);
        assert_eq!(engine.current_record().map(|r| r.serial_no), Some(1));
        assert_eq!(engine.phase(), EnginePhase::Cached);
        // Index fetch plus the first window.
        assert_eq!(gateway.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_through_cached_window_fetches_nothing() {
        let gateway = Arc::new(MockGateway::with_serials(1..=12));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;

        // Serials 2..5 are already cached by the initial window.
        for expected in 2..=5 {
            assert_eq!(engine.next(), expected);
        }
        assert_eq!(gateway.batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn crossing_a_window_boundary_dispatches_the_next_window() {
        let gateway = Arc::new(MockGateway::with_serials(1..=12));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;

        engine.jump_to(5);
        assert_eq!(engine.next(), 6);
        assert_eq!(engine.phase(), EnginePhase::LoadingWindow);

        engine.process_next_completion().await;
        assert_eq!(engine.phase(), EnginePhase::Cached);
        assert_eq!(engine.current_record().map(|r| r.serial_no), Some(6));
        assert_eq!(gateway.batch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_final_window_completes_the_visible_list() {
        // 12 records with window size 5: windows 1-5, 6-10, 11-15. The
        // last window comes back with two records and three sentinels.
        let gateway = Arc::new(MockGateway::with_serials(1..=12));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;

        for serial in [6, 11] {
            engine.jump_to(serial);
            engine.process_next_completion().await;
        }

        assert!(engine.cache().get(13).is_end_of_data());
        assert!(engine.cache().get(15).is_end_of_data());

        let mut rx = engine.subscribe_display();
        let visible = rx.borrow_and_update();
        assert_eq!(visible.len(), 12);
        assert_eq!(visible.first().map(|r| r.serial_no), Some(1));
        assert_eq!(visible.last().map(|r| r.serial_no), Some(12));
    }

    #[tokio::test(start_paused = true)]
    async fn wraparound_from_last_serial_back_to_first() {
        let gateway = Arc::new(MockGateway::with_serials(1..=12));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;

        engine.jump_to(12);
        assert_eq!(engine.next(), 1);
        // First window is still cached from the initial load.
        assert_eq!(engine.current_record().map(|r| r.serial_no), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_position_prefetches_ahead() {
        let gateway = Arc::new(MockGateway::with_serials(1..=12));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;
        assert_eq!(gateway.batch_calls.load(Ordering::SeqCst), 1);

        // 5 known records, viewer at index 4: within threshold of the end.
        engine.notify_position(4);
        assert_eq!(engine.phase(), EnginePhase::LoadingWindow);
        engine.process_next_completion().await;

        // Serials 6-10 arrived without any navigation.
        assert_eq!(engine.cache().record_at(6).map(|r| r.serial_no), Some(6));
        assert_eq!(gateway.batch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn prefetch_targets_the_gap_after_the_visible_prefix() {
        init_tracing();
        let gateway = Arc::new(MockGateway::with_serials(1..=20));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;

        // Resolve a later window out of order: 1-5 and 11-15 are cached,
        // 6-10 is a gap, so the visible list is still only serials 1-5.
        engine.jump_to(11);
        engine.process_next_completion().await;
        assert_eq!(engine.subscribe_display().borrow().len(), 5);

        // Viewer at the end of the visible list must trigger a prefetch
        // of the gap window, not the window after the navigator's.
        engine.notify_position(4);
        assert_eq!(engine.phase(), EnginePhase::LoadingWindow);
        engine.process_next_completion().await;

        assert_eq!(engine.cache().record_at(6).map(|r| r.serial_no), Some(6));
        assert_eq!(engine.subscribe_display().borrow().len(), 15);
        assert_eq!(gateway.batch_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn scope_switch_resets_cache_and_position() {
        let gateway = Arc::new(MockGateway::with_serials(1..=12));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;
        engine.jump_to(7);

        engine
            .activate_scope(crate::models::Scope::new("birthday", ReligionFilter::All))
            .await;

        assert_eq!(engine.current_serial(), 1);
        assert_eq!(engine.current_record().map(|r| r.serial_no), Some(1));
        // Old cache contents are gone except the freshly loaded window.
        assert!(engine.cache().get(7).is_unknown());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_category_still_lands_on_serial_one() {
        let gateway = Arc::new(MockGateway::with_serials(std::iter::empty::<u32>()));
        let mut engine = engine_with(Arc::clone(&gateway));
        engine.activate_scope(scope()).await;

        assert_eq!(engine.index().serials(), &[1]);
        assert_eq!(engine.current_serial(), 1);
        // The empty batch response resolves the window as end-of-data.
        assert!(engine.cache().get(1).is_end_of_data());
        assert_eq!(engine.phase(), EnginePhase::Cached);
    }
}

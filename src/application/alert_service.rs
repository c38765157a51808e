//! Deduplication, cooldown, rate limiting, and multi-tier playback for
//! alert events (spec.md §4.11).

use crate::domain::alert::AlertEvent;
use crate::domain::errors::AlertPlaybackError;
use crate::domain::ports::AudioSink;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy)]
pub struct AlertServiceConfig {
    pub cooldown_seconds: i64,
    pub max_alerts_per_hour: usize,
    pub history_capacity: usize,
}

impl Default for AlertServiceConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 180,
            max_alerts_per_hour: 100,
            history_capacity: 1000,
        }
    }
}

struct State {
    last_alert_at: HashMap<(String, crate::domain::alert::AlertType), i64>,
    recent_alert_timestamps: VecDeque<i64>,
    history: VecDeque<AlertEvent>,
    suppressed_by_cooldown: u64,
    rate_limited: u64,
}

/// Ordered playback chain: attempted in order, the first success wins.
/// Playback tiers are expected to try the narrowest-to-broadest medium —
/// e.g. WAV, MP3, OGG/AIFF, desktop notification, console log.
pub struct AlertService {
    config: AlertServiceConfig,
    playback_chain: Vec<Arc<dyn AudioSink>>,
    state: Mutex<State>,
}

impl AlertService {
    pub fn new(config: AlertServiceConfig, playback_chain: Vec<Arc<dyn AudioSink>>) -> Self {
        Self {
            config,
            playback_chain,
            state: Mutex::new(State {
                last_alert_at: HashMap::new(),
                recent_alert_timestamps: VecDeque::new(),
                history: VecDeque::new(),
                suppressed_by_cooldown: 0,
                rate_limited: 0,
            }),
        }
    }

    pub async fn emit(&self, event: AlertEvent) {
        let mut state = self.state.lock().await;

        let dedup_key = (event.instrument_key.clone(), event.alert_type);
        if let Some(&last) = state.last_alert_at.get(&dedup_key) {
            if event.timestamp - last < self.config.cooldown_seconds {
                state.suppressed_by_cooldown += 1;
                Self::record_history(&mut state, event, self.config.history_capacity);
                return;
            }
        }

        while let Some(&oldest) = state.recent_alert_timestamps.front() {
            if event.timestamp - oldest > 3600 {
                state.recent_alert_timestamps.pop_front();
            } else {
                break;
            }
        }
        if state.recent_alert_timestamps.len() >= self.config.max_alerts_per_hour {
            state.rate_limited += 1;
            warn!(instrument = %event.instrument_key, "alert rate cap exceeded; suppressing");
            Self::record_history(&mut state, event, self.config.history_capacity);
            return;
        }

        state.last_alert_at.insert(dedup_key, event.timestamp);
        state.recent_alert_timestamps.push_back(event.timestamp);
        drop(state);

        if let Err(err) = self.play(&event).await {
            error!(instrument = %event.instrument_key, error = %err, "all playback tiers failed");
        }

        let mut state = self.state.lock().await;
        Self::record_history(&mut state, event, self.config.history_capacity);
    }

    async fn play(&self, event: &AlertEvent) -> Result<(), AlertPlaybackError> {
        for tier in &self.playback_chain {
            if tier.play(event).await.is_ok() {
                return Ok(());
            }
        }
        Err(AlertPlaybackError {
            instrument_key: event.instrument_key.clone(),
            reason: "every playback tier failed".into(),
        })
    }

    fn record_history(state: &mut State, event: AlertEvent, capacity: usize) {
        if state.history.len() >= capacity {
            state.history.pop_front();
        }
        state.history.push_back(event);
    }

    pub async fn history(&self) -> Vec<AlertEvent> {
        self.state.lock().await.history.iter().cloned().collect()
    }
}

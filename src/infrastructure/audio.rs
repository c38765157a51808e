//! Audio alert playback tiers (spec.md §4.11): the core treats audio as an
//! external collaborator specified purely by the `AudioSink` interface.
//! These adapters implement the documented fallback chain — WAV, then
//! MP3, then OGG/AIFF, then a desktop notification, then a console line —
//! without depending on a real audio codec or GUI toolkit.

use crate::domain::alert::AlertEvent;
use crate::domain::errors::AlertPlaybackError;
use crate::domain::ports::AudioSink;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

fn failure(event: &AlertEvent, reason: impl Into<String>) -> AlertPlaybackError {
    AlertPlaybackError {
        instrument_key: event.instrument_key.clone(),
        reason: reason.into(),
    }
}

/// Plays `sound_path` if it exists and carries the given extension.
/// "Playback" is logging the attempt — no audio codec is bundled — but
/// the presence check means a missing or wrong-format file genuinely
/// falls through to the next tier, matching the documented chain.
struct FileExtensionSink {
    sound_path: Option<PathBuf>,
    extensions: &'static [&'static str],
    tier_name: &'static str,
}

#[async_trait]
impl AudioSink for FileExtensionSink {
    async fn play(&self, event: &AlertEvent) -> Result<(), AlertPlaybackError> {
        let Some(path) = &self.sound_path else {
            return Err(failure(event, format!("{}: no sound_path configured", self.tier_name)));
        };
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|candidate| candidate.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if !matches_extension {
            return Err(failure(event, format!("{}: path extension mismatch", self.tier_name)));
        }
        match tokio::fs::metadata(path).await {
            Ok(_) => {
                info!(tier = self.tier_name, path = %path.display(), instrument = %event.instrument_key, "playing alert sound");
                Ok(())
            }
            Err(err) => Err(failure(event, format!("{}: {err}", self.tier_name))),
        }
    }
}

/// Headless deployments (spec.md's bootstrap is headless by design) have
/// no desktop session to notify; this tier always falls through.
struct DesktopNotificationSink;

#[async_trait]
impl AudioSink for DesktopNotificationSink {
    async fn play(&self, event: &AlertEvent) -> Result<(), AlertPlaybackError> {
        Err(failure(event, "no desktop session available in headless deployment"))
    }
}

/// Last-resort tier: a console line. Never fails.
struct ConsoleLineSink;

#[async_trait]
impl AudioSink for ConsoleLineSink {
    async fn play(&self, event: &AlertEvent) -> Result<(), AlertPlaybackError> {
        println!("ALERT: {}", event.message);
        Ok(())
    }
}

/// Builds the ordered playback chain `AlertService` tries tier by tier.
pub fn default_chain(sound_path: Option<String>) -> Vec<std::sync::Arc<dyn AudioSink>> {
    let sound_path = sound_path.map(PathBuf::from);
    vec![
        std::sync::Arc::new(FileExtensionSink {
            sound_path: sound_path.clone(),
            extensions: &["wav"],
            tier_name: "wav",
        }),
        std::sync::Arc::new(FileExtensionSink {
            sound_path: sound_path.clone(),
            extensions: &["mp3"],
            tier_name: "mp3",
        }),
        std::sync::Arc::new(FileExtensionSink {
            sound_path,
            extensions: &["ogg", "aiff"],
            tier_name: "ogg_aiff",
        }),
        std::sync::Arc::new(DesktopNotificationSink),
        std::sync::Arc::new(ConsoleLineSink),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::AlertType;

    fn event() -> AlertEvent {
        AlertEvent {
            symbol: "X".into(),
            instrument_key: "NSE:X".into(),
            alert_type: AlertType::BbWidthSqueeze,
            bb_width: 0.009,
            lowest_bb_width: 0.009,
            pattern_length: 3,
            timestamp: 0,
            message: "test alert".into(),
        }
    }

    #[tokio::test]
    async fn console_tier_always_succeeds() {
        let sink = ConsoleLineSink;
        assert!(sink.play(&event()).await.is_ok());
    }

    #[tokio::test]
    async fn desktop_tier_always_falls_through() {
        let sink = DesktopNotificationSink;
        assert!(sink.play(&event()).await.is_err());
    }

    #[tokio::test]
    async fn missing_sound_path_falls_through_every_file_tier() {
        let chain = default_chain(None);
        // Every tier but the console line should fail with no path configured.
        for tier in &chain[..chain.len() - 1] {
            assert!(tier.play(&event()).await.is_err());
        }
        assert!(chain.last().unwrap().play(&event()).await.is_ok());
    }
}

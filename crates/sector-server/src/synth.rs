//! Speech synthesis collaborator.
//!
//! Synthesis failure is never an error for the pipeline: a transmission
//! without audio still queues, dispatches, and tracks acknowledgment.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use sector_core::{AudioClip, Urgency};

/// Rough audio duration estimate from MP3 byte length.
const BYTES_PER_MS: usize = 16;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns None when synthesis is unavailable or fails.
    async fn synthesize(&self, text: &str, urgency: Urgency) -> Result<Option<AudioClip>>;
}

/// Voice modulation parameters per urgency level.
#[derive(Debug, Clone, Copy)]
pub struct VoiceParameters {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub speed: f64,
}

impl VoiceParameters {
    pub fn for_urgency(urgency: Urgency) -> Self {
        match urgency {
            // Stressed delivery: faster, more variation
            Urgency::Immediate => Self {
                stability: 0.3,
                similarity_boost: 0.8,
                style: 0.8,
                speed: 1.25,
            },
            Urgency::Urgent => Self {
                stability: 0.5,
                similarity_boost: 0.85,
                style: 0.5,
                speed: 1.1,
            },
            Urgency::Routine => Self {
                stability: 0.7,
                similarity_boost: 0.9,
                style: 0.3,
                speed: 1.0,
            },
            Urgency::Advisory => Self {
                stability: 0.8,
                similarity_boost: 0.95,
                style: 0.2,
                speed: 0.95,
            },
        }
    }
}

/// Expand radio abbreviations so the synthesized voice reads them out.
pub fn expand_for_radio(text: &str) -> String {
    const REPLACEMENTS: [(&str, &str); 6] = [
        ("FL", "flight level "),
        ("nm", " nautical miles"),
        ("kts", " knots"),
        ("ILS", "I.L.S."),
        ("VFR", "V.F.R."),
        ("IFR", "I.F.R."),
    ];
    let mut expanded = text.to_string();
    for (abbr, full) in REPLACEMENTS {
        expanded = expanded.replace(abbr, full);
    }
    expanded
}

/// HTTP text-to-speech client. Without an API key every call resolves to
/// "no audio".
pub struct HttpSynthesizer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    voice_id: String,
}

impl HttpSynthesizer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        voice_id: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
            api_key,
            voice_id: voice_id.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, urgency: Urgency) -> Result<Option<AudioClip>> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!("Synthesis key not configured, transmitting silently");
            return Ok(None);
        };

        let params = VoiceParameters::for_urgency(urgency);
        let body = json!({
            "text": expand_for_radio(text),
            "model_id": "eleven_monolingual_v1",
            "voice_settings": {
                "stability": params.stability,
                "similarity_boost": params.similarity_boost,
                "style": params.style,
                "use_speaker_boost": true,
            },
        });

        let response = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, self.voice_id))
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await
            .context("synthesis request failed")?;

        if !response.status().is_success() {
            tracing::warn!("Synthesis API returned {}", response.status());
            return Ok(None);
        }

        let bytes = response.bytes().await.context("synthesis body read failed")?;
        let duration_ms = (bytes.len() / BYTES_PER_MS) as u64;
        Ok(Some(AudioClip {
            bytes: bytes.to_vec(),
            duration_ms,
        }))
    }
}

/// No-audio synthesizer for tests and keyless deployments.
pub struct SilentSynthesizer;

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn synthesize(&self, _text: &str, _urgency: Urgency) -> Result<Option<AudioClip>> {
        Ok(None)
    }
}

/// Snap-collection conditions as the operator enters them.
///
/// Cooldowns are kept in minutes with at most one decimal place and converted
/// to seconds only when a payload is built. The lost-in-middle edge buffer is
/// a whole-frame percentage in `0..=49`.
use serde::{Deserialize, Serialize};

use crate::bridge::services::{ConditionConfig, ExportedSnapping, SnapConditions};

pub const MAX_EDGE_BUFFER_PCT: f64 = 49.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CooldownCondition {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cooldown_min")]
    pub cooldown_min: f64,
}

impl Default for CooldownCondition {
    fn default() -> Self {
        Self {
            enabled: false,
            cooldown_min: default_cooldown_min(),
        }
    }
}

impl CooldownCondition {
    fn cooldown_ok(&self, allow_zero: bool) -> bool {
        let m = self.cooldown_min;
        m.is_finite() && (m > 0.0 || (allow_zero && m == 0.0)) && has_one_decimal(m)
    }

    fn seconds(&self) -> f64 {
        (self.cooldown_min * 10.0).round() * 6.0
    }

    fn restore(&mut self, exported: Option<ConditionConfig>) {
        let Some(c) = exported else { return };
        self.enabled = c.enabled;
        if let Some(min) = c.cooldown.filter(|m| m.is_finite() && *m > 0.0) {
            self.cooldown_min = (min * 10.0).round() / 10.0;
        }
    }
}

/// Field order keeps plain values ahead of tables for TOML output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapSettings {
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f64,
    #[serde(default = "default_edge_buffer_pct")]
    pub lost_mid_edge_pct: f64,
    #[serde(default)]
    pub timed: CooldownCondition,
    #[serde(default)]
    pub no_detections: CooldownCondition,
    #[serde(default)]
    pub low_confidence: CooldownCondition,
    #[serde(default)]
    pub lost_mid: CooldownCondition,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            low_confidence_threshold: default_low_confidence_threshold(),
            lost_mid_edge_pct: default_edge_buffer_pct(),
            timed: CooldownCondition::default(),
            no_detections: CooldownCondition::default(),
            low_confidence: CooldownCondition::default(),
            lost_mid: CooldownCondition::default(),
        }
    }
}

fn default_cooldown_min() -> f64 {
    5.0
}

fn default_low_confidence_threshold() -> f64 {
    0.30
}

fn default_edge_buffer_pct() -> f64 {
    20.0
}

fn has_one_decimal(v: f64) -> bool {
    ((v * 10.0).round() - v * 10.0).abs() < 1e-9
}

pub fn threshold_ok(t: f64) -> bool {
    (0.0..=1.0).contains(&t)
}

pub fn edge_buffer_ok(pct: f64) -> bool {
    (0.0..=MAX_EDGE_BUFFER_PCT).contains(&pct)
}

impl SnapSettings {
    /// First problem that blocks starting, as shown to the operator.
    pub fn problem(&self) -> Option<&'static str> {
        if self.timed.enabled && !self.timed.cooldown_ok(false) {
            return Some("Please enter a positive timing cooldown (minutes, max 1 decimal).");
        }
        if self.no_detections.enabled && !self.no_detections.cooldown_ok(true) {
            return Some("Please enter a non-negative no-detections cooldown (minutes, max 1 decimal).");
        }
        if self.low_confidence.enabled {
            if !self.low_confidence.cooldown_ok(true) {
                return Some("Please enter a non-negative low-confidence cooldown (minutes, max 1 decimal).");
            }
            if !threshold_ok(self.low_confidence_threshold) {
                return Some("Confidence threshold must be between 0.00 and 1.00.");
            }
        }
        if self.lost_mid.enabled {
            if !self.lost_mid.cooldown_ok(true) {
                return Some("Please enter a non-negative lost-in-middle cooldown (minutes, max 1 decimal).");
            }
            if !edge_buffer_ok(self.lost_mid_edge_pct) {
                return Some("Edge buffer must be between 0% and 49%.");
            }
        }
        None
    }

    fn margin(&self) -> f64 {
        self.lost_mid_edge_pct.clamp(0.0, MAX_EDGE_BUFFER_PCT) / 100.0
    }

    fn timed_config(&self) -> ConditionConfig {
        if !self.timed.enabled {
            return ConditionConfig::disabled();
        }
        ConditionConfig {
            enabled: true,
            cooldown: Some(self.timed.seconds()),
            ..Default::default()
        }
    }

    fn no_detections_config(&self) -> ConditionConfig {
        if !self.no_detections.enabled {
            return ConditionConfig::disabled();
        }
        ConditionConfig {
            enabled: true,
            cooldown: Some(self.no_detections.seconds()),
            ..Default::default()
        }
    }

    fn low_confidence_config(&self) -> ConditionConfig {
        if !self.low_confidence.enabled {
            return ConditionConfig::disabled();
        }
        ConditionConfig {
            enabled: true,
            cooldown: Some(self.low_confidence.seconds()),
            threshold: Some(self.low_confidence_threshold),
            margin: None,
        }
    }

    fn lost_mid_config(&self) -> ConditionConfig {
        if !self.lost_mid.enabled {
            return ConditionConfig::disabled();
        }
        ConditionConfig {
            enabled: true,
            cooldown: Some(self.lost_mid.seconds()),
            threshold: None,
            margin: Some(self.margin()),
        }
    }

    pub fn start_payload(&self) -> SnapConditions {
        SnapConditions {
            timed: Some(self.timed_config()),
            no_detections: Some(self.no_detections_config()),
            low_confidence: Some(self.low_confidence_config()),
            lost_mid: Some(self.lost_mid_config()),
        }
    }

    pub fn stop_payload() -> SnapConditions {
        SnapConditions {
            timed: Some(ConditionConfig::disabled()),
            no_detections: Some(ConditionConfig::disabled()),
            low_confidence: Some(ConditionConfig::disabled()),
            lost_mid: Some(ConditionConfig::disabled()),
        }
    }

    /// Live update for a running session; `None` when the condition is off or invalid.
    pub fn low_confidence_update(&self) -> Option<SnapConditions> {
        if !self.low_confidence.enabled
            || !self.low_confidence.cooldown_ok(true)
            || !threshold_ok(self.low_confidence_threshold)
        {
            return None;
        }
        Some(SnapConditions {
            low_confidence: Some(self.low_confidence_config()),
            ..Default::default()
        })
    }

    pub fn lost_mid_update(&self) -> Option<SnapConditions> {
        if !self.lost_mid.enabled || !self.lost_mid.cooldown_ok(true) || !edge_buffer_ok(self.lost_mid_edge_pct) {
            return None;
        }
        Some(SnapConditions {
            lost_mid: Some(self.lost_mid_config()),
            ..Default::default()
        })
    }

    /// Adopt an Export Service snapshot. Cooldowns there are already in minutes.
    pub fn restore(&mut self, exported: &ExportedSnapping) {
        let c = &exported.conditions;
        self.timed.restore(c.timed);
        self.no_detections.restore(c.no_detections);
        self.low_confidence.restore(c.low_confidence);
        if let Some(t) = c.low_confidence.and_then(|l| l.threshold) {
            self.low_confidence_threshold = t;
        }
        self.lost_mid.restore(c.lost_mid);
        if let Some(m) = c.lost_mid.and_then(|l| l.margin) {
            self.lost_mid_edge_pct = (m * 100.0).round();
        }
    }
}

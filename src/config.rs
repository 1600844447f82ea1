use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

pub const PARAMS_MODEL_TAG: &str = "srs_epa_lite_v1";

/// Tunables for the team-strength engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthParams {
    /// Floor weight for garbage-time plays.
    pub w_min: f64,
    pub half_life_weeks: f64,
    /// Strength of the schedule correction.
    pub beta: f64,
    pub min_eff_plays: f64,
    pub keep_components: bool,
}

impl Default for StrengthParams {
    fn default() -> Self {
        Self {
            w_min: 0.25,
            half_life_weeks: 4.0,
            beta: 0.7,
            min_eff_plays: 20.0,
            keep_components: true,
        }
    }
}

impl StrengthParams {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(0.0..=1.0).contains(&self.w_min) {
            return Err(PipelineError::Config(format!(
                "w_min must be within [0, 1], got {}",
                self.w_min
            )));
        }
        if !self.half_life_weeks.is_finite() || self.half_life_weeks <= 0.0 {
            return Err(PipelineError::Config(format!(
                "half_life_weeks must be positive, got {}",
                self.half_life_weeks
            )));
        }
        if !self.beta.is_finite() {
            return Err(PipelineError::Config("beta must be finite".to_string()));
        }
        if !self.min_eff_plays.is_finite() || self.min_eff_plays < 0.0 {
            return Err(PipelineError::Config(format!(
                "min_eff_plays must be non-negative, got {}",
                self.min_eff_plays
            )));
        }
        Ok(())
    }

    /// EWMA decay derived from the half-life: `1 - 2^(-1/H)`.
    pub fn alpha(&self) -> f64 {
        1.0 - 2f64.powf(-1.0 / self.half_life_weeks)
    }

    pub fn version_tag(&self) -> String {
        format!(
            "{PARAMS_MODEL_TAG}|wmin={}|hl={}|beta={}|minplays={}|comp={}",
            self.w_min,
            self.half_life_weeks,
            self.beta,
            self.min_eff_plays,
            u8::from(self.keep_components)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjuryMode {
    StatusWeighted,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjuryWeights {
    pub out: f64,
    pub doubtful: f64,
    pub questionable: f64,
}

impl Default for InjuryWeights {
    fn default() -> Self {
        Self {
            out: 1.0,
            doubtful: 0.7,
            questionable: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushPolicy {
    /// A push (margin exactly equal to the spread) counts as covered.
    PushCovers,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QbPriorPolicy {
    RegWeekOne,
    RegWeekOneAndPost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    pub injury_mode: InjuryMode,
    pub injury_weights: InjuryWeights,
    pub push_policy: PushPolicy,
    pub qb_prior_policy: QbPriorPolicy,
    pub fallback_temp_f: f64,
    pub fallback_wind_mph: f64,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            injury_mode: InjuryMode::StatusWeighted,
            injury_weights: InjuryWeights::default(),
            push_policy: PushPolicy::PushCovers,
            qb_prior_policy: QbPriorPolicy::RegWeekOne,
            fallback_temp_f: 60.0,
            fallback_wind_mph: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub strength: StrengthParams,
    #[serde(default)]
    pub assembler: AssemblerConfig,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strength: StrengthParams::default(),
            assembler: AssemblerConfig::default(),
            data_dir: default_data_dir(),
            db_path: default_db_path(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/warehouse.sqlite")
}

impl PipelineConfig {
    /// Defaults, then the optional JSON file, then `GRIDIRON_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let mut cfg = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("read config {}", path.display()))?;
                serde_json::from_str::<PipelineConfig>(&raw)
                    .with_context(|| format!("parse config {}", path.display()))?
            }
            None => PipelineConfig::default(),
        };
        cfg.apply_env();
        cfg.strength.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_f64("GRIDIRON_W_MIN") {
            self.strength.w_min = v;
        }
        if let Some(v) = env_f64("GRIDIRON_HALF_LIFE") {
            self.strength.half_life_weeks = v;
        }
        if let Some(v) = env_f64("GRIDIRON_BETA") {
            self.strength.beta = v;
        }
        if let Some(v) = env_f64("GRIDIRON_MIN_EFF_PLAYS") {
            self.strength.min_eff_plays = v;
        }
        if let Ok(raw) = std::env::var("GRIDIRON_KEEP_COMPONENTS") {
            self.strength.keep_components = matches!(raw.trim(), "1" | "true" | "yes");
        }
        if let Ok(raw) = std::env::var("GRIDIRON_DATA_DIR")
            && !raw.trim().is_empty()
        {
            self.data_dir = PathBuf::from(raw.trim());
        }
        if let Ok(raw) = std::env::var("GRIDIRON_DB")
            && !raw.trim().is_empty()
        {
            self.db_path = PathBuf::from(raw.trim());
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize pipeline config")?;
        fs::write(&tmp, json).context("write pipeline config")?;
        fs::rename(&tmp, path).context("swap pipeline config")?;
        Ok(())
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok()?.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_matches_half_life() {
        let params = StrengthParams::default();
        let alpha = params.alpha();
        assert!((alpha - 0.159_103_584_746_285_46).abs() < 1e-12);
        // After H weeks of pure decay the weight on the old value halves.
        let remaining = (1.0 - alpha).powf(params.half_life_weeks);
        assert!((remaining - 0.5).abs() < 1e-12);
    }

    #[test]
    fn invalid_params_rejected() {
        let params = StrengthParams {
            half_life_weeks: 0.0,
            ..StrengthParams::default()
        };
        assert!(params.validate().is_err());
        let params = StrengthParams {
            w_min: 1.5,
            ..StrengthParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn version_tag_encodes_tunables() {
        let tag = StrengthParams::default().version_tag();
        assert_eq!(tag, "srs_epa_lite_v1|wmin=0.25|hl=4|beta=0.7|minplays=20|comp=1");
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::AnalysisError;
use crate::exercise::{BilateralPolicy, ExerciseKind};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// 解析コアのパラメータ。ファイルや環境変数には依存しない
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// ランドマークを採用する最小 visibility
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// ステージ遷移を確定するのに必要な連続有効フレーム数
    #[serde(default = "default_hysteresis_frames")]
    pub hysteresis_frames: usize,
    /// 分類ウィンドウのフレーム数 (30fps で約1秒)
    #[serde(default = "default_classifier_window_frames")]
    pub classifier_window_frames: usize,
    /// 分類を実行する間隔（フレーム）
    #[serde(default = "default_classifier_stride_frames")]
    pub classifier_stride_frames: usize,
    /// これ未満の最大スコアは Unknown 扱い
    #[serde(default = "default_classifier_confidence_floor")]
    pub classifier_confidence_floor: f32,
    /// 種目切替に必要な連続一致ウィンドウ数
    #[serde(default = "default_switch_debounce_windows")]
    pub switch_debounce_windows: usize,
    /// 両腕種目のレップ計数ポリシー
    #[serde(default)]
    pub bilateral_policy: BilateralPolicy,
    /// 取得スレッド → 解析の受け渡しバッファ深さ (1〜2)
    #[serde(default = "default_handoff_depth")]
    pub handoff_depth: usize,
    /// 種目ごとの角度閾値
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

/// 関節角度の閾値ペア（度）
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ThresholdPair {
    /// この角度以上で「伸展」
    pub extended: f32,
    /// この角度以下で「屈曲」
    pub flexed: f32,
}

impl ThresholdPair {
    pub const fn new(extended: f32, flexed: f32) -> Self {
        Self { extended, flexed }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdsConfig {
    #[serde(default = "default_bicep_curl")]
    pub bicep_curl: ThresholdPair,
    #[serde(default = "default_push_up")]
    pub push_up: ThresholdPair,
    #[serde(default = "default_squat")]
    pub squat: ThresholdPair,
    #[serde(default = "default_shoulder_press")]
    pub shoulder_press: ThresholdPair,
}

impl ThresholdsConfig {
    pub fn get(&self, kind: ExerciseKind) -> ThresholdPair {
        match kind {
            ExerciseKind::BicepCurl => self.bicep_curl,
            ExerciseKind::PushUp => self.push_up,
            ExerciseKind::Squat => self.squat,
            ExerciseKind::ShoulderPress => self.shoulder_press,
        }
    }
}

fn default_visibility_threshold() -> f32 { 0.5 }
fn default_hysteresis_frames() -> usize { 2 }
fn default_classifier_window_frames() -> usize { 30 }
fn default_classifier_stride_frames() -> usize { 15 }
fn default_classifier_confidence_floor() -> f32 { 0.4 }
fn default_switch_debounce_windows() -> usize { 3 }
fn default_handoff_depth() -> usize { 2 }
fn default_bicep_curl() -> ThresholdPair { ThresholdPair::new(160.0, 40.0) }
fn default_push_up() -> ThresholdPair { ThresholdPair::new(160.0, 90.0) }
fn default_squat() -> ThresholdPair { ThresholdPair::new(160.0, 90.0) }
fn default_shoulder_press() -> ThresholdPair { ThresholdPair::new(160.0, 90.0) }

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            bicep_curl: default_bicep_curl(),
            push_up: default_push_up(),
            squat: default_squat(),
            shoulder_press: default_shoulder_press(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: default_visibility_threshold(),
            hysteresis_frames: default_hysteresis_frames(),
            classifier_window_frames: default_classifier_window_frames(),
            classifier_stride_frames: default_classifier_stride_frames(),
            classifier_confidence_floor: default_classifier_confidence_floor(),
            switch_debounce_windows: default_switch_debounce_windows(),
            bilateral_policy: BilateralPolicy::default(),
            handoff_depth: default_handoff_depth(),
            thresholds: ThresholdsConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// 値域チェック
    pub fn validate(&self) -> std::result::Result<(), AnalysisError> {
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(AnalysisError::invalid_config(format!(
                "visibility_threshold must be in [0, 1], got {}",
                self.visibility_threshold
            )));
        }
        if self.hysteresis_frames == 0 {
            return Err(AnalysisError::invalid_config("hysteresis_frames must be >= 1"));
        }
        if self.classifier_window_frames < 2 {
            return Err(AnalysisError::invalid_config("classifier_window_frames must be >= 2"));
        }
        if self.classifier_stride_frames == 0 {
            return Err(AnalysisError::invalid_config("classifier_stride_frames must be >= 1"));
        }
        if !(self.classifier_confidence_floor > 0.0 && self.classifier_confidence_floor <= 1.0) {
            return Err(AnalysisError::invalid_config(format!(
                "classifier_confidence_floor must be in (0, 1], got {}",
                self.classifier_confidence_floor
            )));
        }
        if self.switch_debounce_windows == 0 {
            return Err(AnalysisError::invalid_config("switch_debounce_windows must be >= 1"));
        }
        if !(1..=2).contains(&self.handoff_depth) {
            return Err(AnalysisError::invalid_config(format!(
                "handoff_depth must be 1 or 2, got {}",
                self.handoff_depth
            )));
        }
        for kind in ExerciseKind::ALL {
            let t = self.thresholds.get(kind);
            if !(0.0 <= t.flexed && t.flexed < t.extended && t.extended <= 180.0) {
                return Err(AnalysisError::invalid_config(format!(
                    "{} thresholds must satisfy 0 <= flexed < extended <= 180, got flexed={} extended={}",
                    kind, t.flexed, t.extended
                )));
            }
        }
        Ok(())
    }
}

impl Config {
    /// TOML 文字列から読み込み、値を検証する
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("failed to parse config")?;
        config.analysis.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// ファイルが無ければデフォルト設定。読めるのに不正な場合はエラー
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("invalid config {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("{} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

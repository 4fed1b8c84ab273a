use log::trace;
use serde::{Deserialize, Serialize};

use super::error::DetectionError;
use super::features::{ClassifiedAnalysis, Feature, RawAnalysis};

pub const THRESHOLD_TABLE_VERSION: u32 = 3;

/// 各特征的采样占比阈值
///
/// `count / total_samples` 严格大于阈值时特征成立
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdTable {
    pub version: u32,
    pub plastic_bottle: f32,
    pub transparent_bottle: f32,
    pub bottle_shape: f32,
    pub skin_tone: f32,
    pub fabric: f32,
    pub clothing: f32,
    pub actual_trash: f32,
    pub trash_texture: f32,
    pub crumpled_paper: f32,
    pub paper_texture: f32,
    pub empty_surface: f32,
    pub object_content: f32,
    pub front_view_bottle: f32,
    pub red_label: f32,
    pub bottle_cap: f32,
    pub reflective_surface: f32,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            version: THRESHOLD_TABLE_VERSION,
            plastic_bottle: 0.05,
            transparent_bottle: 0.12,
            bottle_shape: 0.08,
            skin_tone: 0.04,
            fabric: 0.15,
            clothing: 0.20,
            actual_trash: 0.12,
            trash_texture: 0.05,
            crumpled_paper: 0.08,
            paper_texture: 0.04,
            empty_surface: 0.30,
            object_content: 0.15,
            front_view_bottle: 0.08,
            red_label: 0.03,
            bottle_cap: 0.02,
            reflective_surface: 0.05,
        }
    }
}

impl ThresholdTable {
    pub fn get(&self, feature: Feature) -> f32 {
        match feature {
            Feature::PlasticBottle => self.plastic_bottle,
            Feature::TransparentBottle => self.transparent_bottle,
            Feature::BottleShape => self.bottle_shape,
            Feature::SkinTone => self.skin_tone,
            Feature::Fabric => self.fabric,
            Feature::Clothing => self.clothing,
            Feature::ActualTrash => self.actual_trash,
            Feature::TrashTexture => self.trash_texture,
            Feature::CrumpledPaper => self.crumpled_paper,
            Feature::PaperTexture => self.paper_texture,
            Feature::EmptySurface => self.empty_surface,
            Feature::ObjectContent => self.object_content,
            Feature::FrontViewBottle => self.front_view_bottle,
            Feature::RedLabel => self.red_label,
            Feature::BottleCap => self.bottle_cap,
            Feature::ReflectiveSurface => self.reflective_surface,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f32) {
        let slot = match feature {
            Feature::PlasticBottle => &mut self.plastic_bottle,
            Feature::TransparentBottle => &mut self.transparent_bottle,
            Feature::BottleShape => &mut self.bottle_shape,
            Feature::SkinTone => &mut self.skin_tone,
            Feature::Fabric => &mut self.fabric,
            Feature::Clothing => &mut self.clothing,
            Feature::ActualTrash => &mut self.actual_trash,
            Feature::TrashTexture => &mut self.trash_texture,
            Feature::CrumpledPaper => &mut self.crumpled_paper,
            Feature::PaperTexture => &mut self.paper_texture,
            Feature::EmptySurface => &mut self.empty_surface,
            Feature::ObjectContent => &mut self.object_content,
            Feature::FrontViewBottle => &mut self.front_view_bottle,
            Feature::RedLabel => &mut self.red_label,
            Feature::BottleCap => &mut self.bottle_cap,
            Feature::ReflectiveSurface => &mut self.reflective_surface,
        };
        *slot = value;
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        for feature in Feature::ALL {
            let value = self.get(feature);
            if !(value > 0.0 && value < 1.0) {
                return Err(DetectionError::Config(format!(
                    "threshold {} must be within (0, 1), got {}",
                    feature, value
                )));
            }
        }
        Ok(())
    }

    /// 原始计数 → 特征标志
    ///
    /// 无采样时全部为 false
    pub fn classify(&self, raw: &RawAnalysis) -> ClassifiedAnalysis {
        let mut classified = ClassifiedAnalysis::none();
        for feature in Feature::ALL {
            if let Some(fraction) = raw.fraction(feature) {
                classified.set(feature, fraction > self.get(feature));
            }
        }
        trace!("classified (v{}): {:?}", self.version, classified.active());
        classified
    }
}

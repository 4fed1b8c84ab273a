use std::fmt;

use super::error::DetectionError;

/// 像素启发式特征
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    PlasticBottle,
    TransparentBottle,
    BottleShape,
    SkinTone,
    Fabric,
    Clothing,
    ActualTrash,
    TrashTexture,
    CrumpledPaper,
    PaperTexture,
    EmptySurface,
    ObjectContent,
    FrontViewBottle,
    RedLabel,
    BottleCap,
    ReflectiveSurface,
}

impl Feature {
    pub const COUNT: usize = 16;

    pub const ALL: [Feature; Feature::COUNT] = [
        Feature::PlasticBottle,
        Feature::TransparentBottle,
        Feature::BottleShape,
        Feature::SkinTone,
        Feature::Fabric,
        Feature::Clothing,
        Feature::ActualTrash,
        Feature::TrashTexture,
        Feature::CrumpledPaper,
        Feature::PaperTexture,
        Feature::EmptySurface,
        Feature::ObjectContent,
        Feature::FrontViewBottle,
        Feature::RedLabel,
        Feature::BottleCap,
        Feature::ReflectiveSurface,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// camelCase 键名（阈值表和报告共用）
    pub fn key(self) -> &'static str {
        match self {
            Feature::PlasticBottle => "plasticBottle",
            Feature::TransparentBottle => "transparentBottle",
            Feature::BottleShape => "bottleShape",
            Feature::SkinTone => "skinTone",
            Feature::Fabric => "fabric",
            Feature::Clothing => "clothing",
            Feature::ActualTrash => "actualTrash",
            Feature::TrashTexture => "trashTexture",
            Feature::CrumpledPaper => "crumpledPaper",
            Feature::PaperTexture => "paperTexture",
            Feature::EmptySurface => "emptySurface",
            Feature::ObjectContent => "objectContent",
            Feature::FrontViewBottle => "frontViewBottle",
            Feature::RedLabel => "redLabel",
            Feature::BottleCap => "bottleCap",
            Feature::ReflectiveSurface => "reflectiveSurface",
        }
    }

    pub fn from_key(key: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 单帧各特征的像素计数
///
/// 每个计数都在 `0..=total_samples` 内
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAnalysis {
    counts: [u32; Feature::COUNT],
    total_samples: u32,
}

impl RawAnalysis {
    pub fn empty(total_samples: u32) -> Self {
        Self {
            counts: [0; Feature::COUNT],
            total_samples,
        }
    }

    pub fn from_counts(
        total_samples: u32,
        counts: &[(Feature, u32)],
    ) -> Result<Self, DetectionError> {
        let mut analysis = Self::empty(total_samples);
        for &(feature, count) in counts {
            if count > total_samples {
                return Err(DetectionError::InvalidAnalysis(format!(
                    "{} count {} exceeds {} samples",
                    feature, count, total_samples
                )));
            }
            analysis.counts[feature.index()] = count;
        }
        Ok(analysis)
    }

    pub(crate) fn increment(&mut self, feature: Feature) {
        self.counts[feature.index()] += 1;
    }

    pub fn count(&self, feature: Feature) -> u32 {
        self.counts[feature.index()]
    }

    pub fn total_samples(&self) -> u32 {
        self.total_samples
    }

    /// 无采样时返回 `None`
    pub fn fraction(&self, feature: Feature) -> Option<f32> {
        if self.total_samples == 0 {
            return None;
        }
        Some(self.count(feature) as f32 / self.total_samples as f32)
    }

    pub fn is_degenerate(&self) -> bool {
        self.total_samples == 0
    }
}

/// 单帧特征标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassifiedAnalysis {
    flags: [bool; Feature::COUNT],
}

impl ClassifiedAnalysis {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_flags(features: &[Feature]) -> Self {
        let mut flags = [false; Feature::COUNT];
        for feature in features {
            flags[feature.index()] = true;
        }
        Self { flags }
    }

    pub(crate) fn set(&mut self, feature: Feature, value: bool) {
        self.flags[feature.index()] = value;
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.flags[feature.index()]
    }

    pub fn any(&self) -> bool {
        self.flags.iter().any(|&f| f)
    }

    pub fn active(&self) -> Vec<Feature> {
        Feature::ALL.into_iter().filter(|f| self.has(*f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_keys_round_trip() {
        for (i, feature) in Feature::ALL.into_iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(Feature::from_key(feature.key()), Some(feature));
        }
        assert_eq!(Feature::from_key("bogus"), None);
    }

    #[test]
    fn test_from_counts_rejects_overflow() {
        let err = RawAnalysis::from_counts(10, &[(Feature::SkinTone, 11)]);
        assert!(matches!(err, Err(DetectionError::InvalidAnalysis(_))));
    }

    #[test]
    fn test_fraction_guards_zero_samples() {
        let analysis = RawAnalysis::empty(0);
        assert!(analysis.is_degenerate());
        assert_eq!(analysis.fraction(Feature::PlasticBottle), None);

        let analysis = RawAnalysis::from_counts(100, &[(Feature::PlasticBottle, 20)]).unwrap();
        assert_eq!(analysis.fraction(Feature::PlasticBottle), Some(0.2));
    }
}

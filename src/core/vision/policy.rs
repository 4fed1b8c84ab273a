//! 决策规则 - 特征标志 → 检测结果
//!
//! 先收集正常物品（手、衣物、空桌面），只要有一个就不再检查垃圾。
//! 垃圾规则都是组合条件，单一颜色信号不会产生标签

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::features::{ClassifiedAnalysis, Feature};
use super::verdict::{DetectionVerdict, VerdictBuilder};

pub const PERSON_HAND: &str = "person/hand";
pub const CLOTHING: &str = "clothing/hat";
const CLOTHING_LABEL: &str = "clothing";
pub const EMPTY_SURFACE: &str = "empty surface";
pub const PLASTIC_BOTTLE: &str = "plastic bottle";
pub const TRANSPARENT_BOTTLE: &str = "transparent bottle";
pub const FRONT_VIEW_BOTTLE: &str = "bottle";
pub const TRASH_ITEM: &str = "trash item";
pub const CRUMPLED_PAPER: &str = "crumpled paper";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionPolicy {
    /// 是否识别正面瓶子（需要瓶盖、红色标签或反光佐证）
    pub front_view_bottles: bool,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            front_view_bottles: true,
        }
    }
}

impl DecisionPolicy {
    pub fn decide(&self, a: &ClassifiedAnalysis) -> DetectionVerdict {
        let mut verdict = VerdictBuilder::default();

        if a.has(Feature::SkinTone) {
            verdict.normal(PERSON_HAND);
            debug!("👤 person/hand - safe item");
        }
        if a.has(Feature::Fabric) || a.has(Feature::Clothing) {
            verdict.normal_as(CLOTHING, CLOTHING_LABEL);
            debug!("👕 clothing - safe item");
        }
        if a.has(Feature::EmptySurface) && !a.has(Feature::ObjectContent) {
            verdict.normal(EMPTY_SURFACE);
            debug!("📋 empty surface - safe");
        }
        if verdict.has_normal() {
            return verdict.build();
        }

        if !a.has(Feature::ObjectContent) {
            return verdict.build();
        }

        if let Some(bottle) = self.bottle(a) {
            verdict.trash(bottle);
            info!("🗑️ {} detected", bottle);
        }
        if a.has(Feature::ActualTrash) && a.has(Feature::TrashTexture) {
            verdict.trash(TRASH_ITEM);
            info!("🗑️ trash item detected");
        }
        if a.has(Feature::CrumpledPaper) && a.has(Feature::PaperTexture) {
            verdict.trash(CRUMPLED_PAPER);
            info!("🗑️ crumpled paper detected");
        }

        verdict.build()
    }

    fn bottle(&self, a: &ClassifiedAnalysis) -> Option<&'static str> {
        if !a.has(Feature::BottleShape) {
            return None;
        }
        if a.has(Feature::PlasticBottle) {
            Some(PLASTIC_BOTTLE)
        } else if a.has(Feature::TransparentBottle) {
            Some(TRANSPARENT_BOTTLE)
        } else if self.front_view_bottles
            && a.has(Feature::FrontViewBottle)
            && (a.has(Feature::BottleCap)
                || a.has(Feature::RedLabel)
                || a.has(Feature::ReflectiveSurface))
        {
            Some(FRONT_VIEW_BOTTLE)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Feature::*;

    fn decide(flags: &[Feature]) -> DetectionVerdict {
        DecisionPolicy::default().decide(&ClassifiedAnalysis::from_flags(flags))
    }

    #[test]
    fn test_nothing_fired() {
        let verdict = decide(&[]);
        assert_eq!(verdict, DetectionVerdict::default());
    }

    #[test]
    fn test_normal_item_vetoes_trash() {
        let verdict = decide(&[SkinTone, PlasticBottle, BottleShape, ObjectContent]);
        assert_eq!(verdict.normal_items, vec!["person/hand"]);
        assert_eq!(verdict.all_labels, vec!["person/hand detected"]);
        assert!(verdict.trash_items.is_empty());
        assert!(!verdict.trash_detected);
    }

    #[test]
    fn test_skin_and_clothing_both_reported() {
        let verdict = decide(&[SkinTone, Fabric]);
        assert_eq!(verdict.normal_items, vec!["person/hand", "clothing/hat"]);
        assert_eq!(
            verdict.all_labels,
            vec!["person/hand detected", "clothing detected"]
        );
    }

    #[test]
    fn test_skin_and_empty_surface_both_reported() {
        let verdict = decide(&[SkinTone, EmptySurface]);
        assert_eq!(verdict.normal_items, vec!["person/hand", "empty surface"]);
        assert_eq!(
            verdict.all_labels,
            vec!["person/hand detected", "empty surface detected"]
        );

        let verdict = decide(&[Fabric, EmptySurface, PlasticBottle, BottleShape]);
        assert_eq!(verdict.normal_items, vec!["clothing/hat", "empty surface"]);
        assert!(!verdict.trash_detected);
    }

    #[test]
    fn test_empty_surface_short_circuits() {
        let verdict = decide(&[EmptySurface, PlasticBottle, BottleShape]);
        assert_eq!(verdict.normal_items, vec!["empty surface"]);
        assert!(!verdict.trash_detected);
    }

    #[test]
    fn test_surface_with_content_is_not_empty() {
        let verdict = decide(&[EmptySurface, ObjectContent, PlasticBottle, BottleShape]);
        assert!(verdict.normal_items.is_empty());
        assert_eq!(verdict.trash_items, vec!["plastic bottle"]);
    }

    #[test]
    fn test_bottle_requires_shape() {
        let verdict = decide(&[PlasticBottle, ObjectContent]);
        assert!(verdict.is_empty());
        assert!(!verdict.trash_detected);
    }

    #[test]
    fn test_trash_requires_object_content() {
        let verdict = decide(&[PlasticBottle, BottleShape]);
        assert!(verdict.is_empty());
    }

    #[test]
    fn test_plastic_bottle_verdict() {
        let verdict = decide(&[PlasticBottle, BottleShape, ObjectContent]);
        assert!(verdict.trash_detected);
        assert_eq!(verdict.trash_items, vec!["plastic bottle"]);
        assert_eq!(verdict.all_labels, vec!["plastic bottle detected"]);
    }

    #[test]
    fn test_single_bottle_label_per_frame() {
        let verdict = decide(&[
            PlasticBottle,
            TransparentBottle,
            FrontViewBottle,
            BottleCap,
            BottleShape,
            ObjectContent,
        ]);
        assert_eq!(verdict.trash_items, vec!["plastic bottle"]);
    }

    #[test]
    fn test_front_view_bottle_needs_cue() {
        assert!(decide(&[FrontViewBottle, BottleShape, ObjectContent]).is_empty());

        let verdict = decide(&[FrontViewBottle, RedLabel, BottleShape, ObjectContent]);
        assert_eq!(verdict.trash_items, vec!["bottle"]);

        let policy = DecisionPolicy {
            front_view_bottles: false,
        };
        let flags = ClassifiedAnalysis::from_flags(&[
            FrontViewBottle,
            RedLabel,
            BottleShape,
            ObjectContent,
        ]);
        assert!(policy.decide(&flags).is_empty());
    }

    #[test]
    fn test_compound_trash_and_paper() {
        let verdict = decide(&[
            ActualTrash,
            TrashTexture,
            CrumpledPaper,
            PaperTexture,
            ObjectContent,
        ]);
        assert_eq!(verdict.trash_items, vec!["trash item", "crumpled paper"]);
        assert_eq!(
            verdict.all_labels,
            vec!["trash item detected", "crumpled paper detected"]
        );

        assert!(decide(&[ActualTrash, ObjectContent]).is_empty());
        assert!(decide(&[CrumpledPaper, ObjectContent]).is_empty());
    }
}

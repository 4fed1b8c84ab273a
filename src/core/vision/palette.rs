//! 各特征的颜色范围规则
//!
//! 这些数值是调参数据，可以和阈值表一起从 JSON 加载，
//! 调整边界无需改动提取循环

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::error::DetectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    R,
    G,
    B,
}

/// 采样像素颜色（忽略 alpha）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn channel(self, channel: Channel) -> i16 {
        match channel {
            Channel::R => self.r as i16,
            Channel::G => self.g as i16,
            Channel::B => self.b as i16,
        }
    }
}

/// 单通道开区间：`above < value < below`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<u8>,
}

impl Span {
    pub const ANY: Span = Span {
        above: None,
        below: None,
    };

    pub const fn gt(above: u8) -> Self {
        Span {
            above: Some(above),
            below: None,
        }
    }

    pub const fn lt(below: u8) -> Self {
        Span {
            above: None,
            below: Some(below),
        }
    }

    pub const fn between(above: u8, below: u8) -> Self {
        Span {
            above: Some(above),
            below: Some(below),
        }
    }

    fn contains(self, value: u8) -> bool {
        self.above.map_or(true, |a| value > a) && self.below.map_or(true, |b| value < b)
    }

    fn is_satisfiable(self) -> bool {
        match (self.above, self.below) {
            (Some(a), Some(b)) => (a as u16) + 1 < b as u16,
            (Some(a), None) => a < u8::MAX,
            (None, Some(b)) => b > 0,
            (None, None) => true,
        }
    }
}

/// 同一像素两个通道之间的关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Relation {
    /// `|a - b| < limit`
    Near { a: Channel, b: Channel, limit: i16 },
    /// `|a - b| > margin`
    Apart { a: Channel, b: Channel, margin: i16 },
    /// `a - b > margin`
    Exceeds { a: Channel, b: Channel, margin: i16 },
}

impl Relation {
    fn holds(self, px: Rgb) -> bool {
        match self {
            Relation::Near { a, b, limit } => (px.channel(a) - px.channel(b)).abs() < limit,
            Relation::Apart { a, b, margin } => (px.channel(a) - px.channel(b)).abs() > margin,
            Relation::Exceeds { a, b, margin } => px.channel(a) - px.channel(b) > margin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorClause {
    #[serde(default)]
    pub r: Span,
    #[serde(default)]
    pub g: Span,
    #[serde(default)]
    pub b: Span,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl ColorClause {
    pub fn new(r: Span, g: Span, b: Span, relations: &[Relation]) -> Self {
        Self {
            r,
            g,
            b,
            relations: relations.to_vec(),
        }
    }

    pub fn matches(&self, px: Rgb) -> bool {
        self.r.contains(px.r)
            && self.g.contains(px.g)
            && self.b.contains(px.b)
            && self.relations.iter().all(|rel| rel.holds(px))
    }
}

/// 任一子句匹配即命中
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorRule {
    pub clauses: Vec<ColorClause>,
}

impl ColorRule {
    pub fn any_of(clauses: Vec<ColorClause>) -> Self {
        Self { clauses }
    }

    pub fn matches(&self, px: Rgb) -> bool {
        self.clauses.iter().any(|c| c.matches(px))
    }
}

/// 纹理相关特征的邻居差值参数（R 通道）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextureParams {
    /// 直接邻居差值小于此值：垂直一致
    pub shape_tolerance: i16,
    /// 邻居两两差值小于此值：连续一致
    pub shape_run_tolerance: i16,
    /// 任一直接邻居差值大于此值：垃圾纹理
    pub trash_contrast: i16,
    /// 纸张纹理的边缘阈值
    pub paper_edge: i16,
    /// 纸张纹理的波纹阈值
    pub paper_ripple: i16,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            shape_tolerance: 15,
            shape_run_tolerance: 20,
            trash_contrast: 20,
            paper_edge: 25,
            paper_ripple: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeaturePalette {
    pub empty_surface: ColorRule,
    pub object_content: ColorRule,
    pub red_label: ColorRule,
    pub bottle_cap: ColorRule,
    pub front_view_bottle: ColorRule,
    pub reflective_surface: ColorRule,
    pub transparent_bottle: ColorRule,
    pub plastic_bottle: ColorRule,
    /// 瓶身形状检查的基础颜色
    pub bottle_body: ColorRule,
    pub skin_tone: ColorRule,
    pub fabric: ColorRule,
    pub clothing: ColorRule,
    /// 垃圾颜色及纹理检查的基础颜色
    pub trash_color: ColorRule,
    /// 纸张颜色及纸张纹理的基础颜色
    pub paper_color: ColorRule,
    pub texture: TextureParams,
}

static DEFAULT_PALETTE: Lazy<FeaturePalette> = Lazy::new(FeaturePalette::builtin);

impl Default for FeaturePalette {
    fn default() -> Self {
        DEFAULT_PALETTE.clone()
    }
}

fn near(a: Channel, b: Channel, limit: i16) -> Relation {
    Relation::Near { a, b, limit }
}

fn apart(a: Channel, b: Channel, margin: i16) -> Relation {
    Relation::Apart { a, b, margin }
}

fn exceeds(a: Channel, b: Channel, margin: i16) -> Relation {
    Relation::Exceeds { a, b, margin }
}

fn clause(r: Span, g: Span, b: Span, relations: &[Relation]) -> ColorClause {
    ColorClause::new(r, g, b, relations)
}

impl FeaturePalette {
    fn builtin() -> Self {
        use Channel::{B, G, R};

        let neutral = |limit| [near(R, G, limit), near(G, B, limit), near(R, B, limit)];

        Self {
            empty_surface: ColorRule::any_of(vec![
                // 浅色墙面、桌面
                clause(
                    Span::gt(160),
                    Span::gt(160),
                    Span::gt(160),
                    &[near(R, G, 25), near(G, B, 25)],
                ),
                // 木纹
                clause(
                    Span::between(80, 150),
                    Span::between(80, 150),
                    Span::between(60, 130),
                    &[near(R, G, 20)],
                ),
                // 暗光或暖光
                clause(
                    Span::between(120, 180),
                    Span::between(110, 170),
                    Span::between(90, 150),
                    &[],
                ),
            ]),
            object_content: ColorRule::any_of(vec![
                clause(Span::gt(40), Span::gt(40), Span::gt(40), &[apart(R, G, 8)]),
                clause(Span::gt(40), Span::gt(40), Span::gt(40), &[apart(G, B, 8)]),
                clause(Span::gt(40), Span::gt(40), Span::gt(40), &[apart(R, B, 8)]),
                clause(Span::gt(200), Span::gt(200), Span::gt(200), &[]),
            ]),
            red_label: ColorRule::any_of(vec![
                clause(
                    Span::between(180, 255),
                    Span::lt(100),
                    Span::lt(100),
                    &[exceeds(R, G, 80), exceeds(R, B, 80)],
                ),
                clause(
                    Span::between(150, 220),
                    Span::lt(80),
                    Span::lt(80),
                    &[exceeds(R, G, 70)],
                ),
                clause(
                    Span::gt(200),
                    Span::between(50, 120),
                    Span::between(50, 120),
                    &[exceeds(R, G, 50)],
                ),
            ]),
            bottle_cap: ColorRule::any_of(vec![
                clause(Span::gt(160), Span::lt(80), Span::lt(80), &[exceeds(R, G, 80)]),
                clause(
                    Span::between(120, 180),
                    Span::between(120, 180),
                    Span::between(120, 180),
                    &[near(R, G, 20)],
                ),
                clause(Span::gt(200), Span::gt(200), Span::gt(200), &[near(R, G, 15)]),
            ]),
            front_view_bottle: ColorRule::any_of(vec![
                clause(Span::gt(180), Span::gt(180), Span::gt(180), &[near(R, G, 15)]),
                clause(Span::gt(150), Span::gt(150), Span::gt(200), &[exceeds(B, R, 20)]),
                clause(Span::gt(140), Span::gt(170), Span::gt(140), &[exceeds(G, R, 15)]),
            ]),
            reflective_surface: ColorRule::any_of(vec![
                clause(Span::gt(220), Span::gt(220), Span::gt(220), &[]),
                clause(Span::gt(200), Span::gt(200), Span::gt(240), &[]),
                clause(Span::gt(240), Span::gt(200), Span::gt(200), &[]),
            ]),
            transparent_bottle: ColorRule::any_of(vec![
                clause(Span::gt(200), Span::gt(200), Span::gt(200), &[near(R, G, 15)]),
                clause(Span::gt(180), Span::gt(180), Span::gt(220), &[exceeds(B, R, 15)]),
                clause(Span::gt(180), Span::gt(210), Span::gt(180), &[exceeds(G, R, 15)]),
            ]),
            plastic_bottle: ColorRule::any_of(vec![
                clause(Span::gt(160), Span::lt(90), Span::lt(90), &[exceeds(R, G, 80)]),
                clause(Span::lt(90), Span::lt(90), Span::gt(160), &[exceeds(B, R, 80)]),
                clause(Span::gt(160), Span::gt(160), Span::lt(90), &[exceeds(R, B, 80)]),
                clause(Span::lt(90), Span::gt(160), Span::lt(90), &[exceeds(G, R, 80)]),
            ]),
            bottle_body: ColorRule::any_of(vec![clause(
                Span::gt(100),
                Span::gt(100),
                Span::gt(100),
                &neutral(30),
            )]),
            skin_tone: ColorRule::any_of(vec![clause(
                Span::between(150, 255),
                Span::between(110, 220),
                Span::between(90, 180),
                &[exceeds(G, B, 0), exceeds(R, B, 25), exceeds(R, G, 10)],
            )]),
            fabric: ColorRule::any_of(vec![clause(
                Span::between(50, 140),
                Span::between(50, 140),
                Span::between(50, 140),
                &neutral(25),
            )]),
            clothing: ColorRule::any_of(vec![
                clause(
                    Span::between(120, 160),
                    Span::between(120, 160),
                    Span::between(120, 160),
                    &[],
                ),
                clause(Span::gt(240), Span::gt(240), Span::gt(240), &[]),
            ]),
            trash_color: ColorRule::any_of(vec![
                clause(
                    Span::between(80, 120),
                    Span::between(60, 100),
                    Span::between(40, 80),
                    &[exceeds(R, B, 20)],
                ),
                clause(
                    Span::between(60, 100),
                    Span::between(60, 100),
                    Span::between(60, 100),
                    &[near(R, G, 15)],
                ),
            ]),
            paper_color: ColorRule::any_of(vec![clause(
                Span::gt(180),
                Span::gt(180),
                Span::gt(180),
                &neutral(15),
            )]),
            texture: TextureParams::default(),
        }
    }

    fn rules(&self) -> [(&'static str, &ColorRule); 14] {
        [
            ("emptySurface", &self.empty_surface),
            ("objectContent", &self.object_content),
            ("redLabel", &self.red_label),
            ("bottleCap", &self.bottle_cap),
            ("frontViewBottle", &self.front_view_bottle),
            ("reflectiveSurface", &self.reflective_surface),
            ("transparentBottle", &self.transparent_bottle),
            ("plasticBottle", &self.plastic_bottle),
            ("bottleBody", &self.bottle_body),
            ("skinTone", &self.skin_tone),
            ("fabric", &self.fabric),
            ("clothing", &self.clothing),
            ("trashColor", &self.trash_color),
            ("paperColor", &self.paper_color),
        ]
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        for (name, rule) in self.rules() {
            for (i, c) in rule.clauses.iter().enumerate() {
                for span in [c.r, c.g, c.b] {
                    if !span.is_satisfiable() {
                        return Err(DetectionError::Config(format!(
                            "palette rule {} clause {} has an empty channel span {:?}",
                            name, i, span
                        )));
                    }
                }
            }
        }

        let t = &self.texture;
        let limits = [
            t.shape_tolerance,
            t.shape_run_tolerance,
            t.trash_contrast,
            t.paper_edge,
            t.paper_ripple,
        ];
        if limits.iter().any(|&v| !(0..=255).contains(&v)) {
            return Err(DetectionError::Config(format!(
                "texture limits must be within 0..=255: {:?}",
                t
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_is_open_interval() {
        let span = Span::between(100, 150);
        assert!(!span.contains(100));
        assert!(span.contains(101));
        assert!(span.contains(149));
        assert!(!span.contains(150));
        assert!(Span::ANY.contains(0));
    }

    #[test]
    fn test_default_rules_on_reference_colours() {
        let p = FeaturePalette::default();

        assert!(p.plastic_bottle.matches(Rgb::new(220, 30, 30)));
        assert!(p.plastic_bottle.matches(Rgb::new(30, 30, 220)));
        assert!(!p.plastic_bottle.matches(Rgb::new(128, 128, 128)));

        assert!(p.skin_tone.matches(Rgb::new(200, 150, 120)));
        assert!(!p.skin_tone.matches(Rgb::new(150, 150, 150)));

        assert!(p.fabric.matches(Rgb::new(90, 90, 95)));
        assert!(p.paper_color.matches(Rgb::new(230, 230, 228)));
        assert!(p.reflective_surface.matches(Rgb::new(250, 250, 250)));

        // 纯灰色没有通道差，不算物体内容
        assert!(!p.object_content.matches(Rgb::new(120, 120, 120)));
        assert!(p.object_content.matches(Rgb::new(120, 100, 120)));
    }

    #[test]
    fn test_relations() {
        let px = Rgb::new(200, 150, 120);
        assert!(near(Channel::G, Channel::B, 31).holds(px));
        assert!(!near(Channel::G, Channel::B, 30).holds(px));
        assert!(apart(Channel::B, Channel::R, 79).holds(px));
        assert!(exceeds(Channel::R, Channel::B, 79).holds(px));
        assert!(!exceeds(Channel::B, Channel::R, 0).holds(px));
    }

    #[test]
    fn test_validate_rejects_empty_span() {
        let mut palette = FeaturePalette::default();
        palette.fabric.clauses[0].r = Span::between(140, 141);
        assert!(palette.validate().is_err());

        let mut palette = FeaturePalette::default();
        palette.texture.paper_edge = -1;
        assert!(palette.validate().is_err());

        assert!(FeaturePalette::default().validate().is_ok());
    }

    #[test]
    fn test_palette_json_round_trip() {
        let palette = FeaturePalette::default();
        let json = serde_json::to_string(&palette).unwrap();
        let parsed: FeaturePalette = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, palette);
    }
}

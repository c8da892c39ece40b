//! Typed attribute values and channel layout descriptions

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A snapshot value for a single node attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    /// Enumerated option, written as a bare protocol token
    Enum(String),
    String(String),
    /// Reference to another exported entity by identity
    Reference(String),
}

impl Value {
    /// Channel arity of this value
    pub fn layout(&self) -> ChannelLayout {
        match self {
            Value::Vec2(_) => ChannelLayout::Vec2,
            Value::Vec3(_) => ChannelLayout::Vec3,
            Value::Vec4(_) => ChannelLayout::Vec4,
            _ => ChannelLayout::Scalar,
        }
    }

    /// Generic dirty-compare used uniformly by every refresh site.
    ///
    /// Floats compare exactly, with no epsilon tolerance. Trivial numeric
    /// noise therefore re-flags a value as changed; matching the behavior
    /// the renderer protocol was tuned against.
    pub fn differs(&self, other: &Value) -> bool {
        self != other
    }
}

/// Arity of a slot or producer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
}

impl ChannelLayout {
    /// Number of components carried by this layout
    pub fn arity(&self) -> usize {
        match self {
            ChannelLayout::Scalar => 1,
            ChannelLayout::Vec2 => 2,
            ChannelLayout::Vec3 => 3,
            ChannelLayout::Vec4 => 4,
        }
    }

    /// Whether this layout carries more than one component
    pub fn is_compound(&self) -> bool {
        !matches!(self, ChannelLayout::Scalar)
    }
}

/// Basis/interpretation of a compound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpretation {
    Rgb,
    Hsv,
    Xyz,
    Uvw,
}

impl Interpretation {
    /// Component selector letters for this interpretation, in slot order
    pub fn components(&self) -> &'static [char] {
        match self {
            Interpretation::Rgb => &['r', 'g', 'b', 'a'],
            Interpretation::Hsv => &['h', 's', 'v'],
            Interpretation::Xyz => &['x', 'y', 'z', 'w'],
            Interpretation::Uvw => &['u', 'v', 'w'],
        }
    }

    /// Selector letter for the first component
    pub fn first_component(&self) -> char {
        self.components()[0]
    }
}

/// Full channel description of a slot or producer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub layout: ChannelLayout,
    pub interpretation: Interpretation,
}

impl Channel {
    /// Creates a channel description
    pub fn new(layout: ChannelLayout, interpretation: Interpretation) -> Self {
        Self { layout, interpretation }
    }

    /// Scalar channel; interpretation is irrelevant for single components
    pub fn scalar() -> Self {
        Self::new(ChannelLayout::Scalar, Interpretation::Xyz)
    }

    /// Derives a channel description from a literal value.
    ///
    /// Three-component values default to RGB, two-component to UVW; callers
    /// that know better supply an explicit channel instead.
    pub fn of(value: &Value) -> Self {
        let layout = value.layout();
        let interpretation = match layout {
            ChannelLayout::Vec2 => Interpretation::Uvw,
            ChannelLayout::Vec3 | ChannelLayout::Vec4 => Interpretation::Rgb,
            ChannelLayout::Scalar => Interpretation::Xyz,
        };
        Self::new(layout, interpretation)
    }

    /// Whether a producer of this channel can feed a consumer of `other`
    /// directly, without any adapter. Scalars ignore interpretation.
    pub fn matches(&self, other: &Channel) -> bool {
        self.layout == other.layout
            && (self.layout == ChannelLayout::Scalar || self.interpretation == other.interpretation)
    }
}

/// Channel conversion performed by a synthesized adapter node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Conversion {
    RgbFromHsv,
    HsvFromRgb,
    RgbFromXyz,
    XyzFromRgb,
    XyzFromUvw,
    UvwFromXyz,
}

impl Conversion {
    /// Conversion bridging a producer channel to a consumer channel, if one
    /// exists. Conversions are arity-preserving; mismatched arities have no
    /// valid conversion and resolution falls back to the literal default.
    pub fn between(producer: &Channel, consumer: &Channel) -> Option<Conversion> {
        if producer.layout != consumer.layout || !producer.layout.is_compound() {
            return None;
        }
        use Interpretation::*;
        match (producer.interpretation, consumer.interpretation) {
            (Hsv, Rgb) => Some(Conversion::RgbFromHsv),
            (Rgb, Hsv) => Some(Conversion::HsvFromRgb),
            (Xyz, Rgb) => Some(Conversion::RgbFromXyz),
            (Rgb, Xyz) => Some(Conversion::XyzFromRgb),
            (Uvw, Xyz) => Some(Conversion::XyzFromUvw),
            (Xyz, Uvw) => Some(Conversion::UvwFromXyz),
            _ => None,
        }
    }

    /// Stable suffix used to key adapter identities ("producer>suffix")
    pub fn suffix(&self) -> &'static str {
        match self {
            Conversion::RgbFromHsv => "rgb_from_hsv",
            Conversion::HsvFromRgb => "hsv_from_rgb",
            Conversion::RgbFromXyz => "rgb_from_xyz",
            Conversion::XyzFromRgb => "xyz_from_rgb",
            Conversion::XyzFromUvw => "xyz_from_uvw",
            Conversion::UvwFromXyz => "uvw_from_xyz",
        }
    }

    /// Declaration token the renderer resolves to the adapter implementation
    pub fn declaration(&self) -> &'static str {
        self.suffix()
    }
}

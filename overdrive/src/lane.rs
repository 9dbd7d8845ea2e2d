//! Discrete lanes derived from the road centre offset.

/// A set of named lane positions on the track. Implementations pick how many
/// lanes the track is divided into.
pub trait Lane: Copy + 'static {
    /// Centre offset of this lane in mm.
    fn offset(self) -> f32;

    fn all() -> &'static [Self];

    /// The lane whose centre is closest to `offset`.
    fn closest(offset: f32) -> Self {
        *Self::all()
            .iter()
            .min_by(|a, b| {
                (a.offset() - offset)
                    .abs()
                    .total_cmp(&(b.offset() - offset).abs())
            })
            .expect("lane sets are non-empty")
    }
}

/// Three lanes: left, middle, right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane3 {
    Left,
    Middle,
    Right,
}

impl Lane for Lane3 {
    fn offset(self) -> f32 {
        match self {
            Self::Left => -60.0,
            Self::Middle => 0.0,
            Self::Right => 60.0,
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Left, Self::Middle, Self::Right]
    }
}

/// Four lanes, ordered left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane4 {
    OuterLeft,
    InnerLeft,
    InnerRight,
    OuterRight,
}

impl Lane for Lane4 {
    fn offset(self) -> f32 {
        match self {
            Self::OuterLeft => -60.0,
            Self::InnerLeft => -30.0,
            Self::InnerRight => 30.0,
            Self::OuterRight => 60.0,
        }
    }

    fn all() -> &'static [Self] {
        &[
            Self::OuterLeft,
            Self::InnerLeft,
            Self::InnerRight,
            Self::OuterRight,
        ]
    }
}

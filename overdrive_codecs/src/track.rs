use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Raw curvature readings above this value count as a clockwise turn. The
/// boundary is empirical, not a flag from the hardware.
pub const CLOCKWISE_THRESHOLD: u8 = 30;

/// Semantic track piece kinds. Several raw codes map onto the same kind;
/// the code lists come from the vehicle firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackPieceType {
    Start,
    Finish,
    Straight,
    Curve,
    Intersection,
    LaunchStart,
}

impl TrackPieceType {
    pub fn classify(code: u8) -> Result<Self, ProtocolError> {
        match code {
            33 => Ok(Self::Start),
            34 => Ok(Self::Finish),
            36 | 39 | 40 | 48 | 51 => Ok(Self::Straight),
            17 | 18 | 20 | 23 | 24 | 27 => Ok(Self::Curve),
            10 => Ok(Self::Intersection),
            43 => Ok(Self::LaunchStart),
            other => Err(ProtocolError::UnknownPieceCode(other)),
        }
    }
}

impl fmt::Display for TrackPieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::Finish => "FINISH",
            Self::Straight => "STRAIGHT",
            Self::Curve => "CURVE",
            Self::Intersection => "INTERSECTION",
            Self::LaunchStart => "LAUNCH_START",
        };
        f.write_str(name)
    }
}

/// One physical segment of the track. `loc` is an opaque locator reported by
/// the vehicle; `clockwise` is a directional hint and takes no part in
/// equality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackPiece {
    pub loc: u8,
    pub piece_type: TrackPieceType,
    pub clockwise: bool,
}

impl TrackPiece {
    pub fn from_raw(loc: u8, piece_code: u8, clockwise_raw: u8) -> Result<Self, ProtocolError> {
        Ok(Self {
            loc,
            piece_type: TrackPieceType::classify(piece_code)?,
            clockwise: clockwise_raw > CLOCKWISE_THRESHOLD,
        })
    }
}

impl PartialEq for TrackPiece {
    fn eq(&self, other: &Self) -> bool {
        self.piece_type == other.piece_type && self.loc == other.loc
    }
}

impl Eq for TrackPiece {}

impl Hash for TrackPiece {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.piece_type.hash(state);
        self.loc.hash(state);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classification_examples() {
        assert_eq!(TrackPieceType::classify(33).unwrap(), TrackPieceType::Start);
        assert_eq!(
            TrackPieceType::classify(34).unwrap(),
            TrackPieceType::Finish
        );
        assert_eq!(
            TrackPieceType::classify(39).unwrap(),
            TrackPieceType::Straight
        );
        assert_eq!(TrackPieceType::classify(17).unwrap(), TrackPieceType::Curve);
        assert_eq!(
            TrackPieceType::classify(10).unwrap(),
            TrackPieceType::Intersection
        );
        assert_eq!(
            TrackPieceType::classify(43).unwrap(),
            TrackPieceType::LaunchStart
        );
    }

    #[test]
    fn unknown_codes_are_an_error() {
        for code in [0, 1, 35, 99, 255] {
            assert!(matches!(
                TrackPieceType::classify(code),
                Err(ProtocolError::UnknownPieceCode(c)) if c == code
            ));
        }
    }

    #[test]
    fn clockwise_threshold() {
        assert!(!TrackPiece::from_raw(0, 18, 30).unwrap().clockwise);
        assert!(TrackPiece::from_raw(0, 18, 31).unwrap().clockwise);
    }

    #[test]
    fn equality_ignores_direction() {
        let a = TrackPiece::from_raw(12, 18, 0).unwrap();
        let b = TrackPiece::from_raw(12, 18, 47).unwrap();
        assert_eq!(a, b);

        let c = TrackPiece::from_raw(13, 18, 0).unwrap();
        assert_ne!(a, c);
    }
}

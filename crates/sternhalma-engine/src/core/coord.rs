use std::{fmt, ops, str::FromStr};

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// One of the six unit directions of the hex grid.
///
/// The order of [`Direction::ALL`] is fixed and drives every enumeration in the
/// engine (neighbors, step moves, jump hops), so move generation is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

impl Direction {
    pub const LEN: usize = 6;

    pub const ALL: [Self; Self::LEN] = [
        Self::East,
        Self::NorthEast,
        Self::NorthWest,
        Self::West,
        Self::SouthWest,
        Self::SouthEast,
    ];

    /// Unit vector of this direction.
    #[must_use]
    pub const fn offset(self) -> CubeCoord {
        match self {
            Self::East => CubeCoord::axial(1, 0),
            Self::NorthEast => CubeCoord::axial(1, -1),
            Self::NorthWest => CubeCoord::axial(0, -1),
            Self::West => CubeCoord::axial(-1, 0),
            Self::SouthWest => CubeCoord::axial(-1, 1),
            Self::SouthEast => CubeCoord::axial(0, 1),
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::East => Self::West,
            Self::NorthEast => Self::SouthWest,
            Self::NorthWest => Self::SouthEast,
            Self::West => Self::East,
            Self::SouthWest => Self::NorthEast,
            Self::SouthEast => Self::NorthWest,
        }
    }
}

/// A cell position in cube coordinates.
///
/// Only `q` and `r` are stored; `s` is always derived as `-q - r`, so the
/// `q + r + s == 0` invariant holds by construction. The textual key used by
/// collaborators is `"q,r"`.
///
/// # Example
///
/// ```
/// use sternhalma_engine::CubeCoord;
///
/// let a = CubeCoord::new(1, -3, 2);
/// let b: CubeCoord = "1,-3".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "1,-3");
/// assert_eq!(a.distance(CubeCoord::ORIGIN), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CubeCoord {
    q: i32,
    r: i32,
}

impl CubeCoord {
    pub const ORIGIN: Self = Self::axial(0, 0);

    /// Creates a coordinate from all three cube components.
    ///
    /// # Panics
    ///
    /// Panics if `q + r + s != 0`.
    #[must_use]
    pub fn new(q: i32, r: i32, s: i32) -> Self {
        assert_eq!(q + r + s, 0, "cube coordinate ({q}, {r}, {s}) off the q+r+s=0 plane");
        Self { q, r }
    }

    /// Creates a coordinate from its axial `(q, r)` pair.
    #[must_use]
    pub const fn axial(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    #[must_use]
    pub const fn q(self) -> i32 {
        self.q
    }

    #[must_use]
    pub const fn r(self) -> i32 {
        self.r
    }

    #[must_use]
    pub const fn s(self) -> i32 {
        -self.q - self.r
    }

    #[must_use]
    pub const fn scale(self, factor: i32) -> Self {
        Self::axial(self.q * factor, self.r * factor)
    }

    #[must_use]
    pub fn neighbor(self, dir: Direction) -> Self {
        self + dir.offset()
    }

    /// The six adjacent coordinates, in [`Direction::ALL`] order.
    ///
    /// No board membership check is done here; see [`crate::Board`] for that.
    #[must_use]
    pub fn neighbors(self) -> ArrayVec<Self, { Direction::LEN }> {
        Direction::ALL.iter().map(|&d| self.neighbor(d)).collect()
    }

    /// Distance from the origin.
    #[must_use]
    pub const fn length(self) -> i32 {
        (self.q.abs() + self.r.abs() + self.s().abs()) / 2
    }

    /// Number of single steps between two cells on an unobstructed grid.
    #[must_use]
    pub fn distance(self, other: Self) -> i32 {
        (self - other).length()
    }

    /// Rotates around the origin by `steps` × 60° clockwise.
    ///
    /// Negative steps rotate counter-clockwise.
    #[must_use]
    pub fn rotate60(self, steps: i32) -> Self {
        let (mut q, mut r, mut s) = (self.q, self.r, self.s());
        for _ in 0..steps.rem_euclid(6) {
            (q, r, s) = (-r, -s, -q);
        }
        Self::new(q, r, s)
    }

    /// All cells at exactly `radius` steps from `self`.
    ///
    /// Radius 0 yields `self` alone. Cells are produced walking the ring
    /// starting at the [`Direction::SouthWest`] corner.
    #[must_use]
    pub fn ring(self, radius: u32) -> Vec<Self> {
        if radius == 0 {
            return vec![self];
        }
        let radius = i32::try_from(radius).expect("ring radius fits in i32");
        let mut cells = Vec::with_capacity(6 * usize::try_from(radius).unwrap_or(0));
        let mut cell = self + Direction::SouthWest.offset().scale(radius);
        for dir in Direction::ALL {
            for _ in 0..radius {
                cells.push(cell);
                cell = cell.neighbor(dir);
            }
        }
        cells
    }

    /// All cells within `radius` steps of `self`, ordered by `(q, r)`.
    #[must_use]
    pub fn disk(self, radius: u32) -> Vec<Self> {
        let radius = i32::try_from(radius).expect("disk radius fits in i32");
        let mut cells = vec![];
        for dq in -radius..=radius {
            let lo = i32::max(-radius, -dq - radius);
            let hi = i32::min(radius, -dq + radius);
            for dr in lo..=hi {
                cells.push(self + Self::axial(dq, dr));
            }
        }
        cells
    }
}

impl ops::Add for CubeCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::axial(self.q + rhs.q, self.r + rhs.r)
    }
}

impl ops::Sub for CubeCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::axial(self.q - rhs.q, self.r - rhs.r)
    }
}

impl fmt::Display for CubeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid coordinate key {key:?}: expected \"q,r\"")]
pub struct ParseCoordError {
    #[error(not(source))]
    key: String,
}

impl FromStr for CubeCoord {
    type Err = ParseCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCoordError { key: s.to_owned() };
        let (q, r) = s.split_once(',').ok_or_else(err)?;
        let q = q.trim().parse().map_err(|_| err())?;
        let r = r.trim().parse().map_err(|_| err())?;
        Ok(Self::axial(q, r))
    }
}

impl Serialize for CubeCoord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CubeCoord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

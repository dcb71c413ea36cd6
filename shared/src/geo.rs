use serde::{Deserialize, Serialize};

/// Fraction of the previous viewport diagonal below which a map move is ignored.
const MINOR_CHANGE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Map viewport in degrees. Distances are planar, which is fine at viewport scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north_west: Coordinate,
    pub south_east: Coordinate,
}

impl BoundingBox {
    pub const fn new(north_west: Coordinate, south_east: Coordinate) -> Self {
        Self {
            north_west,
            south_east,
        }
    }

    pub fn width(&self) -> f64 {
        (self.south_east.longitude - self.north_west.longitude).abs()
    }

    pub fn height(&self) -> f64 {
        (self.north_west.latitude - self.south_east.latitude).abs()
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.north_west.latitude + self.south_east.latitude) / 2.0,
            (self.north_west.longitude + self.south_east.longitude) / 2.0,
        )
    }

    pub fn diagonal(&self) -> f64 {
        self.width().hypot(self.height())
    }

    /// True when `next` differs from `self` by less than 5%
    /// in both center movement and size, relative to this box's diagonal.
    pub fn is_minor_change(&self, next: &BoundingBox) -> bool {
        let diagonal = self.diagonal();
        if !diagonal.is_finite() || diagonal <= 0.0 {
            return false;
        }

        let from = self.center();
        let to = next.center();
        let shift = (to.latitude - from.latitude).hypot(to.longitude - from.longitude);

        let resize = (next.width() - self.width())
            .abs()
            .max((next.height() - self.height()).abs());

        shift / diagonal < MINOR_CHANGE_THRESHOLD && resize / diagonal < MINOR_CHANGE_THRESHOLD
    }
}

use geo::Point;

pub const NAME_COLUMN: &str = "nom";
pub const ADDRESS_COLUMN: &str = "adresse";
pub const CATEGORY_COLUMN: &str = "catégorie";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

pub const REQUIRED_COLUMNS: [&str; 3] = [NAME_COLUMN, ADDRESS_COLUMN, CATEGORY_COLUMN];

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub category: String,
    // x = longitude, y = latitude
    pub location: Option<Point<f64>>,
}

impl Place {
    pub fn new(name: &str, address: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            category: category.to_string(),
            location: None,
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(Point::new(lon, lat));
        self
    }

    pub fn lat(&self) -> Option<f64> {
        self.location.map(|p| p.y())
    }

    pub fn lon(&self) -> Option<f64> {
        self.location.map(|p| p.x())
    }
}

/// Uploaded table: the raw rows are kept so exports can reproduce every input column.
#[derive(Debug, Clone, Default)]
pub struct PlaceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub places: Vec<Place>,
}

impl PlaceTable {
    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Keep only the rows whose place matches `keep`, raw rows included.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Place) -> bool,
    {
        let mut rows = std::mem::take(&mut self.rows).into_iter();
        let mut kept_rows = Vec::with_capacity(self.places.len());
        self.places.retain(|place| {
            let row = rows.next();
            let kept = keep(place);
            if kept {
                kept_rows.push(row.unwrap_or_default());
            }
            kept
        });
        self.rows = kept_rows;
    }
}

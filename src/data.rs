use crate::error::{MapError, Result};
use crate::types::{
    Place, PlaceTable, ADDRESS_COLUMN, CATEGORY_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN,
    NAME_COLUMN, REQUIRED_COLUMNS,
};
use csv::{ReaderBuilder, WriterBuilder};
use geo::Point;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

pub fn load_table_from_path(path: &Path, delimiter: u8) -> Result<PlaceTable> {
    let file = File::open(path)?;
    load_table(file, delimiter)
}

/// Parse an uploaded table and check the required columns before touching any row.
pub fn load_table<R: Read>(reader: R, delimiter: u8) -> Result<PlaceTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    validate_columns(&headers)?;

    // Map column names to indices for faster lookup
    let col_indices: HashMap<&str, usize> = headers.iter().enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();
    let name_idx = col_indices[NAME_COLUMN];
    let address_idx = col_indices[ADDRESS_COLUMN];
    let category_idx = col_indices[CATEGORY_COLUMN];
    let lat_idx = col_indices.get(LATITUDE_COLUMN).copied();
    let lon_idx = col_indices.get(LONGITUDE_COLUMN).copied();

    let mut table = PlaceTable {
        headers: headers.clone(),
        ..Default::default()
    };

    for result in rdr.records() {
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        let mut place = Place {
            name: field(name_idx),
            address: field(address_idx),
            category: field(category_idx),
            location: None,
        };

        if let (Some(lat_idx), Some(lon_idx)) = (lat_idx, lon_idx) {
            let lat = record.get(lat_idx).and_then(parse_coordinate);
            let lon = record.get(lon_idx).and_then(parse_coordinate);
            if let (Some(lat), Some(lon)) = (lat, lon) {
                if valid_lat_lon(lat, lon) {
                    place.location = Some(Point::new(lon, lat));
                } else {
                    debug!("Ignoring out-of-range coordinates for {:?}: {}, {}", place.name, lat, lon);
                }
            }
        }

        table.rows.push(record.iter().map(str::to_string).collect());
        table.places.push(place);
    }

    info!("Loaded {} rows with columns {:?}", table.len(), headers);
    Ok(table)
}

/// Fails naming every required column the header row lacks.
pub fn validate_columns(headers: &[String]) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS.iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MapError::MissingColumns(missing))
    }
}

/// Decimal degrees, accepting a comma as decimal separator.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

fn valid_lat_lon(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Write the resolved rows with `latitude`/`longitude` filled in, appending the
/// columns when the upload did not have them.
pub fn write_resolved_csv<W: Write>(table: &PlaceTable, writer: W, delimiter: u8) -> Result<()> {
    let mut headers = table.headers.clone();
    let lat_idx = column_or_push(&mut headers, LATITUDE_COLUMN);
    let lon_idx = column_or_push(&mut headers, LONGITUDE_COLUMN);

    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    wtr.write_record(&headers)?;

    for (row, place) in table.rows.iter().zip(&table.places) {
        let Some(location) = place.location else { continue };

        let mut out = row.clone();
        out.resize(headers.len(), String::new());
        out[lat_idx] = location.y().to_string();
        out[lon_idx] = location.x().to_string();
        wtr.write_record(&out)?;
    }

    wtr.flush()?;
    Ok(())
}

fn column_or_push(headers: &mut Vec<String>, name: &str) -> usize {
    match headers.iter().position(|h| h == name) {
        Some(idx) => idx,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}

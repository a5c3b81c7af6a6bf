use crate::config::MapConfig;
use crate::data::{load_table, write_resolved_csv};
use crate::error::{MapError, Result};
use crate::geocode::{AddressResolver, Geocoder};
use crate::processing::distinct_categories;
use crate::render::{compose, render_html, RenderTarget};
use crate::types::PlaceTable;
use crate::view::ViewOptions;
use std::io::Read;
use tracing::info;

/// One user's working state: the last uploaded table and the geocoding cache.
/// The cache outlives uploads, so re-sending a file costs no lookups.
pub struct Session<G> {
    resolver: AddressResolver<G>,
    table: Option<PlaceTable>,
    dropped: usize,
}

impl<G: Geocoder> Session<G> {
    pub fn new(resolver: AddressResolver<G>) -> Self {
        Self { resolver, table: None, dropped: 0 }
    }

    /// Validate, geocode and keep the table. On a schema error the previous
    /// table is left untouched.
    pub fn load<R: Read>(&mut self, reader: R, delimiter: u8) -> Result<&PlaceTable> {
        let mut table = load_table(reader, delimiter)?;
        self.dropped = self.resolver.resolve_table(&mut table);
        info!("{} places ready, {} dropped", table.len(), self.dropped);
        Ok(self.table.insert(table))
    }

    pub fn table(&self) -> Result<&PlaceTable> {
        self.table.as_ref().ok_or(MapError::NoData)
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Every category of the loaded table, whatever the current filter.
    pub fn categories(&self) -> Result<Vec<String>> {
        Ok(distinct_categories(&self.table()?.places))
    }

    pub fn render(&self, options: &ViewOptions, config: &MapConfig, target: RenderTarget) -> Result<String> {
        let table = self.table()?;
        Ok(render_html(&compose(&table.places, options, config, target)))
    }

    pub fn resolved_csv(&self, delimiter: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_resolved_csv(self.table()?, &mut out, delimiter)?;
        Ok(out)
    }

    pub fn resolver(&self) -> &AddressResolver<G> {
        &self.resolver
    }
}

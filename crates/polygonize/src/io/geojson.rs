use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use geo::orient::{Direction, Orient};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::{
    error::OutputError,
    io::AttributeSchema,
    raster::Crs,
    traits::FeatureSink,
    types::Shape,
};

/// Streams polygon features into a GeoJSON FeatureCollection.
///
/// The header, carrying the CRS as a legacy named `crs` member, is written on
/// creation; each feature is serialized as soon as it arrives and the closing
/// brackets are written by [`FeatureSink::finish`].
pub struct GeoJsonWriter<W: Write> {
    writer: W,
    schema: AttributeSchema,
    count: u64,
    finished: bool,
}

impl GeoJsonWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path`
    pub fn create(path: impl AsRef<Path>, crs: &Crs, schema: AttributeSchema) -> Result<Self, OutputError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), crs, schema)
    }
}

impl<W: Write> GeoJsonWriter<W> {
    pub fn new(mut writer: W, crs: &Crs, schema: AttributeSchema) -> Result<Self, OutputError> {
        let crs_member = json!({
            "type": "name",
            "properties": { "name": crs.urn() }
        });
        write!(
            writer,
            "{{\"type\":\"FeatureCollection\",\"crs\":{},\"features\":[",
            crs_member
        )?;

        Ok(Self {
            writer,
            schema,
            count: 0,
            finished: false,
        })
    }

    /// Number of features written so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Consume the writer and hand back the underlying sink
    pub fn into_inner(mut self) -> Result<W, OutputError> {
        self.finish()?;
        Ok(self.writer)
    }

    fn feature(&self, shape: &Shape) -> Feature {
        let polygon = shape.polygon.orient(Direction::Default);

        let mut properties = JsonObject::new();
        if self.schema == AttributeSchema::PixelValue {
            properties.insert("value".to_string(), json!(shape.value));
        }

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(&polygon))),
            id: Some(geojson::feature::Id::Number(serde_json::Number::from(self.count))),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

impl<W: Write> FeatureSink for GeoJsonWriter<W> {
    fn write_shape(&mut self, shape: &Shape) -> Result<(), OutputError> {
        let feature = self.feature(shape);
        if self.count > 0 {
            self.writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.writer, &feature)?;
        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, OutputError> {
        if !self.finished {
            self.writer.write_all(b"]}\n")?;
            self.writer.flush()?;
            self.finished = true;
        }
        Ok(self.count)
    }
}

/// Load a FeatureCollection written by [`GeoJsonWriter`] (or any other GeoJSON file)
pub fn read_feature_collection(path: impl AsRef<Path>) -> Result<FeatureCollection, OutputError> {
    let content = fs::read_to_string(path)?;
    Ok(content.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn square_with_hole() -> Shape {
        // Clockwise exterior, counter-clockwise hole: the opposite of what gets written
        let exterior = LineString::from(vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)]);
        Shape::new(Polygon::new(exterior, vec![hole]), 7, 15)
    }

    fn write(shapes: &[Shape], schema: AttributeSchema) -> FeatureCollection {
        let mut writer = GeoJsonWriter::new(Vec::new(), &Crs::from_epsg(32633), schema).unwrap();
        for shape in shapes {
            writer.write_shape(shape).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), shapes.len() as u64);
        let bytes = writer.into_inner().unwrap();
        String::from_utf8(bytes).unwrap().parse().unwrap()
    }

    #[test]
    fn test_empty_collection_is_valid() {
        let collection = write(&[], AttributeSchema::GeometryOnly);
        assert!(collection.features.is_empty());
    }

    #[test]
    fn test_crs_member() {
        let collection = write(&[], AttributeSchema::GeometryOnly);
        let crs = &collection.foreign_members.unwrap()["crs"];
        assert_eq!(crs["properties"]["name"], "urn:ogc:def:crs:EPSG::32633");
    }

    #[test]
    fn test_geometry_only_schema_has_no_attributes() {
        let collection = write(&[square_with_hole()], AttributeSchema::GeometryOnly);
        assert_eq!(collection.features.len(), 1);
        assert!(collection.features[0].properties.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_pixel_value_schema() {
        let shapes = [square_with_hole(), square_with_hole()];
        let collection = write(&shapes, AttributeSchema::PixelValue);
        assert_eq!(collection.features.len(), 2);
        for feature in &collection.features {
            assert_eq!(feature.property("value"), Some(&json!(7)));
        }
    }

    #[test]
    fn test_rings_are_oriented() {
        use geo::Winding;

        let collection = write(&[square_with_hole()], AttributeSchema::GeometryOnly);
        let geometry = collection.features[0].geometry.clone().unwrap();
        let polygon: Polygon<f64> = geometry.value.try_into().unwrap();

        assert!(polygon.exterior().is_ccw());
        assert!(polygon.interiors()[0].is_cw());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut writer =
            GeoJsonWriter::new(Vec::new(), &Crs::wgs84(), AttributeSchema::GeometryOnly).unwrap();
        writer.write_shape(&square_with_hole()).unwrap();
        assert_eq!(writer.finish().unwrap(), 1);
        assert_eq!(writer.finish().unwrap(), 1);
        let bytes = writer.into_inner().unwrap();
        assert!(String::from_utf8(bytes).unwrap().ends_with("]}\n"));
    }
}

//! GeoTIFF metadata: model transform, GeoKey directory and GDAL nodata.

use std::io::{Read, Seek};

use tiff::decoder::Decoder;
use tiff::tags::Tag;

use super::{Crs, GeoTransform};

const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// GeoKeys held inline in the directory (TIFFTagLocation = 0).
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct GeoKeys {
    entries: Vec<(u16, u16)>,
}

impl GeoKeys {
    /// Parse a GeoKeyDirectoryTag payload: a 4-short header followed by
    /// `[key id, tag location, count, value]` entries.
    pub(crate) fn parse(directory: &[u16]) -> Self {
        let Some(header) = directory.get(..4) else {
            return Self::default();
        };
        let key_count = usize::from(header[3]);

        let entries = directory[4..]
            .chunks_exact(4)
            .take(key_count)
            .filter(|entry| entry[1] == 0)
            .map(|entry| (entry[0], entry[3]))
            .collect();

        Self { entries }
    }

    fn get(&self, key: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|(id, _)| *id == key)
            .map(|(_, value)| *value)
    }

    pub(crate) fn crs(&self) -> Option<Crs> {
        [PROJECTED_CS_TYPE_GEO_KEY, GEOGRAPHIC_TYPE_GEO_KEY]
            .into_iter()
            .filter_map(|key| self.get(key))
            .find(|code| *code != 0 && *code != USER_DEFINED)
            .map(|code| Crs::from_epsg(u32::from(code)))
    }

    pub(crate) fn pixel_is_point(&self) -> bool {
        self.get(GT_RASTER_TYPE_GEO_KEY) == Some(RASTER_PIXEL_IS_POINT)
    }
}

/// Derive the affine transform from a ModelTransformationTag (row-major 4x4 matrix)
pub(crate) fn transform_from_matrix(matrix: &[f64]) -> Option<GeoTransform> {
    if matrix.len() < 16 {
        return None;
    }
    Some(GeoTransform::new(
        matrix[0], matrix[1], matrix[3], matrix[4], matrix[5], matrix[7],
    ))
}

/// Derive the affine transform from a tiepoint `[i, j, k, x, y, z]` and pixel scale `[sx, sy, sz]`
pub(crate) fn transform_from_tiepoint(tiepoint: &[f64], scale: &[f64]) -> Option<GeoTransform> {
    if tiepoint.len() < 6 || scale.len() < 2 {
        return None;
    }
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let (sx, sy) = (scale[0], scale[1]);
    Some(GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy))
}

/// Georeferencing read from the current IFD.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GeoMetadata {
    pub transform: Option<GeoTransform>,
    pub crs: Option<Crs>,
    pub nodata: Option<i64>,
}

pub(crate) fn read_metadata<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoMetadata {
    let keys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .map(|directory| GeoKeys::parse(&directory))
        .unwrap_or_default();

    let transform = decoder
        .get_tag_f64_vec(Tag::ModelTransformationTag)
        .ok()
        .and_then(|matrix| transform_from_matrix(&matrix))
        .or_else(|| {
            let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
            let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
            transform_from_tiepoint(&tiepoint, &scale)
        })
        .map(|transform| {
            if keys.pixel_is_point() {
                transform.shifted_to_pixel_corner()
            } else {
                transform
            }
        });

    let nodata = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|text| parse_nodata(&text));

    GeoMetadata {
        transform,
        crs: keys.crs(),
        nodata,
    }
}

fn parse_nodata(text: &str) -> Option<i64> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    text.parse::<i64>().ok().or_else(|| {
        let value = text.parse::<f64>().ok()?;
        (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
    })
}

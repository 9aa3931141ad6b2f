//! Minimal GeoKey directory handling: just enough to carry an EPSG code.

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Build a GeoKeyDirectoryTag value declaring `epsg` as the model CRS.
///
/// Codes that do not fit in a SHORT are left out, leaving only the model
/// and raster type keys.
pub(crate) fn directory_for_epsg(epsg: u32, geographic: bool) -> Vec<u16> {
    let model_type = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    let mut keys = vec![
        [KEY_MODEL_TYPE, 0, 1, model_type],
        [KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA],
    ];
    if let Ok(code) = u16::try_from(epsg) {
        let key = if geographic {
            KEY_GEOGRAPHIC_TYPE
        } else {
            KEY_PROJECTED_CS_TYPE
        };
        keys.push([key, 0, 1, code]);
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

/// EPSG code of the projected or geographic CRS declared in a directory.
pub(crate) fn epsg_from_directory(directory: &[u16]) -> Option<u32> {
    let header = directory.get(..4)?;
    let count = header[3] as usize;
    let entries = directory.get(4..4 + count * 4)?;

    let lookup = |wanted: u16| {
        entries
            .chunks_exact(4)
            .find(|e| e[0] == wanted && e[1] == 0 && e[2] == 1)
            .map(|e| e[3])
            .filter(|&v| v != 0 && v != USER_DEFINED)
    };

    lookup(KEY_PROJECTED_CS_TYPE)
        .or_else(|| lookup(KEY_GEOGRAPHIC_TYPE))
        .map(u32::from)
}

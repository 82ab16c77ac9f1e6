//! HDF5 layout of DL1 files and low-level table access.
//!
//! Every table is a group of equally long column datasets. Per-telescope
//! columns (`<type>_indices`, `charge`, `peakpos`) are 2-D with one row per
//! table row.

use crate::{Error, Result};
use dl1dh_core::{HeaderValue, McHeader, MC_HEADER_KEYS};
use hdf5::types::{FixedAscii, FixedUnicode, H5Type, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File, Group};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use std::str::FromStr;

pub(crate) const EVENTS: &str = "Events";
pub(crate) const ARRAY_INFORMATION: &str = "Array_Information";
pub(crate) const TELESCOPE_TYPE_INFORMATION: &str = "Telescope_Type_Information";
pub(crate) const CHARGE: &str = "charge";
pub(crate) const PEAKPOS: &str = "peakpos";

/// Name of the per-event index column of one telescope type.
pub(crate) fn indices_column(tel_type: &str) -> String {
    format!("{tel_type}_indices")
}

/// `/Array_Information`: one row per telescope.
#[derive(Clone, Debug)]
pub(crate) struct ArrayInformation {
    pub id: Vec<u32>,
    pub tel_type: Vec<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl ArrayInformation {
    pub fn read(file: &File) -> Result<Self> {
        let group = file.group(ARRAY_INFORMATION)?;
        let table = Self {
            id: read_dataset_vec::<u32>(&group, "id")?,
            tel_type: read_string_column(&group, "type")?,
            x: read_dataset_vec::<f64>(&group, "x")?,
            y: read_dataset_vec::<f64>(&group, "y")?,
            z: read_dataset_vec::<f64>(&group, "z")?,
        };
        let n = table.id.len();
        check_column_len(ARRAY_INFORMATION, "type", n, table.tel_type.len())?;
        check_column_len(ARRAY_INFORMATION, "x", n, table.x.len())?;
        check_column_len(ARRAY_INFORMATION, "y", n, table.y.len())?;
        check_column_len(ARRAY_INFORMATION, "z", n, table.z.len())?;
        Ok(table)
    }

    /// Distinct type tags, sorted.
    pub fn tel_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.tel_type.iter().map(String::as_str).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    /// Ids of one type in row order; the position in this list is the
    /// column of the type's index table.
    pub fn ids_of_type(&self, tel_type: &str) -> Vec<u32> {
        self.id
            .iter()
            .zip(&self.tel_type)
            .filter(|(_, t)| t.as_str() == tel_type)
            .map(|(&id, _)| id)
            .collect()
    }
}

/// `/Telescope_Type_Information`: one row per telescope type.
#[derive(Clone, Debug)]
pub(crate) struct TelescopeTypeInformation {
    pub tel_type: Vec<String>,
    pub camera: Vec<String>,
    pub optics: Vec<String>,
}

impl TelescopeTypeInformation {
    pub fn read(file: &File) -> Result<Self> {
        let group = file.group(TELESCOPE_TYPE_INFORMATION)?;
        let table = Self {
            tel_type: read_string_column(&group, "type")?,
            camera: read_string_column(&group, "camera")?,
            optics: read_string_column(&group, "optics")?,
        };
        let n = table.tel_type.len();
        check_column_len(TELESCOPE_TYPE_INFORMATION, "camera", n, table.camera.len())?;
        check_column_len(TELESCOPE_TYPE_INFORMATION, "optics", n, table.optics.len())?;
        Ok(table)
    }

    /// `(camera, optics)` of the first row with this type tag.
    pub fn lookup(&self, tel_type: &str) -> Option<(&str, &str)> {
        let row = self.tel_type.iter().position(|t| t == tel_type)?;
        Some((self.camera[row].as_str(), self.optics[row].as_str()))
    }
}

fn check_column_len(table: &str, column: &str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        return Ok(());
    }
    Err(Error::InvalidFormat(format!(
        "{table}/{column} has {found} rows, expected {expected}"
    )))
}

/// Reads every key of [`MC_HEADER_KEYS`] from the file attributes.
///
/// Absent or unreadable keys are reported and left unset.
pub(crate) fn read_mc_header(file: &File) -> McHeader {
    let mut header = McHeader::new();
    for &key in MC_HEADER_KEYS {
        match read_header_attr(file, key) {
            Ok(Some(value)) => {
                header.set(key, value);
            }
            Ok(None) => log::warn!("item {key} does not exist in the file attributes"),
            Err(e) => log::warn!("item {key} could not be read from the file attributes: {e}"),
        }
    }
    header
}

fn read_header_attr(group: &Group, name: &str) -> Result<Option<HeaderValue>> {
    let Ok(attr) = group.attr(name) else {
        return Ok(None);
    };
    let descriptor = attr.dtype()?.to_descriptor()?;
    let scalar = attr.ndim() == 0;

    let value = match descriptor {
        // Includes the FALSE/TRUE int8 enum that numpy booleans are stored as.
        TypeDescriptor::Boolean if scalar => HeaderValue::Bool(attr.read_scalar::<bool>()?),
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) if scalar => {
            HeaderValue::Int(attr.read_scalar::<i64>()?)
        }
        TypeDescriptor::Float(_) if scalar => HeaderValue::Float(attr.read_scalar::<f64>()?),
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Float(_) => {
            HeaderValue::Vector(attr.read_raw::<f64>()?)
        }
        TypeDescriptor::VarLenUnicode if scalar => {
            HeaderValue::Text(attr.read_scalar::<VarLenUnicode>()?.to_string())
        }
        TypeDescriptor::VarLenAscii if scalar => {
            HeaderValue::Text(attr.read_scalar::<VarLenAscii>()?.to_string())
        }
        TypeDescriptor::FixedAscii(_) if scalar => {
            HeaderValue::Text(attr.read_scalar::<FixedAscii<256>>()?.to_string())
        }
        TypeDescriptor::FixedUnicode(_) if scalar => {
            HeaderValue::Text(attr.read_scalar::<FixedUnicode<256>>()?.to_string())
        }
        other => {
            return Err(Error::InvalidFormat(format!(
                "attribute {name} has unsupported type {other:?}"
            )))
        }
    };
    Ok(Some(value))
}

/// Writes one run-header value as a file attribute.
pub(crate) fn write_header_attr(file: &File, name: &str, value: &HeaderValue) -> Result<()> {
    match value {
        HeaderValue::Bool(v) => {
            file.new_attr::<bool>().create(name)?.write_scalar(v)?;
        }
        HeaderValue::Int(v) => {
            file.new_attr::<i64>().create(name)?.write_scalar(v)?;
        }
        HeaderValue::Float(v) => {
            file.new_attr::<f64>().create(name)?.write_scalar(v)?;
        }
        HeaderValue::Text(v) => set_attr_str_file(file, name, v)?,
        HeaderValue::Vector(v) => {
            let attr = file.new_attr::<f64>().shape((v.len(),)).create(name)?;
            attr.write(ArrayView1::from(v.as_slice()))?;
        }
    }
    Ok(())
}

pub(crate) fn read_dataset_vec<T: H5Type>(group: &Group, name: &str) -> Result<Vec<T>> {
    let dataset = group.dataset(name)?;
    Ok(dataset.read_raw::<T>()?)
}

pub(crate) fn read_string_column(group: &Group, name: &str) -> Result<Vec<String>> {
    let values = read_dataset_vec::<VarLenUnicode>(group, name)?;
    Ok(values.iter().map(ToString::to_string).collect())
}

pub(crate) fn read_matrix<T: H5Type>(group: &Group, name: &str) -> Result<Array2<T>> {
    let dataset = group.dataset(name)?;
    Ok(dataset.read_2d::<T>()?)
}

/// Reads row `row` of a 2-D dataset.
pub(crate) fn read_row<T: H5Type>(dataset: &Dataset, row: usize) -> Result<Vec<T>> {
    let rows = dataset.shape().first().copied().unwrap_or(0);
    if row >= rows {
        return Err(Error::InvalidFormat(format!(
            "row {row} out of range for {} with {rows} rows",
            dataset.name()
        )));
    }
    Ok(dataset.read_slice_1d::<T, _>(s![row, ..])?.to_vec())
}

/// Writes a complete 1-D column.
pub(crate) fn write_column<T: H5Type>(group: &Group, name: &str, data: &[T]) -> Result<Dataset> {
    let dataset = group.new_dataset::<T>().shape((data.len(),)).create(name)?;
    if !data.is_empty() {
        dataset.write(ArrayView1::from(data))?;
    }
    Ok(dataset)
}

pub(crate) fn write_string_column(group: &Group, name: &str, data: &[&str]) -> Result<Dataset> {
    let values: Vec<VarLenUnicode> = data
        .iter()
        .map(|v| to_var_len_unicode(v))
        .collect::<Result<Vec<_>>>()?;
    write_column(group, name, &values)
}

pub(crate) fn create_extendable_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    chunk_rows: usize,
    compression: Option<u8>,
    shuffle: bool,
) -> Result<Dataset> {
    let mut builder = group
        .new_dataset::<T>()
        .shape((0..,))
        .chunk((chunk_rows,));

    if let Some(level) = compression {
        builder = builder.deflate(level);
    }

    if shuffle {
        builder = builder.shuffle();
    }

    Ok(builder.create(name)?)
}

/// Creates a 2-D dataset that grows along its first axis.
pub(crate) fn create_extendable_rows<T: H5Type>(
    group: &Group,
    name: &str,
    width: usize,
    chunk_rows: usize,
    compression: Option<u8>,
    shuffle: bool,
) -> Result<Dataset> {
    if width == 0 {
        return Err(Error::InvalidFormat(format!(
            "{name}: cannot create a table with zero columns"
        )));
    }

    let mut builder = group
        .new_dataset::<T>()
        .shape((0.., width))
        .chunk((chunk_rows, width));

    if let Some(level) = compression {
        builder = builder.deflate(level);
    }

    if shuffle {
        builder = builder.shuffle();
    }

    Ok(builder.create(name)?)
}

pub(crate) fn append_slice<T: H5Type>(dataset: &Dataset, offset: usize, data: &[T]) -> Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let new_len = offset + data.len();
    dataset.resize((new_len,))?;
    let view = ArrayView1::from(data);
    dataset.write_slice(view, s![offset..new_len])?;
    Ok(())
}

pub(crate) fn append_rows<T: H5Type>(
    dataset: &Dataset,
    offset: usize,
    rows: ArrayView2<'_, T>,
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let new_len = offset + rows.nrows();
    dataset.resize((new_len, rows.ncols()))?;
    dataset.write_slice(rows, s![offset..new_len, ..])?;
    Ok(())
}

pub(crate) fn set_dataset_units(dataset: &Dataset, units: &str) -> Result<()> {
    let value = to_var_len_unicode(units)?;
    dataset
        .new_attr::<VarLenUnicode>()
        .create("units")?
        .write_scalar(&value)?;
    Ok(())
}

pub(crate) fn set_attr_str_file(file: &File, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    file.new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 string: {e}")))
}

//! DL1 file writer.
//!
//! Takes calibrated multi-gain telescope data, combines the gain channels
//! and appends the result to the per-type image tables.

use crate::hdf5::{
    append_rows, append_slice, create_extendable_dataset, create_extendable_rows,
    indices_column, set_attr_str_file, set_dataset_units, write_column, write_header_attr,
    write_string_column, ARRAY_INFORMATION, CHARGE, EVENTS, PEAKPOS, TELESCOPE_TYPE_INFORMATION,
};
use crate::{Error, Result};
use dl1dh_calib::{GainSelector, MultiGainImage};
use dl1dh_core::{McHeader, McShower, Quantity, SubarrayDescription, TelescopeId};
use hdf5::{Dataset, File, Group};
use ndarray::{Array1, Array2, Axis};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Writer configuration.
#[derive(Clone, Debug)]
pub struct WriterOptions {
    /// Gain channel selection applied to every telescope.
    pub gain: GainSelector,
    /// Rows per HDF5 chunk.
    pub chunk_rows: usize,
    /// Deflate level, `None` disables compression.
    pub compression: Option<u8>,
    pub shuffle: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            gain: GainSelector::default(),
            chunk_rows: 1024,
            compression: Some(1),
            shuffle: true,
        }
    }
}

impl WriterOptions {
    /// Set the gain selector.
    #[must_use]
    pub fn with_gain(mut self, gain: GainSelector) -> Self {
        self.gain = gain;
        self
    }

    /// Disable compression and shuffling.
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = None;
        self.shuffle = false;
        self
    }
}

/// A calibrated event with multi-gain data per telescope.
#[derive(Clone, Debug)]
pub struct CalibratedEvent {
    pub obs_id: u64,
    pub event_id: u64,
    /// Simulated shower.
    pub mc: McShower,
    /// Multi-gain data of the triggered telescopes.
    pub tels: BTreeMap<TelescopeId, MultiGainImage>,
}

/// Where a telescope lands in the file.
#[derive(Clone, Debug)]
struct TelescopeSlot {
    type_idx: usize,
    /// Column in the type's index table.
    position: usize,
    camera: String,
}

/// Image table and index column of one telescope type.
struct TypeTable {
    tel_type: String,
    num_tels: usize,
    num_pixels: usize,
    charge: Dataset,
    peakpos: Dataset,
    indices: Dataset,
    rows: usize,
}

impl TypeTable {
    fn append_image(&mut self, image: &Array1<f32>, peak_time: &Array1<f32>) -> Result<u32> {
        if image.len() != self.num_pixels {
            return Err(Error::InvalidFormat(format!(
                "{}: image has {} pixels, table has {}",
                self.tel_type,
                image.len(),
                self.num_pixels
            )));
        }
        let row = u32::try_from(self.rows).map_err(|_| {
            Error::InvalidFormat(format!("{}: image table exceeds u32 rows", self.tel_type))
        })?;
        append_rows(&self.charge, self.rows, image.view().insert_axis(Axis(0)))?;
        append_rows(&self.peakpos, self.rows, peak_time.view().insert_axis(Axis(0)))?;
        self.rows += 1;
        Ok(row)
    }
}

/// Extendable scalar columns of `/Events`.
struct EventColumnsWriter {
    obs_id: Dataset,
    event_id: Dataset,
    mc_energy: Dataset,
    alt: Dataset,
    az: Dataset,
    core_x: Dataset,
    core_y: Dataset,
    h_first_int: Dataset,
    x_max: Dataset,
    shower_primary_id: Dataset,
}

impl EventColumnsWriter {
    fn new(group: &Group, options: &WriterOptions) -> Result<Self> {
        let f64_column = |name: &str, units: Option<&str>| -> Result<Dataset> {
            let ds = create_extendable_dataset::<f64>(
                group,
                name,
                options.chunk_rows,
                options.compression,
                options.shuffle,
            )?;
            if let Some(units) = units {
                set_dataset_units(&ds, units)?;
            }
            Ok(ds)
        };

        Ok(Self {
            obs_id: create_extendable_dataset::<u64>(
                group,
                "obs_id",
                options.chunk_rows,
                options.compression,
                options.shuffle,
            )?,
            event_id: create_extendable_dataset::<u64>(
                group,
                "event_id",
                options.chunk_rows,
                options.compression,
                options.shuffle,
            )?,
            mc_energy: f64_column("mc_energy", Some(dl1dh_core::TeV::UNIT))?,
            alt: f64_column("alt", Some(dl1dh_core::Radians::UNIT))?,
            az: f64_column("az", Some(dl1dh_core::Radians::UNIT))?,
            core_x: f64_column("core_x", Some(dl1dh_core::Meters::UNIT))?,
            core_y: f64_column("core_y", Some(dl1dh_core::Meters::UNIT))?,
            h_first_int: f64_column("h_first_int", Some(dl1dh_core::Meters::UNIT))?,
            x_max: f64_column("x_max", Some(dl1dh_core::GramsPerSquareCm::UNIT))?,
            shower_primary_id: create_extendable_dataset::<u32>(
                group,
                "shower_primary_id",
                options.chunk_rows,
                options.compression,
                options.shuffle,
            )?,
        })
    }

    fn append(&self, row: usize, event: &CalibratedEvent) -> Result<()> {
        let mc = &event.mc;
        append_slice(&self.obs_id, row, &[event.obs_id])?;
        append_slice(&self.event_id, row, &[event.event_id])?;
        append_slice(&self.mc_energy, row, &[mc.energy.value()])?;
        append_slice(&self.alt, row, &[mc.alt.value()])?;
        append_slice(&self.az, row, &[mc.az.value()])?;
        append_slice(&self.core_x, row, &[mc.core_x.value()])?;
        append_slice(&self.core_y, row, &[mc.core_y.value()])?;
        append_slice(&self.h_first_int, row, &[mc.h_first_int.value()])?;
        append_slice(&self.x_max, row, &[mc.x_max.value()])?;
        append_slice(&self.shower_primary_id, row, &[mc.shower_primary_id])?;
        Ok(())
    }
}

/// Streaming writer for DL1 files.
pub struct Dl1Writer {
    file: File,
    options: WriterOptions,
    events: EventColumnsWriter,
    types: Vec<TypeTable>,
    slots: HashMap<TelescopeId, TelescopeSlot>,
    event_count: usize,
}

impl Dl1Writer {
    /// Creates a DL1 file and writes the instrument tables.
    ///
    /// Every camera of `subarray` must be resolved, since the pixel count
    /// fixes the width of the image tables.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or a camera has no
    /// known pixel count.
    pub fn create<P: AsRef<Path>>(
        path: P,
        subarray: &SubarrayDescription,
        options: WriterOptions,
    ) -> Result<Self> {
        // Every type needs a known pixel count before anything touches disk.
        let mut plan = Vec::new();
        let mut slots = HashMap::new();
        for (type_idx, tel_type) in subarray.tel_types().into_iter().enumerate() {
            let tel_ids = subarray.tel_ids_for_type(tel_type);
            let first = subarray
                .tel(tel_ids[0])
                .ok_or(dl1dh_core::Error::UnknownTelescope(tel_ids[0]))?;
            let num_pixels = first.num_pixels().ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "{tel_type}: pixel count of camera {} is unknown",
                    first.camera_name
                ))
            })?;

            for (position, &tel_id) in tel_ids.iter().enumerate() {
                slots.insert(
                    tel_id,
                    TelescopeSlot {
                        type_idx,
                        position,
                        camera: first.camera_name.clone(),
                    },
                );
            }
            plan.push((tel_type, tel_ids.len(), num_pixels));
        }

        let file = File::create(path)?;
        set_attr_str_file(&file, "dl1_data_handler_version", env!("CARGO_PKG_VERSION"))?;

        write_array_information(&file, subarray)?;
        write_telescope_type_information(&file, subarray)?;

        let events_group = file.create_group(EVENTS)?;
        let events = EventColumnsWriter::new(&events_group, &options)?;

        let mut types = Vec::with_capacity(plan.len());
        for (tel_type, num_tels, num_pixels) in plan {
            types.push(create_type_table(
                &file,
                &events_group,
                tel_type,
                num_tels,
                num_pixels,
                &options,
            )?);
        }

        Ok(Self {
            file,
            options,
            events,
            types,
            slots,
            event_count: 0,
        })
    }

    /// Writes the run header as file attributes. Call at most once.
    ///
    /// # Errors
    /// Returns an error if an attribute cannot be written.
    pub fn set_mc_header(&mut self, header: &McHeader) -> Result<()> {
        for (key, value) in header.iter() {
            write_header_attr(&self.file, key, value)?;
        }
        Ok(())
    }

    /// Gain-combines every telescope of `event` and appends it.
    ///
    /// # Errors
    /// Returns an error for telescopes outside the subarray, gain selection
    /// failures, pixel count mismatches or HDF5 failures.
    pub fn write_event(&mut self, event: &CalibratedEvent) -> Result<()> {
        let mut inputs = Vec::with_capacity(event.tels.len());
        for (&tel_id, data) in &event.tels {
            let slot = self
                .slots
                .get(&tel_id)
                .ok_or(dl1dh_core::Error::UnknownTelescope(tel_id))?;
            inputs.push((tel_id, slot.camera.as_str(), data));
        }
        let combined = self.options.gain.combine_all(&inputs)?;

        let mut index_rows: Vec<Vec<u32>> = self.types.iter().map(|t| vec![0; t.num_tels]).collect();
        for (tel_id, image) in combined {
            let slot = &self.slots[&tel_id];
            let row = self.types[slot.type_idx].append_image(&image.image, &image.peak_time)?;
            index_rows[slot.type_idx][slot.position] = row;
        }

        let row = self.event_count;
        self.events.append(row, event)?;
        for (table, indices) in self.types.iter().zip(&index_rows) {
            let view = ndarray::ArrayView2::from_shape((1, indices.len()), indices)
                .map_err(|e| Error::InvalidFormat(format!("index row shape: {e}")))?;
            append_rows(&table.indices, row, view)?;
        }
        self.event_count += 1;
        Ok(())
    }

    /// Number of events written so far.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Flushes the file and returns the number of events written.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn finish(self) -> Result<usize> {
        self.file.flush()?;
        Ok(self.event_count)
    }
}

fn write_array_information(file: &File, subarray: &SubarrayDescription) -> Result<()> {
    let group = file.create_group(ARRAY_INFORMATION)?;
    let tels: Vec<_> = subarray.tels().collect();

    let ids: Vec<u32> = tels.iter().map(|t| t.id).collect();
    let types: Vec<&str> = tels.iter().map(|t| t.tel_type.as_str()).collect();
    let x: Vec<f64> = tels.iter().map(|t| t.position.x.value()).collect();
    let y: Vec<f64> = tels.iter().map(|t| t.position.y.value()).collect();
    let z: Vec<f64> = tels.iter().map(|t| t.position.z.value()).collect();

    write_column(&group, "id", &ids)?;
    write_string_column(&group, "type", &types)?;
    for (name, values) in [("x", &x), ("y", &y), ("z", &z)] {
        let ds = write_column(&group, name, values)?;
        set_dataset_units(&ds, dl1dh_core::Meters::UNIT)?;
    }
    Ok(())
}

fn write_telescope_type_information(file: &File, subarray: &SubarrayDescription) -> Result<()> {
    let group = file.create_group(TELESCOPE_TYPE_INFORMATION)?;

    let mut types = Vec::new();
    let mut cameras = Vec::new();
    let mut optics = Vec::new();
    let mut num_pixels = Vec::new();
    for tel_type in subarray.tel_types() {
        let Some(tel) = subarray.tels().find(|t| t.tel_type == tel_type) else {
            continue;
        };
        types.push(tel_type);
        cameras.push(tel.camera_name.as_str());
        optics.push(tel.optics_name.as_str());
        num_pixels.push(
            tel.num_pixels()
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
        );
    }

    write_string_column(&group, "type", &types)?;
    write_string_column(&group, "camera", &cameras)?;
    write_string_column(&group, "optics", &optics)?;
    write_column(&group, "num_pixels", &num_pixels)?;
    Ok(())
}

fn create_type_table(
    file: &File,
    events_group: &Group,
    tel_type: &str,
    num_tels: usize,
    num_pixels: usize,
    options: &WriterOptions,
) -> Result<TypeTable> {
    let group = file.create_group(tel_type)?;
    let charge = create_extendable_rows::<f32>(
        &group,
        CHARGE,
        num_pixels,
        options.chunk_rows,
        options.compression,
        options.shuffle,
    )?;
    let peakpos = create_extendable_rows::<f32>(
        &group,
        PEAKPOS,
        num_pixels,
        options.chunk_rows,
        options.compression,
        options.shuffle,
    )?;
    let indices = create_extendable_rows::<u32>(
        events_group,
        &indices_column(tel_type),
        num_tels,
        options.chunk_rows,
        options.compression,
        options.shuffle,
    )?;

    // Row 0 is never referenced: index 0 means "no data".
    let blank = Array2::<f32>::zeros((1, num_pixels));
    append_rows(&charge, 0, blank.view())?;
    append_rows(&peakpos, 0, blank.view())?;

    Ok(TypeTable {
        tel_type: tel_type.to_string(),
        num_tels,
        num_pixels,
        charge,
        peakpos,
        indices,
        rows: 1,
    })
}

//! Lazy event source over a DL1 file.
//!
//! Events are read in on-disk order. The subarray is built when the first
//! event is produced and then shared by every later event of the same file.

use crate::config::SourceConfig;
use crate::hdf5::{
    indices_column, read_dataset_vec, read_matrix, read_mc_header, read_row, ArrayInformation,
    TelescopeTypeInformation, CHARGE, EVENTS, PEAKPOS,
};
use crate::session::ReaderSession;
use crate::{Error, Result};
use dl1dh_core::{
    ArrayEvent, BuiltinRegistry, GramsPerSquareCm, InstrumentRegistry, McHeader, McShower,
    Meters, Position, Radians, SourceMeta, SubarrayDescription, TeV, TelescopeDescription,
    TelescopeId, TelescopeImage,
};
use hdf5::{Dataset, File};
use ndarray::Array2;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Value of [`SourceMeta::origin`] for events of this source.
pub const ORIGIN: &str = "dl1_data_handler";

/// Name of the subarray built from a DL1 file.
pub const SUBARRAY_NAME: &str = "MonteCarloArray";

/// Event source for DL1 data handler files.
///
/// Iterates over `Result<ArrayEvent>`. After an error the source is
/// exhausted.
pub struct Dl1EventSource {
    file: File,
    path: PathBuf,
    config: SourceConfig,
    registry: Arc<dyn InstrumentRegistry>,
    meta: Arc<SourceMeta>,
    subarray: Option<Arc<SubarrayDescription>>,
    mcheader: OnceLock<Arc<McHeader>>,
    state: Option<ReadState>,
    counter: usize,
    finished: bool,
    _session: ReaderSession,
}

impl Dl1EventSource {
    /// Opens a DL1 file with default configuration and the built-in
    /// instrument registry.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, SourceConfig::default(), Arc::new(BuiltinRegistry))
    }

    /// Opens a DL1 file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        config: SourceConfig,
        registry: Arc<dyn InstrumentRegistry>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let session = ReaderSession::acquire(&path);

        let meta = SourceMeta {
            origin: ORIGIN.to_string(),
            input_url: path.display().to_string(),
            max_events: config.max_events,
            is_simulation: true,
        };

        Ok(Self {
            file,
            path,
            config,
            registry,
            meta: Arc::new(meta),
            subarray: None,
            mcheader: OnceLock::new(),
            state: None,
            counter: 0,
            finished: false,
            _session: session,
        })
    }

    /// This source is never picked by content sniffing; it has to be
    /// requested by name.
    #[must_use]
    pub fn is_compatible(_path: &Path) -> bool {
        false
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    #[must_use]
    pub fn meta(&self) -> &SourceMeta {
        &self.meta
    }

    /// Subarray of this file, available once the first event was read.
    #[must_use]
    pub fn subarray(&self) -> Option<&Arc<SubarrayDescription>> {
        self.subarray.as_ref()
    }

    /// Number of events yielded so far.
    #[must_use]
    pub fn events_read(&self) -> usize {
        self.counter
    }

    /// Number of rows in `/Events`.
    ///
    /// # Errors
    /// Returns an error if the events table is missing.
    pub fn num_events(&self) -> Result<usize> {
        Ok(self.file.group(EVENTS)?.dataset("obs_id")?.size())
    }

    /// Builds the subarray without touching the event cursor.
    ///
    /// # Errors
    /// Returns an error if the instrument tables are missing or inconsistent.
    pub fn read_subarray(&self) -> Result<SubarrayDescription> {
        let array = ArrayInformation::read(&self.file)?;
        build_subarray(&self.file, &array, self.registry.as_ref())
    }

    /// Run header from the file attributes.
    ///
    /// The attributes are read on the first call; later calls and every
    /// event share the same header.
    #[must_use]
    pub fn read_mc_header(&self) -> Arc<McHeader> {
        Arc::clone(
            self.mcheader
                .get_or_init(|| Arc::new(read_mc_header(&self.file))),
        )
    }

    fn advance(&mut self) -> Result<Option<ArrayEvent>> {
        if self
            .config
            .max_events
            .is_some_and(|max| self.counter >= max)
        {
            return Ok(None);
        }

        if self.state.is_none() {
            let mcheader = self.read_mc_header();
            self.state = Some(ReadState::load(&self.file, mcheader)?);
        }
        let Some(state) = self.state.as_mut() else {
            return Ok(None);
        };

        while state.cursor < state.events.len() {
            let row = state.cursor;
            state.cursor += 1;

            let subarray = match &self.subarray {
                Some(subarray) => Arc::clone(subarray),
                None => {
                    let subarray = Arc::new(build_subarray(
                        &self.file,
                        &state.array,
                        self.registry.as_ref(),
                    )?);
                    log::debug!(
                        "{}: subarray with {} telescopes",
                        self.path.display(),
                        subarray.num_tels()
                    );
                    self.subarray = Some(Arc::clone(&subarray));
                    subarray
                }
            };

            let present: Vec<(usize, TelescopeId, u32)> = state
                .types
                .iter()
                .enumerate()
                .flat_map(|(type_idx, index)| {
                    index
                        .present(row)
                        .map(move |(tel_id, image_row)| (type_idx, tel_id, image_row))
                })
                .collect();
            let tels_with_data: BTreeSet<TelescopeId> =
                present.iter().map(|&(_, tel_id, _)| tel_id).collect();

            let Some(tels_with_data) = self.config.select(tels_with_data) else {
                continue;
            };

            let mut dl1 = BTreeMap::new();
            for (type_idx, tel_id, image_row) in present {
                if tels_with_data.contains(&tel_id) {
                    let image = state.types[type_idx].read_image(tel_id, image_row)?;
                    dl1.insert(tel_id, image);
                }
            }

            let event = ArrayEvent {
                count: self.counter,
                obs_id: state.events.obs_id[row],
                event_id: state.events.event_id[row],
                tels_with_data,
                mc: state.events.shower(row),
                mcheader: Arc::clone(&state.mcheader),
                dl1,
                subarray,
                meta: Arc::clone(&self.meta),
            };
            self.counter += 1;
            return Ok(Some(event));
        }

        Ok(None)
    }
}

impl Iterator for Dl1EventSource {
    type Item = Result<ArrayEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Tables loaded when iteration starts.
struct ReadState {
    array: ArrayInformation,
    events: EventColumns,
    types: Vec<TypeIndex>,
    mcheader: Arc<McHeader>,
    cursor: usize,
}

impl ReadState {
    fn load(file: &File, mcheader: Arc<McHeader>) -> Result<Self> {
        let array = ArrayInformation::read(file)?;
        let events = EventColumns::read(file)?;

        let types = array
            .tel_types()
            .into_iter()
            .map(|tel_type| {
                TypeIndex::load(file, tel_type, array.ids_of_type(tel_type), events.len())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            array,
            events,
            types,
            mcheader,
            cursor: 0,
        })
    }
}

/// Scalar columns of `/Events`.
struct EventColumns {
    obs_id: Vec<u64>,
    event_id: Vec<u64>,
    mc_energy: Vec<f64>,
    alt: Vec<f64>,
    az: Vec<f64>,
    core_x: Vec<f64>,
    core_y: Vec<f64>,
    h_first_int: Vec<f64>,
    x_max: Vec<f64>,
    shower_primary_id: Vec<u32>,
}

impl EventColumns {
    fn read(file: &File) -> Result<Self> {
        let group = file.group(EVENTS)?;
        let columns = Self {
            obs_id: read_dataset_vec(&group, "obs_id")?,
            event_id: read_dataset_vec(&group, "event_id")?,
            mc_energy: read_dataset_vec(&group, "mc_energy")?,
            alt: read_dataset_vec(&group, "alt")?,
            az: read_dataset_vec(&group, "az")?,
            core_x: read_dataset_vec(&group, "core_x")?,
            core_y: read_dataset_vec(&group, "core_y")?,
            h_first_int: read_dataset_vec(&group, "h_first_int")?,
            x_max: read_dataset_vec(&group, "x_max")?,
            shower_primary_id: read_dataset_vec(&group, "shower_primary_id")?,
        };

        let n = columns.obs_id.len();
        let lengths = [
            ("event_id", columns.event_id.len()),
            ("mc_energy", columns.mc_energy.len()),
            ("alt", columns.alt.len()),
            ("az", columns.az.len()),
            ("core_x", columns.core_x.len()),
            ("core_y", columns.core_y.len()),
            ("h_first_int", columns.h_first_int.len()),
            ("x_max", columns.x_max.len()),
            ("shower_primary_id", columns.shower_primary_id.len()),
        ];
        if let Some((name, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(Error::InvalidFormat(format!(
                "{EVENTS}/{name} has {len} rows, expected {n}"
            )));
        }
        Ok(columns)
    }

    fn len(&self) -> usize {
        self.obs_id.len()
    }

    fn shower(&self, row: usize) -> McShower {
        McShower {
            energy: TeV(self.mc_energy[row]),
            alt: Radians(self.alt[row]),
            az: Radians(self.az[row]),
            core_x: Meters(self.core_x[row]),
            core_y: Meters(self.core_y[row]),
            h_first_int: Meters(self.h_first_int[row]),
            x_max: GramsPerSquareCm(self.x_max[row]),
            shower_primary_id: self.shower_primary_id[row],
        }
    }
}

/// Sparse index of one telescope type.
///
/// Column `p` of `indices` belongs to `tel_ids[p]`; a non-zero entry is the
/// row of that telescope's image in the type's table.
struct TypeIndex {
    tel_type: String,
    tel_ids: Vec<TelescopeId>,
    indices: Array2<u32>,
    charge: Dataset,
    peakpos: Dataset,
}

impl TypeIndex {
    fn load(
        file: &File,
        tel_type: &str,
        tel_ids: Vec<TelescopeId>,
        n_events: usize,
    ) -> Result<Self> {
        let events = file.group(EVENTS)?;
        let indices = read_matrix::<u32>(&events, &indices_column(tel_type))?;
        if indices.dim() != (n_events, tel_ids.len()) {
            return Err(Error::InvalidFormat(format!(
                "{} has shape {:?}, expected ({n_events}, {})",
                indices_column(tel_type),
                indices.dim(),
                tel_ids.len()
            )));
        }

        let table = file.group(tel_type)?;
        Ok(Self {
            tel_type: tel_type.to_string(),
            tel_ids,
            indices,
            charge: table.dataset(CHARGE)?,
            peakpos: table.dataset(PEAKPOS)?,
        })
    }

    /// `(tel_id, image_row)` of every telescope of this type with data in
    /// event `row`.
    fn present(&self, row: usize) -> impl Iterator<Item = (TelescopeId, u32)> + '_ {
        self.indices
            .row(row)
            .into_iter()
            .zip(&self.tel_ids)
            .filter(|&(&image_row, _)| image_row > 0)
            .map(|(&image_row, &tel_id)| (tel_id, image_row))
    }

    fn read_image(&self, tel_id: TelescopeId, image_row: u32) -> Result<TelescopeImage> {
        let row = usize::try_from(image_row).map_err(|_| {
            Error::InvalidFormat(format!("{}: image row {image_row} too large", self.tel_type))
        })?;
        let image = read_row::<f32>(&self.charge, row)?;
        let pulse_time = read_row::<f32>(&self.peakpos, row)?;
        Ok(TelescopeImage::new(tel_id, image, pulse_time)?)
    }
}

fn build_subarray(
    file: &File,
    array: &ArrayInformation,
    registry: &dyn InstrumentRegistry,
) -> Result<SubarrayDescription> {
    let types = TelescopeTypeInformation::read(file)?;
    let mut subarray = SubarrayDescription::new(SUBARRAY_NAME);

    for (row, &tel_id) in array.id.iter().enumerate() {
        let tel_type = array.tel_type[row].as_str();
        let (camera, optics) = types.lookup(tel_type).ok_or_else(|| {
            Error::InvalidFormat(format!(
                "telescope {tel_id} has type {tel_type} missing from Telescope_Type_Information"
            ))
        })?;

        let position = Position::from_meters(array.x[row], array.y[row], array.z[row]);
        let (tel, misses) =
            TelescopeDescription::from_names(tel_id, tel_type, position, optics, camera, registry);
        for miss in misses {
            log::warn!("telescope {tel_id}: {miss}");
        }
        subarray.insert(tel)?;
    }

    Ok(subarray)
}

//! Small DL1 files written with the raw HDF5 API.
//!
//! Layout: two `LST_LSTCam` telescopes (ids 1 and 2, 4 pixels) and one
//! `MST_NectarCam` telescope (id 5, 3 pixels). Four events:
//!
//! | event | telescopes |
//! |-------|------------|
//! | 0     | 1          |
//! | 1     | 2, 5       |
//! | 2     | 5          |
//! | 3     | 1, 2       |
//!
//! Image row `r` of every type holds `r * 10 + pixel` as charge and
//! `r + 0.5` as peak position. Row 0 is blank.
//!
//! With [`Fixture::shuffled_ids`] `/Array_Information` lists the
//! telescopes as 5, 2, 1, so the first LST index column belongs to
//! telescope 2 and the table above swaps telescopes 1 and 2.

#![allow(dead_code)]

use hdf5::types::{H5Type, VarLenUnicode};
use hdf5::{File, Group};
use ndarray::{arr2, Array2, ArrayView1};
use std::path::Path;
use std::str::FromStr;

pub const LST_TYPE: &str = "LST_LSTCam";
pub const MST_TYPE: &str = "MST_NectarCam";
pub const LST_PIXELS: usize = 4;
pub const MST_PIXELS: usize = 3;
pub const NUM_EVENTS: usize = 4;
pub const ENERGIES: [f64; NUM_EVENTS] = [0.5, 1.25, 3.0, 10.0];
pub const ORPHAN_TYPE: &str = "SST_CHEC";
pub const ORPHAN_TEL: u32 = 9;

/// Telescopes with data in each event.
pub fn tels_of_event(event: usize) -> Vec<u32> {
    match event {
        0 => vec![1],
        1 => vec![2, 5],
        2 => vec![5],
        3 => vec![1, 2],
        _ => vec![],
    }
}

pub fn expected_charge(row: u32, num_pixels: usize) -> Vec<f32> {
    (0..num_pixels)
        .map(|p| (row * 10) as f32 + p as f32)
        .collect()
}

#[derive(Clone, Debug)]
pub struct Fixture {
    pub mst_camera: String,
    pub with_header: bool,
    pub with_type_table: bool,
    pub shuffled_ids: bool,
    pub orphan_type: bool,
    pub dangling_index: bool,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            mst_camera: "NectarCam".to_string(),
            with_header: true,
            with_type_table: true,
            shuffled_ids: false,
            orphan_type: false,
            dangling_index: false,
        }
    }
}

impl Fixture {
    pub fn mst_camera(mut self, camera: &str) -> Self {
        self.mst_camera = camera.to_string();
        self
    }

    pub fn without_header(mut self) -> Self {
        self.with_header = false;
        self
    }

    pub fn without_type_table(mut self) -> Self {
        self.with_type_table = false;
        self
    }

    /// Lists the telescopes as 5, 2, 1 instead of ascending ids.
    pub fn shuffled_ids(mut self) -> Self {
        self.shuffled_ids = true;
        self
    }

    /// Adds telescope 9 whose type has no `Telescope_Type_Information` row.
    pub fn orphan_type(mut self) -> Self {
        self.orphan_type = true;
        self
    }

    /// Points event 2 at MST row 7 of a three-row image table.
    pub fn dangling_index(mut self) -> Self {
        self.dangling_index = true;
        self
    }

    pub fn write(&self, path: &Path) -> hdf5::Result<()> {
        let file = File::create(path)?;

        // (id, type, x, y, z)
        let mut tels = vec![
            (1u32, LST_TYPE, -70.0f64, -52.0f64, 43.0f64),
            (2, LST_TYPE, -35.0, 66.0, 32.0),
            (5, MST_TYPE, 0.0, 0.0, 25.0),
        ];
        if self.shuffled_ids {
            tels.reverse();
        }
        if self.orphan_type {
            tels.push((ORPHAN_TEL, ORPHAN_TYPE, 90.0, 90.0, 10.0));
        }
        let array = file.create_group("Array_Information")?;
        let ids: Vec<u32> = tels.iter().map(|t| t.0).collect();
        let types: Vec<&str> = tels.iter().map(|t| t.1).collect();
        column(&array, "id", &ids)?;
        strings(&array, "type", &types)?;
        column(&array, "x", &tels.iter().map(|t| t.2).collect::<Vec<_>>())?;
        column(&array, "y", &tels.iter().map(|t| t.3).collect::<Vec<_>>())?;
        column(&array, "z", &tels.iter().map(|t| t.4).collect::<Vec<_>>())?;

        if self.with_type_table {
            let types = file.create_group("Telescope_Type_Information")?;
            strings(&types, "type", &[LST_TYPE, MST_TYPE])?;
            strings(&types, "camera", &["LSTCam", self.mst_camera.as_str()])?;
            strings(&types, "optics", &["LST", "MST"])?;
            column(&types, "num_pixels", &[LST_PIXELS as u32, MST_PIXELS as u32])?;
        }

        let events = file.create_group("Events")?;
        column(&events, "obs_id", &[101u64; NUM_EVENTS])?;
        column(&events, "event_id", &[1000u64, 1001, 1002, 1003])?;
        column(&events, "mc_energy", &ENERGIES)?;
        column(&events, "alt", &[1.2f64; NUM_EVENTS])?;
        column(&events, "az", &[0.1f64; NUM_EVENTS])?;
        column(&events, "core_x", &[10.0f64, -20.0, 30.0, -40.0])?;
        column(&events, "core_y", &[5.0f64; NUM_EVENTS])?;
        column(&events, "h_first_int", &[25_000.0f64; NUM_EVENTS])?;
        column(&events, "x_max", &[300.0f64, 350.0, 400.0, 450.0])?;
        column(&events, "shower_primary_id", &[0u32, 0, 101, 0])?;

        matrix(
            &events,
            "LST_LSTCam_indices",
            &arr2(&[[1u32, 0], [0, 2], [0, 0], [3, 4]]),
        )?;
        let mst_row = if self.dangling_index { 7 } else { 2 };
        matrix(
            &events,
            "MST_NectarCam_indices",
            &arr2(&[[0u32], [1], [mst_row], [0]]),
        )?;

        image_table(&file, LST_TYPE, 5, LST_PIXELS)?;
        image_table(&file, MST_TYPE, 3, MST_PIXELS)?;

        if self.orphan_type {
            matrix(
                &events,
                &format!("{ORPHAN_TYPE}_indices"),
                &arr2(&[[0u32], [1], [0], [0]]),
            )?;
            image_table(&file, ORPHAN_TYPE, 2, 2)?;
        }

        if self.with_header {
            let direction = [0.0f64, 1.2];
            file.new_attr::<f64>()
                .shape((2,))
                .create("run_array_direction")?
                .write(ArrayView1::from(&direction[..]))?;
            file.new_attr::<i64>()
                .create("corsika_version")?
                .write_scalar(&6990i64)?;
            file.new_attr::<f64>()
                .create("spectral_index")?
                .write_scalar(&-2.0f64)?;
            file.new_attr::<bool>()
                .create("diffuse")?
                .write_scalar(&true)?;
            let atmosphere = VarLenUnicode::from_str("atm_trans_2150_1_10_0_0_2150").map_err(
                |e| hdf5::Error::from(e.to_string().as_str()),
            )?;
            file.new_attr::<VarLenUnicode>()
                .create("atmosphere")?
                .write_scalar(&atmosphere)?;
        }

        Ok(())
    }
}

fn column<T: H5Type>(group: &Group, name: &str, data: &[T]) -> hdf5::Result<()> {
    group
        .new_dataset::<T>()
        .shape((data.len(),))
        .create(name)?
        .write(ArrayView1::from(data))
}

fn strings(group: &Group, name: &str, data: &[&str]) -> hdf5::Result<()> {
    let values = data
        .iter()
        .map(|s| VarLenUnicode::from_str(s).map_err(|e| hdf5::Error::from(e.to_string().as_str())))
        .collect::<hdf5::Result<Vec<_>>>()?;
    column(group, name, &values)
}

fn matrix<T: H5Type>(group: &Group, name: &str, data: &Array2<T>) -> hdf5::Result<()> {
    group
        .new_dataset::<T>()
        .shape(data.dim())
        .create(name)?
        .write(data.view())
}

fn image_table(file: &File, tel_type: &str, rows: usize, pixels: usize) -> hdf5::Result<()> {
    let group = file.create_group(tel_type)?;
    let mut charge = Array2::<f32>::zeros((rows, pixels));
    let mut peakpos = Array2::<f32>::zeros((rows, pixels));
    for r in 1..rows {
        for p in 0..pixels {
            charge[[r, p]] = (r * 10 + p) as f32;
            peakpos[[r, p]] = r as f32 + 0.5;
        }
    }
    matrix(&group, "charge", &charge)?;
    matrix(&group, "peakpos", &peakpos)
}

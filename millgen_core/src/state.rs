//! Physical state model derived row by row from the inputs.

use millgen_traits::NoiseSource;

use crate::dataset::{ColumnLayout, Dataset};
use crate::error::{GenError, Stage};
use crate::model::ModelConfig;
use crate::noise::perturb;
use crate::util::FIRST_DATA_ROW;

const FREENESS_INTERCEPT: f64 = 1000.0;
const FREENESS_ASYMPTOTE: f64 = 300.0;
const FREENESS_SLOPE: f64 = 0.5;

const HEAD_CONSTANT: f64 = 115_920.0;
const FLOW_TO_SLICE: f64 = 12.0 / 7.48;
/// Wire speed at or below which the headbox is treated as idle.
const MIN_WIRE_SPEED: f64 = 1.0;
/// Total stock flow at or below which blend values are zeroed.
const MIN_BLEND_FLOW: f64 = 100.0;

const CONTEXT: &str = "state model";

/// (specific energy input, freeness state) per stock stream.
const FREENESS_PAIRS: [(&str, &str); 3] = [
    ("MV_SWSpecificEnergy", "MV_SWFreeness"),
    ("MV_HWSpecificEnergy", "MV_HWFreeness"),
    ("MV_OCCSpecificEnergy", "MV_OCCFreeness"),
];

/// Refined-pulp freeness from specific energy, before noise.
#[inline]
pub fn freeness(specific_energy: f64) -> f64 {
    FREENESS_INTERCEPT
        - (FREENESS_INTERCEPT - FREENESS_ASYMPTOTE)
            * (1.0 - 1.0 / (FREENESS_SLOPE * specific_energy).exp())
}

/// Headbox pressure, slice opening and machine speed.
pub fn headbox(
    wire_speed: f64,
    jet_to_wire: f64,
    thin_stock_flow: f64,
    trim: f64,
    draw: f64,
) -> (f64, f64, f64) {
    if wire_speed <= MIN_WIRE_SPEED {
        return (0.0, 0.2, 0.0);
    }
    let jet = jet_to_wire * wire_speed;
    let pressure = jet.powi(2) / (2.0 * HEAD_CONSTANT);
    let slice = thin_stock_flow * FLOW_TO_SLICE / (jet * trim);
    (pressure, slice, wire_speed * draw)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stream {
    pub flow: f64,
    pub freeness: f64,
    pub crill: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Blend {
    pub pct: [f64; 3],
    pub freeness: f64,
    pub crill: f64,
}

/// Flow-weighted blend of the softwood, hardwood and OCC streams.
pub fn blend(streams: [Stream; 3]) -> Blend {
    let total: f64 = streams.iter().map(|s| s.flow).sum();
    if total <= MIN_BLEND_FLOW {
        return Blend::default();
    }
    Blend {
        pct: streams.map(|s| 100.0 * s.flow / total),
        freeness: streams.iter().map(|s| s.freeness * s.flow).sum::<f64>() / total,
        crill: streams.iter().map(|s| s.crill * s.flow).sum::<f64>() / total,
    }
}

struct Cols {
    freeness: [(usize, usize, f64); 3],
    wire_speed: usize,
    jet_to_wire: usize,
    thin_stock_flow: usize,
    flows: [usize; 3],
    crills: [usize; 3],
    headbox_pressure: usize,
    slice_opening: usize,
    machine_speed: usize,
    pcts: [usize; 3],
    blend_freeness: usize,
    blend_crill: usize,
}

impl Cols {
    fn resolve(layout: &ColumnLayout, model: &ModelConfig) -> Result<Self, GenError> {
        let col = |name: &str| layout.require(name, CONTEXT);
        let mut freeness = [(0, 0, 0.0); 3];
        for (slot, (energy, state)) in freeness.iter_mut().zip(FREENESS_PAIRS) {
            let noise = model.state.require(state, CONTEXT)?.noise;
            *slot = (col(energy)?, col(state)?, noise);
        }
        Ok(Self {
            freeness,
            wire_speed: col("MV_WireSpeed")?,
            jet_to_wire: col("MV_JettoWire")?,
            thin_stock_flow: col("MV_ThinStockFlow")?,
            flows: [col("MV_SWFlow")?, col("MV_HWFlow")?, col("MV_OCCFlow")?],
            crills: [
                col("PulpEye_SWCrill")?,
                col("PulpEye_HWCrill")?,
                col("PulpEye_OCCCrill")?,
            ],
            headbox_pressure: col("MV_HeadboxPressure")?,
            slice_opening: col("MV_SliceOpening")?,
            machine_speed: col("MV_MachineSpeed")?,
            pcts: [col("MV_SWPct")?, col("MV_HWPct")?, col("MV_OCCPct")?],
            blend_freeness: col("PulpEye_BlendFreeness")?,
            blend_crill: col("PulpEye_BlendCrill")?,
        })
    }
}

/// Resolve every column the state model reads or writes.
pub fn check_columns(layout: &ColumnLayout, model: &ModelConfig) -> Result<(), GenError> {
    Cols::resolve(layout, model).map(|_| ())
}

/// Fill the fixed physical state columns for every data row.
pub fn derive_state(
    ds: &mut Dataset,
    model: &ModelConfig,
    rng: &mut dyn NoiseSource,
) -> Result<(), GenError> {
    let c = Cols::resolve(ds.layout(), model)?;
    let p = &model.process;
    let at = |ds: &Dataset, row: usize, col: usize| ds.value(Stage::State, row, col);

    for row in FIRST_DATA_ROW..=ds.final_row() {
        for &(energy, state, noise) in &c.freeness {
            let v = freeness(at(ds, row, energy)?) + perturb(rng, noise);
            ds.set(row, state, Some(v));
        }

        let (pressure, slice, speed) = headbox(
            at(ds, row, c.wire_speed)?,
            at(ds, row, c.jet_to_wire)?,
            at(ds, row, c.thin_stock_flow)?,
            p.trim,
            p.draw,
        );
        ds.set(row, c.headbox_pressure, Some(pressure));
        ds.set(row, c.slice_opening, Some(slice));
        ds.set(row, c.machine_speed, Some(speed));

        let mut streams = [Stream {
            flow: 0.0,
            freeness: 0.0,
            crill: 0.0,
        }; 3];
        for (k, s) in streams.iter_mut().enumerate() {
            *s = Stream {
                flow: at(ds, row, c.flows[k])?,
                freeness: at(ds, row, c.freeness[k].1)?,
                crill: at(ds, row, c.crills[k])?,
            };
        }
        let b = blend(streams);
        for (col, pct) in c.pcts.into_iter().zip(b.pct) {
            ds.set(row, col, Some(pct));
        }
        ds.set(row, c.blend_freeness, Some(b.freeness));
        ds.set(row, c.blend_crill, Some(b.crill));
    }
    Ok(())
}

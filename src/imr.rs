//! Image-rejection calibration
//!
//! The I/Q compensation DACs take a 6 bit code: bit 5 selects the I path,
//! bits 4:0 are the magnitude. Stepping down through magnitude zero flips
//! the path, so the codes form one signed axis per DAC.
//!
//! The search is a greedy coordinate descent over the measured residual
//! image. A cross probe picks the first axis, then each axis gets a three
//! point probe and a climb, and a 3x3 refinement picks the final point.
//! Probe order is fixed and ties always keep the earlier probe.

use embedded_hal::blocking::{
    delay::DelayMs,
    i2c::{Read, Write},
};

use crate::{
    constants::*,
    device::{Host, R820t},
    errors::*,
    register::*,
};

/// One I/Q compensation DAC code
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IqCode(u8);

impl IqCode {
    /// Compensation off
    pub const NEUTRAL: IqCode = IqCode(0);

    const I_PATH: u8 = 0x20;
    const MAGNITUDE: u8 = 0x1F;

    pub fn new(i_path: bool, magnitude: u8) -> Self {
        IqCode(if i_path { Self::I_PATH } else { 0 } | (magnitude & Self::MAGNITUDE))
    }

    pub fn from_bits(bits: u8) -> Self {
        IqCode(bits & (Self::I_PATH | Self::MAGNITUDE))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn magnitude(self) -> u8 {
        self.0 & Self::MAGNITUDE
    }

    pub fn i_path(self) -> bool {
        self.0 & Self::I_PATH != 0
    }

    /// One step away from neutral on the same path
    pub fn step_up(self) -> Self {
        Self::new(self.i_path(), (self.magnitude() + 1).min(Self::MAGNITUDE))
    }

    /// One step towards neutral, crossing over to the other path at zero
    pub fn step_down(self) -> Self {
        match self.magnitude() {
            0 => Self::new(!self.i_path(), 1),
            m => Self::new(self.i_path(), m - 1),
        }
    }
}

/// A probed compensation point and its residual image, lower is better
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IqPoint {
    pub gain: IqCode,
    pub phase: IqCode,
    pub value: u16,
}

/// Source of residual image measurements
pub trait ImageProbe {
    /// Applies a compensation point and measures the residual image.
    fn probe(&mut self, gain: IqCode, phase: IqCode) -> Result<u16, Error>;
}

/// Sum of six readings without the highest and the lowest
pub fn trimmed_sum(readings: &[u8; 6]) -> u16 {
    let (sum, max, min) = readings.iter().fold((0u16, 0u8, u8::MAX), |(s, hi, lo), &r| {
        (s + r as u16, hi.max(r), lo.min(r))
    });
    sum - max as u16 - min as u16
}

/// Compensation axis
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    Gain,
    Phase,
}

impl Axis {
    fn other(self) -> Self {
        match self {
            Axis::Gain => Axis::Phase,
            Axis::Phase => Axis::Gain,
        }
    }
}

fn measure<P: ImageProbe>(probe: &mut P, gain: IqCode, phase: IqCode) -> Result<IqPoint, Error> {
    let value = probe.probe(gain, phase)?;
    trace!("imr probe gain {} phase {}: {}", gain.bits(), phase.bits(), value);
    Ok(IqPoint { gain, phase, value })
}

/// Minimum of three probes. Index 2 is compared first, ties keep
/// the earlier winner.
fn pick_best(mut points: [IqPoint; 3]) -> IqPoint {
    for &i in [2, 1].iter() {
        if points[0].value > points[i].value {
            points.swap(0, i);
        }
    }
    points[0]
}

/// Probes neutral and one step either way on each axis alone, and
/// returns the axis to search first with its three probes.
fn cross<P: ImageProbe>(probe: &mut P) -> Result<(Axis, [IqPoint; 3]), Error> {
    let n = IqCode::NEUTRAL;
    let q1 = IqCode::new(false, 1);
    let i1 = IqCode::new(true, 1);

    let mut points = [IqPoint::default(); 5];
    let mut best = IqPoint { value: 255, ..Default::default() };
    for (point, &(gain, phase)) in points
        .iter_mut()
        .zip([(n, n), (n, q1), (n, i1), (q1, n), (i1, n)].iter())
    {
        *point = measure(probe, gain, phase)?;
        if point.value < best.value {
            best = *point;
        }
    }

    Ok(if best.phase.magnitude() == 1 {
        (Axis::Phase, [points[0], points[1], points[2]])
    } else {
        (Axis::Gain, [points[0], points[3], points[4]])
    })
}

/// Probes `center` and its two neighbours along `axis`.
fn tree<P: ImageProbe>(probe: &mut P, center: IqPoint, axis: Axis) -> Result<[IqPoint; 3], Error> {
    let (g, p) = (center.gain, center.phase);
    Ok(match axis {
        Axis::Gain => [
            measure(probe, g, p)?,
            measure(probe, g.step_up(), p)?,
            measure(probe, g.step_down(), p)?,
        ],
        Axis::Phase => [
            measure(probe, g, p)?,
            measure(probe, g, p.step_up())?,
            measure(probe, g, p.step_down())?,
        ],
    })
}

/// Steps outwards along `axis` while the residual does not get worse.
fn climb<P: ImageProbe>(probe: &mut P, start: IqPoint, axis: Axis) -> Result<IqPoint, Error> {
    let mut best = start;
    let mut step = start;
    while step.gain.magnitude() < IMR_TRIAL && step.phase.magnitude() < IMR_TRIAL {
        match axis {
            Axis::Gain => step.gain = step.gain.step_up(),
            Axis::Phase => step.phase = step.phase.step_up(),
        }
        step = measure(probe, step.gain, step.phase)?;
        if step.value <= best.value {
            best = step;
        } else {
            break;
        }
    }
    Ok(best)
}

/// Best point of the gain columns around `center`, each searched along phase.
pub fn refine<P: ImageProbe>(probe: &mut P, center: IqPoint) -> Result<IqPoint, Error> {
    let g = center.gain;
    let columns = if g.magnitude() == 0 {
        [IqCode::new(false, 1), g, IqCode::new(true, 1)]
    } else {
        [g.step_down(), g, g.step_up()]
    };

    let mut best = [IqPoint::default(); 3];
    for (b, &gain) in best.iter_mut().zip(columns.iter()) {
        *b = pick_best(tree(probe, IqPoint { gain, ..center }, Axis::Phase)?);
    }
    Ok(pick_best(best))
}

/// Full search from neutral
pub fn search<P: ImageProbe>(probe: &mut P) -> Result<IqPoint, Error> {
    let (axis, points) = cross(probe)?;
    let best = climb(probe, pick_best(points), axis)?;
    let seed = pick_best(tree(probe, best, axis.other())?);
    let best = climb(probe, seed, axis.other())?;
    let best = pick_best(tree(probe, best, axis)?);
    refine(probe, best)
}

/// Ring oscillator setup of one IMR bucket
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct RingSetting {
    divisor: u32,
    se23: u8,
    div_select: u8,
    output_power: u8,
}

const fn ring(divisor: u32, se23: u8, div_select: u8, output_power: u8) -> RingSetting {
    RingSetting {
        divisor,
        se23,
        div_select,
        output_power,
    }
}

const RING_SETTINGS: [RingSetting; 5] = [
    ring(48, 1, 3, 2),
    ring(16, 0, 2, 0),
    ring(8, 0, 1, 3),
    ring(6, 1, 0, 3),
    ring(4, 0, 0, 1),
];

/// Bucket calibrated with the full search
const SEED_BUCKET: usize = 3;
/// Buckets refined from the seed, in order
const REFINED_BUCKETS: [usize; 4] = [1, 0, 2, 4];

/// Ring N and ring VCO frequency, kHz. Saturates at N = 15.
fn ring_n(ref_khz: u32) -> (u8, u32) {
    let n = (0..16u32)
        .find(|n| (16 + n) * 8 * ref_khz >= IMR_RING_VCO_MIN_KHZ)
        .unwrap_or(15);
    (n as u8, (16 + n) * 8 * ref_khz)
}

/// LO used to calibrate `bucket`, kHz
fn ring_lo_khz(ref_khz: u32, bucket: usize) -> u32 {
    let (_, vco) = ring_n(ref_khz);
    vco / RING_SETTINGS[bucket].divisor - IMR_RING_OFFSET_KHZ
}

/// Measures through the tuner's image detector.
struct DetectorProbe<'a, I2C, H, Delay> {
    tuner: &'a mut R820t<I2C, H>,
    delay: &'a mut Delay,
}

impl<'a, I2C, E, H, Delay> ImageProbe for DetectorProbe<'a, I2C, H, Delay>
where
    I2C: Write<Error = E> + Read<Error = E>,
    H: Host,
    Delay: DelayMs<u16>,
{
    fn probe(&mut self, gain: IqCode, phase: IqCode) -> Result<u16, Error> {
        self.tuner.write_iq(gain, phase)?;
        self.tuner.measure_image(self.delay)
    }
}

impl<I2C, E, H> R820t<I2C, H>
where
    I2C: Write<Error = E> + Read<Error = E>,
    H: Host,
{
    /// Writes the compensation DACs, top bits from the power-on image.
    pub(crate) fn write_iq(&mut self, gain: IqCode, phase: IqCode) -> Result<(), Error> {
        self.write_reg(Reg::<R08>::initial().set(ImrGain(gain.bits())))?;
        self.write_reg(Reg::<R09>::initial().set(ImrPhase(phase.bits())))
    }

    pub(crate) fn measure_image<Delay>(&mut self, delay: &mut Delay) -> Result<u16, Error>
    where
        Delay: DelayMs<u16>,
    {
        delay.delay_ms(IMR_READ_SETTLE_MS);
        let mut readings = [0u8; 6];
        for r in readings.iter_mut() {
            *r = self.read_status(2)?.image_detector();
        }
        Ok(trimmed_sum(&readings))
    }

    /// Raises the VGA until the image is measurable.
    fn precharge_vga<Delay>(&mut self, delay: &mut Delay) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        for code in 12..16 {
            self.modify(|r: Reg<R0C>| r.set(VgaGain(code)))?;
            delay.delay_ms(IMR_VGA_SETTLE_MS);
            if self.measure_image(delay)? > IMR_VGA_THRESHOLD {
                break;
            }
        }
        Ok(())
    }

    /// Routes the ring oscillator into the RF path with the filter wide open.
    fn prepare_imr(&mut self) -> Result<(), Error> {
        self.write_init_regs()?;

        self.modify(|r: Reg<R05>| r.set(AirInput::Off))?;
        self.modify(|r: Reg<R07>| r.set(MixerGainMode::Manual))?;
        self.modify(|r: Reg<R0A>| r.set(FilterCode(0x0F)))?;
        self.modify(|r: Reg<R0B>| r.set(FilterCap(0b11)).set(HighPassCorner(0)))?;
        self.modify(|r: Reg<R0C>| r.set(AdcPower::On).set(VgaMode::Code).set(VgaGain(0x0B)))?;
        self.modify(|r: Reg<R0F>| r.set(ClockOutput::On))?;
        self.modify(|r: Reg<R18>| r.set(RingPower::On))?;
        self.modify(|r: Reg<R1C>| r.set(RingInput::On))?;
        self.modify(|r: Reg<R1E>| r.set(PowerDetector3::On))?;
        // filter gain +6dB
        self.modify(|r: Reg<R06>| {
            let g = r.get::<FilterGain>().0 | 0b10;
            r.set(FilterGain(g))
        })
    }

    /// Calibrates one ring bucket. A `seed` runs only the refinement.
    fn imr_bucket<Delay>(
        &mut self,
        delay: &mut Delay,
        bucket: usize,
        seed: Option<IqPoint>,
    ) -> Result<IqPoint, Error>
    where
        Delay: DelayMs<u16>,
    {
        let ref_khz = self.config.ring_ref_khz();
        let (n, _) = ring_n(ref_khz);
        let ring = RING_SETTINGS[bucket];

        self.modify(|r: Reg<R18>| r.set(RingN(n)).set(RingSe23(ring.se23)))?;
        self.modify(|r: Reg<R19>| r.set(RingDivSelect(ring.div_select)))?;
        self.modify(|r: Reg<R1F>| r.set(RingOutputPower(ring.output_power)))?;

        let lo_khz = ring_lo_khz(ref_khz, bucket);
        self.set_mux(lo_khz)?;
        self.set_pll(delay, lo_khz * 1000, None)?;

        self.precharge_vga(delay)?;

        let result = {
            let mut probe = DetectorProbe { tuner: &mut *self, delay: &mut *delay };
            match seed {
                Some(seed) => refine(&mut probe, seed),
                None => search(&mut probe),
            }
        };
        let restored = self.write_iq(IqCode::NEUTRAL, IqCode::NEUTRAL);

        let point = result?;
        restored?;
        info!(
            "imr bucket {}: gain {} phase {} residual {}",
            bucket,
            point.gain.bits(),
            point.phase.bits(),
            point.value
        );
        Ok(point)
    }

    /// Full search on the seed bucket, refinement on the others.
    pub(crate) fn run_imr_calibration<Delay>(&mut self, delay: &mut Delay) -> Result<(), Error>
    where
        Delay: DelayMs<u16>,
    {
        self.prepare_imr()?;
        self.cal.imr_done = false;

        let seed = self.imr_bucket(delay, SEED_BUCKET, None)?;
        self.cal.imr[SEED_BUCKET] = seed;
        for &bucket in REFINED_BUCKETS.iter() {
            self.cal.imr[bucket] = self.imr_bucket(delay, bucket, Some(seed))?;
        }

        self.cal.imr_done = true;
        Ok(())
    }
}

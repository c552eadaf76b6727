//! Simulated tuner, host and clock

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use embedded_hal::blocking::{delay::DelayMs, i2c};

use r820t::{Config, Host, R820t};

pub const ADDRESS: u8 = 0x34;

#[derive(Debug)]
pub struct BusError;

/// Chip state as seen from the bus
pub struct ChipState {
    pub regs: [u8; 32],
    /// Every register byte written, in order
    pub writes: Vec<(u8, u8)>,
    pub reads: usize,
    /// Lock detector as a function of the register file
    pub lock: fn(&[u8; 32]) -> bool,
    pub vco_band: u8,
    pub fine_tune: u8,
    pub filter_code: u8,
    /// Detector reading for (R8[5:0], R9[5:0])
    pub detector: fn(u8, u8) -> u8,
    pub fail_bus: bool,
    /// Write messages still accepted before the bus starts failing
    pub fail_after: Option<usize>,
}

impl Default for ChipState {
    fn default() -> Self {
        ChipState {
            regs: [0; 32],
            writes: Vec::new(),
            reads: 0,
            lock: |_| true,
            vco_band: 0x20,
            fine_tune: 2,
            filter_code: 8,
            detector: |_, _| 40,
            fail_bus: false,
            fail_after: None,
        }
    }
}

impl ChipState {
    /// Logical status bytes, before the bus reverses them
    pub fn status(&self) -> [u8; 5] {
        let lock = if (self.lock)(&self.regs) { 0x40 } else { 0x00 };
        [
            0x69,
            (self.detector)(self.regs[0x08] & 0x3F, self.regs[0x09] & 0x3F),
            lock | self.vco_band,
            (self.regs[0x07] & 0x0F) << 4 | (self.regs[0x05] & 0x0F),
            (self.fine_tune << 4) | self.filter_code,
        ]
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    /// Writes to one register since the log was last cleared
    pub fn writes_to(&self, addr: u8) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|&(_, v)| v)
            .collect()
    }

    /// Filter calibration pulses since the log was last cleared
    pub fn filter_calibrations(&self) -> usize {
        self.writes_to(0x0B).iter().filter(|&&v| v & 0x10 != 0).count()
    }
}

#[derive(Clone, Default)]
pub struct Chip(pub Rc<RefCell<ChipState>>);

impl i2c::Write for Chip {
    type Error = BusError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        assert_eq!(address, ADDRESS);
        assert!(bytes.len() <= 8, "message too long");
        let mut s = self.0.borrow_mut();
        if s.fail_bus {
            return Err(BusError);
        }
        match s.fail_after {
            Some(0) => return Err(BusError),
            Some(n) => s.fail_after = Some(n - 1),
            None => {}
        }
        let (&reg, data) = bytes.split_first().expect("empty write");
        for (i, &v) in data.iter().enumerate() {
            let addr = reg + i as u8;
            s.regs[addr as usize] = v;
            s.writes.push((addr, v));
        }
        Ok(())
    }
}

impl i2c::Read for Chip {
    type Error = BusError;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        assert_eq!(address, ADDRESS);
        let mut s = self.0.borrow_mut();
        if s.fail_bus {
            return Err(BusError);
        }
        s.reads += 1;
        for (b, v) in buffer.iter_mut().zip(s.status().iter()) {
            *b = v.reverse_bits();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct DemodState {
    /// Repeater switches, in order
    pub repeater: Vec<bool>,
    pub if_hz: Option<u32>,
    pub fail_repeater: bool,
}

#[derive(Clone, Default)]
pub struct Demod(pub Rc<RefCell<DemodState>>);

impl Host for Demod {
    type Error = ();

    fn i2c_repeater(&mut self, enable: bool) -> Result<(), ()> {
        let mut s = self.0.borrow_mut();
        if s.fail_repeater {
            return Err(());
        }
        s.repeater.push(enable);
        Ok(())
    }

    fn set_if_frequency(&mut self, hz: u32) -> Result<(), ()> {
        self.0.borrow_mut().if_hz = Some(hz);
        Ok(())
    }
}

/// Counts requested sleep time
#[derive(Default)]
pub struct Clock {
    pub ms: u32,
}

impl DelayMs<u16> for Clock {
    fn delay_ms(&mut self, ms: u16) {
        self.ms += ms as u32;
    }
}

pub struct Bench {
    pub tuner: R820t<Chip, Demod>,
    pub chip: Rc<RefCell<ChipState>>,
    pub demod: Rc<RefCell<DemodState>>,
    pub clock: Clock,
}

impl Bench {
    pub fn new(config: Config, chip: ChipState) -> Self {
        let chip = Chip(Rc::new(RefCell::new(chip)));
        let demod = Demod::default();
        Bench {
            chip: chip.0.clone(),
            demod: demod.0.clone(),
            tuner: R820t::new(chip, demod, config),
            clock: Clock::default(),
        }
    }

    pub fn initialised(config: Config, chip: ChipState) -> Self {
        let mut bench = Self::new(config, chip);
        bench.tuner.initialise(&mut bench.clock).unwrap();
        bench.clear();
        bench
    }

    /// Forgets bus, repeater and clock history.
    pub fn clear(&mut self) {
        self.chip.borrow_mut().writes.clear();
        self.chip.borrow_mut().reads = 0;
        self.demod.borrow_mut().repeater.clear();
        self.clock.ms = 0;
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.chip.borrow().reg(addr)
    }

    /// Shadow and chip agree on the whole writable bank.
    pub fn assert_in_sync(&self) {
        let chip = self.chip.borrow();
        assert_eq!(&chip.regs[0x05..0x20], &self.tuner.registers().as_bytes()[..]);
    }
}

//! Direct register access to the BCM283x GPIO block through `/dev/gpiomem` or `/dev/mem`.
use crate::{GpioDriver, GpioError, GpioResult};
use bitvec::vec::BitVec;
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;

pub struct RawGpioDriver {
    mmap: MmapRaw,
    used_pins: BitVec,
}

impl RawGpioDriver {
    // 0x7e200000 on the bus, 0x3F200000 for the ARM on BCM2837
    const GPIO_BASE: u32 = 0x3F200000;

    const PIN_COUNT: usize = 58;

    const FUNCTION_OUTPUT: u8 = 0b001;

    fn create(path: &str) -> GpioResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        // /dev/gpiomem already starts at the GPIO block
        let offset = if path == "/dev/gpiomem" { 0 } else { Self::GPIO_BASE as u64 };

        let mmap = MmapOptions::new().offset(offset).len(4096).map_raw(&file)?;

        debug!("Mapped GPIO registers from {} at offset {:#x}", path, offset);

        Ok(RawGpioDriver {
            mmap,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem")
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem")
    }

    pub fn raw_set_pin_function(&self, pin_index: usize, function: u8) -> GpioResult<()> {
        if function > 0b111 {
            return Err(GpioError::InvalidArgument);
        }

        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift);
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    pub fn raw_set_pin_output(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register
        let register_ptr =
            unsafe { mmap.add(if high { 0x1c / 4 } else { 0x28 / 4 } + pin_index / 32) };
        let shift = pin_index % 32;

        unsafe { register_ptr.write_volatile(1 << shift) };

        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn configure_output(&mut self, index: usize, value: bool) -> GpioResult<()> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.used_pins[index] {
            return Err(GpioError::AlreadyInUse);
        }

        // Latch the level first so the pin doesn't glitch when it becomes an output
        self.raw_set_pin_output(index, value)?;
        self.raw_set_pin_function(index, Self::FUNCTION_OUTPUT)?;
        self.used_pins.set(index, true);

        Ok(())
    }

    fn write(&mut self, index: usize, value: bool) -> GpioResult<()> {
        if !self.used_pins.get(index).is_some_and(|used| *used) {
            return Err(GpioError::NotOutput(index));
        }

        self.raw_set_pin_output(index, value)
    }
}

//! 28BYJ-48 unipolar stepper through a ULN2003 driver board.
//!
//! Half-step drive: eight phases per electrical cycle, alternating one and
//! two energised coils. Forward walks the table upwards.
//!
//! ## Safety contract
//!
//! The coils draw current whenever any phase is applied. Callers must
//! [`release`](HalfStepper::release) after every stroke; the ULN2003 has no
//! thermal cut-out of its own.

use embedded_hal::digital::{OutputPin, PinState};

use crate::error::ActuatorError;

/// Coil pattern per phase, IN1..IN4.
pub const HALF_STEP_SEQUENCE: [[bool; 4]; 8] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Clockwise on the output shaft.
    Forward,
    /// Counter-clockwise.
    Reverse,
}

pub struct HalfStepper<P> {
    coils: [P; 4],
    phase: usize,
    energised: bool,
}

impl<P: OutputPin> HalfStepper<P> {
    /// Take ownership of IN1..IN4 and release all coils.
    pub fn new(coils: [P; 4]) -> Result<Self, ActuatorError> {
        let mut stepper = Self {
            coils,
            phase: 0,
            energised: true,
        };
        stepper.release()?;
        Ok(stepper)
    }

    /// Advance one half-step and apply the new phase.
    pub fn step(&mut self, direction: Direction) -> Result<(), ActuatorError> {
        let len = HALF_STEP_SEQUENCE.len();
        self.phase = match direction {
            Direction::Forward => (self.phase + 1) % len,
            Direction::Reverse => (self.phase + len - 1) % len,
        };
        self.apply(HALF_STEP_SEQUENCE[self.phase])
    }

    /// De-energise all four coils.
    pub fn release(&mut self) -> Result<(), ActuatorError> {
        self.apply([false; 4])?;
        self.energised = false;
        Ok(())
    }

    pub fn is_energised(&self) -> bool {
        self.energised
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    fn apply(&mut self, pattern: [bool; 4]) -> Result<(), ActuatorError> {
        for (pin, &on) in self.coils.iter_mut().zip(pattern.iter()) {
            pin.set_state(PinState::from(on))
                .map_err(|_| ActuatorError::GpioWriteFailed)?;
        }
        self.energised = pattern.iter().any(|&on| on);
        Ok(())
    }
}

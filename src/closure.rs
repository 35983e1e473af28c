//! Closure relations of a compressible ideal gas
//!
//! The conserved variables of a node are `[rho, rho u_1, ..., rho u_d, rho E]`.
use crate::{partition::FieldLayout, traits::DerivedQuantity, types::RealScalar};
use num::NumCast;

/// Names of the momentum components
const MOMENTUM_NAMES: [&str; 3] = ["Momentum_x", "Momentum_y", "Momentum_z"];

/// A constant in the scalar type
fn constant<T: RealScalar>(value: f64) -> T {
    <T as NumCast>::from(value).unwrap_or_else(T::nan)
}

/// Free stream state used to normalise coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FreeStream<T: RealScalar> {
    /// Density
    pub density: T,
    /// Pressure
    pub pressure: T,
    /// Velocity magnitude
    pub velocity: T,
}

impl<T: RealScalar> FreeStream<T> {
    /// Dynamic pressure
    pub fn dynamic_pressure(&self) -> T {
        constant::<T>(0.5) * self.density * self.velocity * self.velocity
    }
}

/// A compressible ideal gas
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IdealGas<T: RealScalar> {
    dim: usize,
    gamma: T,
    gas_constant: T,
    free_stream: Option<FreeStream<T>>,
}

/// A quantity computed by [IdealGas]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdealGasQuantity {
    /// Static pressure
    Pressure,
    /// Static temperature
    Temperature,
    /// Local Mach number
    Mach,
    /// Pressure coefficient, relative to the free stream
    PressureCoefficient,
}

impl IdealGasQuantity {
    /// Field name of the quantity
    pub fn name(self) -> &'static str {
        match self {
            IdealGasQuantity::Pressure => "Pressure",
            IdealGasQuantity::Temperature => "Temperature",
            IdealGasQuantity::Mach => "Mach",
            IdealGasQuantity::PressureCoefficient => "Pressure_Coefficient",
        }
    }
}

impl<T: RealScalar> IdealGas<T> {
    /// Create new
    pub fn new(dim: usize, gamma: T, gas_constant: T) -> Self {
        Self {
            dim,
            gamma,
            gas_constant,
            free_stream: None,
        }
    }

    /// Air at standard conditions
    pub fn air(dim: usize) -> Self {
        Self::new(
            dim,
            constant(1.4),
            constant(287.058),
        )
    }

    /// Set the free stream state
    pub fn with_free_stream(mut self, free_stream: FreeStream<T>) -> Self {
        self.free_stream = Some(free_stream);
        self
    }

    /// Geometric dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Ratio of specific heats
    pub fn gamma(&self) -> T {
        self.gamma
    }

    /// Specific gas constant
    pub fn gas_constant(&self) -> T {
        self.gas_constant
    }

    /// Free stream state
    pub fn free_stream(&self) -> Option<&FreeStream<T>> {
        self.free_stream.as_ref()
    }

    /// Number of conserved variables
    pub fn conserved_count(&self) -> usize {
        self.dim + 2
    }

    /// Field layout of the conserved variables
    pub fn conserved_layout(&self) -> FieldLayout {
        let names = std::iter::once("Density")
            .chain(MOMENTUM_NAMES.iter().copied().take(self.dim))
            .chain(std::iter::once("Energy"));
        FieldLayout::new(names, self.conserved_count())
    }

    /// Density, squared velocity magnitude and total energy per volume
    fn state(&self, conserved: &[T]) -> Option<(T, T, T)> {
        if conserved.len() < self.conserved_count() {
            return None;
        }
        let density = conserved[0];
        let momentum_sq = conserved[1..=self.dim]
            .iter()
            .fold(T::zero(), |acc, m| acc + *m * *m);
        Some((
            density,
            momentum_sq / (density * density),
            conserved[self.dim + 1],
        ))
    }

    /// Static pressure
    pub fn pressure(&self, conserved: &[T]) -> T {
        match self.state(conserved) {
            Some((density, velocity_sq, energy)) => {
                (self.gamma - T::one())
                    * (energy - constant::<T>(0.5) * density * velocity_sq)
            }
            None => T::nan(),
        }
    }

    /// Static temperature
    pub fn temperature(&self, conserved: &[T]) -> T {
        match self.state(conserved) {
            Some((density, _, _)) => self.pressure(conserved) / (density * self.gas_constant),
            None => T::nan(),
        }
    }

    /// Speed of sound
    pub fn sound_speed(&self, conserved: &[T]) -> T {
        match self.state(conserved) {
            Some((density, _, _)) => (self.gamma * self.pressure(conserved) / density).sqrt(),
            None => T::nan(),
        }
    }

    /// Local Mach number
    pub fn mach(&self, conserved: &[T]) -> T {
        match self.state(conserved) {
            Some((_, velocity_sq, _)) => velocity_sq.sqrt() / self.sound_speed(conserved),
            None => T::nan(),
        }
    }

    /// Pressure coefficient
    ///
    /// This is NaN if no free stream state is set.
    pub fn pressure_coefficient(&self, conserved: &[T]) -> T {
        match self.free_stream {
            Some(fs) => (self.pressure(conserved) - fs.pressure) / fs.dynamic_pressure(),
            None => T::nan(),
        }
    }

    /// Evaluate a quantity
    pub fn evaluate(&self, quantity: IdealGasQuantity, conserved: &[T]) -> T {
        match quantity {
            IdealGasQuantity::Pressure => self.pressure(conserved),
            IdealGasQuantity::Temperature => self.temperature(conserved),
            IdealGasQuantity::Mach => self.mach(conserved),
            IdealGasQuantity::PressureCoefficient => self.pressure_coefficient(conserved),
        }
    }

    /// A derived quantity that can be passed to the solution merger
    pub fn quantity(&self, quantity: IdealGasQuantity) -> Box<dyn DerivedQuantity<T>> {
        Box::new(IdealGasDerived {
            gas: *self,
            quantity,
        })
    }

    /// Pressure, temperature and Mach number, followed by the pressure coefficient if a free
    /// stream state is set
    pub fn quantities(&self) -> Vec<Box<dyn DerivedQuantity<T>>> {
        let mut q = vec![
            self.quantity(IdealGasQuantity::Pressure),
            self.quantity(IdealGasQuantity::Temperature),
            self.quantity(IdealGasQuantity::Mach),
        ];
        if self.free_stream.is_some() {
            q.push(self.quantity(IdealGasQuantity::PressureCoefficient));
        }
        q
    }
}

struct IdealGasDerived<T: RealScalar> {
    gas: IdealGas<T>,
    quantity: IdealGasQuantity,
}

impl<T: RealScalar> DerivedQuantity<T> for IdealGasDerived<T> {
    fn name(&self) -> &str {
        self.quantity.name()
    }
    fn evaluate(&self, conserved: &[T]) -> T {
        self.gas.evaluate(self.quantity, conserved)
    }
}

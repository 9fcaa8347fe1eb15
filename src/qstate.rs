use std::fmt::Display;

use anyhow::Result;
use nalgebra::DVector;
use num_complex::Complex;

use crate::Qbit;

pub struct QState {
    pub(crate) state: DVector<Qbit>,
}

impl QState {
    pub fn new(state: &[Qbit]) -> Result<Self> {
        let len = state.len();
        if len == 0 || (len & (len - 1)) != 0 {
            return Err(anyhow::anyhow!(
                "State vector length must be a non-zero power of 2"
            ));
        }

        let state = DVector::from_row_slice(state);
        Ok(Self { state })
    }

    /// The uniform superposition |+>^n, every amplitude 1/sqrt(2^n).
    pub fn uniform(num_of_qbits: usize) -> Result<Self> {
        if num_of_qbits < 1 {
            return Err(anyhow::anyhow!(
                "Number of qubits must be at least 1, got {}",
                num_of_qbits
            ));
        }

        let size = 2_usize.pow(num_of_qbits as u32);
        let amplitude = Complex::new(1.0 / (size as f64).sqrt(), 0.0);
        Ok(Self {
            state: DVector::from_element(size, amplitude),
        })
    }

    /// The computational basis state for a bitstring, most significant
    /// bit first: "0101" is basis index 5 of a 4-qubit register.
    pub fn basis(qbits: &str) -> Result<Self> {
        if qbits.is_empty() {
            return Err(anyhow::anyhow!("Bitstring must not be empty"));
        }
        if let Some(c) = qbits.chars().find(|c| *c != '0' && *c != '1') {
            return Err(anyhow::anyhow!(
                "Bitstring may only contain '0' and '1', got {:?}",
                c
            ));
        }

        let index = usize::from_str_radix(qbits, 2)?;
        let mut state = DVector::zeros(2_usize.pow(qbits.len() as u32));
        state[index] = Complex::new(1.0, 0.0);

        Ok(Self { state })
    }

    pub fn num_of_qbits(&self) -> usize {
        self.state.len().ilog2() as usize
    }

    pub fn norm(&self) -> f64 {
        self.state.norm()
    }

    /// Squared overlap |<self|other>|^2.
    pub fn fidelity(&self, other: &QState) -> f64 {
        self.state.dotc(&other.state).norm_sqr()
    }
}

impl Display for QState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bin_width = self.num_of_qbits();

        for (i, value) in self.state.iter().enumerate() {
            writeln!(f, "|{:0width$b}>: {}", i, value, width = bin_width)?;
        }

        Ok(())
    }
}

impl From<QState> for DVector<Qbit> {
    fn from(qstate: QState) -> Self {
        qstate.state
    }
}

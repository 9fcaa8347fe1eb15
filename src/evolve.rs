use anyhow::Result;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;

use crate::qstate::QState;
use crate::Qbit;

/// Apply exp(-i*angle*g) to the state via the dense matrix exponential.
///
/// For a Hermitian generator the propagator is unitary, so the state norm
/// is preserved to numerical tolerance. Each call is O(N^3) in the
/// dimension N = 2^n, which caps practical qubit counts around 10-12.
pub fn propagate(g: &DMatrix<Qbit>, angle: f64, state: &DVector<Qbit>) -> DVector<Qbit> {
    let u = (g * Complex::new(0.0, -angle)).exp();
    u * state
}

/// One ansatz layer: the marking propagator, then the driver propagator.
pub fn apply_layer(
    state: &DVector<Qbit>,
    h: &DMatrix<Qbit>,
    d: &DMatrix<Qbit>,
    alpha: f64,
    beta: f64,
) -> DVector<Qbit> {
    let state = propagate(h, alpha, state);
    propagate(d, beta, &state)
}

/// Re(<s|op|s>) for a normalized state s.
pub fn expectation(op: &DMatrix<Qbit>, state: &DVector<Qbit>) -> f64 {
    let energy = state.adjoint() * op * state;
    energy[0].re
}

/// Run the full ansatz from |+>^n and return the cost together with the
/// final state.
///
/// The angles alternate (alpha_1, beta_1, ..., alpha_p, beta_p), one pair
/// per layer. The cost is the expectation value of the marking generator,
/// which lies in [-1, 0] and equals minus the target fidelity.
pub fn evaluate(
    h: &DMatrix<Qbit>,
    d: &DMatrix<Qbit>,
    num_of_qbits: usize,
    angles: &[f64],
) -> Result<(f64, QState)> {
    if angles.is_empty() || angles.len() % 2 != 0 {
        return Err(anyhow::anyhow!(
            "Angle vector length must be 2p for a depth-p ansatz, got {}",
            angles.len()
        ));
    }

    let mut state = DVector::from(QState::uniform(num_of_qbits)?);
    for pair in angles.chunks_exact(2) {
        state = apply_layer(&state, h, d, pair[0], pair[1]);
    }

    let cost = expectation(h, &state);
    Ok((cost, QState { state }))
}

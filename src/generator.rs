use anyhow::Result;
use nalgebra::DMatrix;

use crate::qstate::QState;
use crate::Qbit;

/// The rank-1 generator -|v><v| of a unit vector v.
///
/// Hermitian with a single eigenvalue -1 on v and 0 everywhere else, so
/// exp(-i*angle*G) is unitary for any real angle. The caller guarantees
/// that v has unit norm.
pub fn projector_generator(v: &QState) -> DMatrix<Qbit> {
    -(&v.state * v.state.adjoint())
}

/// The marking generator H = -|omega><omega| of a target basis state.
pub fn marking_generator(target: &QState) -> DMatrix<Qbit> {
    projector_generator(target)
}

/// The driver generator D = -|+^n><+^n| built from the uniform state.
pub fn driver_generator(num_of_qbits: usize) -> Result<DMatrix<Qbit>> {
    Ok(projector_generator(&QState::uniform(num_of_qbits)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use nalgebra::DVector;
    use num_complex::Complex;

    #[test]
    fn test_generator_is_hermitian() -> Result<()> {
        let g = driver_generator(3)?;
        let diff = (&g - g.adjoint()).norm();
        assert_approx_eq!(0.0, diff);
        Ok(())
    }

    #[test]
    fn test_generator_spectrum_action() -> Result<()> {
        let target = QState::basis("10")?;
        let g = marking_generator(&target);

        // G|omega> = -|omega>
        let on_target = &g * &target.state;
        let expected = -&target.state;
        assert_approx_eq!(0.0, (on_target - expected).norm());

        // G annihilates anything orthogonal to |omega>.
        let orthogonal = DVector::from(QState::basis("01")?);
        let annihilated = &g * &orthogonal;
        assert_approx_eq!(0.0, annihilated.norm());

        Ok(())
    }

    #[test]
    fn test_generator_trace_is_minus_one() -> Result<()> {
        for n in 1..=4 {
            let g = driver_generator(n)?;
            let trace: Complex<f64> = g.diagonal().sum();
            assert_approx_eq!(-1.0, trace.re);
            assert_approx_eq!(0.0, trace.im);
        }
        Ok(())
    }
}

//! Adaptive Gauss-Kronrod quadrature
//!
//! Globally adaptive bisection driven by the 15-point Kronrod rule, with the
//! 7-point Gauss rule embedded for the error estimate.

use std::convert::Infallible;

// Kronrod abscissae, last one is the interval center
const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144845693013,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.000000000000000000000000000000000,
];
const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];
// Gauss weights of XGK[1], XGK[3], XGK[5] and XGK[7]
const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

/// Tolerances and subdivision limit
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub epsabs: f64,
    pub epsrel: f64,
    pub limit: usize,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            epsabs: 1.49e-8,
            epsrel: 1.49e-8,
            limit: 50,
        }
    }
}

/// Integral estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrature {
    pub value: f64,
    /// estimated absolute error
    pub abserr: f64,
    /// number of subintervals
    pub intervals: usize,
    /// `false` if the tolerance is not met within the subdivision limit
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

fn kronrod15<F, E>(f: &mut F, a: f64, b: f64) -> Result<Segment, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let center = 0.5 * (a + b);
    let half_length = 0.5 * (b - a);
    let abs_half_length = half_length.abs();

    let fc = f(center)?;
    let mut res_g = fc * WG[3];
    let mut res_k = fc * WGK[7];
    let mut res_abs = res_k.abs();
    let mut fv1 = [0f64; 7];
    let mut fv2 = [0f64; 7];
    for j in 0..7 {
        let abscissa = half_length * XGK[j];
        let f1 = f(center - abscissa)?;
        let f2 = f(center + abscissa)?;
        fv1[j] = f1;
        fv2[j] = f2;
        res_k += WGK[j] * (f1 + f2);
        res_abs += WGK[j] * (f1.abs() + f2.abs());
        if j % 2 == 1 {
            res_g += WG[j / 2] * (f1 + f2);
        }
    }
    let mean = 0.5 * res_k;
    let mut res_asc = WGK[7] * (fc - mean).abs();
    for j in 0..7 {
        res_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
    }
    let value = res_k * half_length;
    let res_abs = res_abs * abs_half_length;
    let res_asc = res_asc * abs_half_length;
    let mut error = ((res_k - res_g) * half_length).abs();
    if res_asc != 0f64 && error != 0f64 {
        error = res_asc * (1f64).min((200f64 * error / res_asc).powf(1.5));
    }
    if res_abs > f64::MIN_POSITIVE / (50f64 * f64::EPSILON) {
        error = error.max(50f64 * f64::EPSILON * res_abs);
    }
    Ok(Segment { a, b, value, error })
}

/// Integrates a fallible function over [a,b]
///
/// The first error returned by `f` aborts the integration.
pub fn try_integrate<F, E>(mut f: F, a: f64, b: f64, options: Options) -> Result<Quadrature, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let mut segments = vec![kronrod15(&mut f, a, b)?];
    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let abserr: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = options.epsabs.max(options.epsrel * value.abs());
        if abserr <= tolerance || segments.len() >= options.limit.max(1) {
            return Ok(Quadrature {
                value,
                abserr,
                intervals: segments.len(),
                converged: abserr <= tolerance,
            });
        }
        let k = (1..segments.len()).fold(0, |k, i| {
            if segments[i].error > segments[k].error {
                i
            } else {
                k
            }
        });
        let worst = segments[k];
        let middle = 0.5 * (worst.a + worst.b);
        if middle <= worst.a || middle >= worst.b {
            // cannot be split any further
            return Ok(Quadrature {
                value,
                abserr,
                intervals: segments.len(),
                converged: false,
            });
        }
        segments[k] = kronrod15(&mut f, worst.a, middle)?;
        segments.push(kronrod15(&mut f, middle, worst.b)?);
    }
}

/// Integrates a function over [a,b]
pub fn integrate<F>(mut f: F, a: f64, b: f64, options: Options) -> Quadrature
where
    F: FnMut(f64) -> f64,
{
    match try_integrate(|x| Ok::<f64, Infallible>(f(x)), a, b, options) {
        Ok(q) => q,
        Err(never) => match never {},
    }
}

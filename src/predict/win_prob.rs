//! Win probability from a predicted margin

/// Standard normal CDF approximation (Abramowitz and Stegun 7.1.26)
pub fn normal_cdf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    0.5 * (1.0 + sign * y)
}

/// P(home wins) when the realised margin is Normal(predicted, sigma²)
pub fn win_probability(predicted_margin: f64, sigma: f64) -> f64 {
    normal_cdf(predicted_margin / sigma).clamp(0.0, 1.0)
}

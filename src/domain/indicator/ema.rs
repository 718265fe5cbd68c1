//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n inputs, then
//! EMA[i] = X[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) inputs are undefined.

/// EMA over `values` seeded by the simple average of the first `span` values.
pub fn ema_seeded(values: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if span == 0 || values.len() < span {
        return out;
    }

    let k = 2.0 / (span as f64 + 1.0);
    let mut ema = values[..span].iter().sum::<f64>() / span as f64;
    out[span - 1] = Some(ema);

    for (i, &x) in values.iter().enumerate().skip(span) {
        ema = x * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}

/// EMA over a partially defined input: the leading undefined run is skipped
/// and the EMA is seeded from the first `span` defined values.
pub fn ema_of_defined(values: &[Option<f64>], span: usize) -> Vec<Option<f64>> {
    let start = match values.iter().position(Option::is_some) {
        Some(s) => s,
        None => return vec![None; values.len()],
    };
    let tail: Vec<f64> = values[start..].iter().map(|v| v.unwrap_or(0.0)).collect();

    let mut out = vec![None; start];
    out.extend(ema_seeded(&tail, span));
    out
}

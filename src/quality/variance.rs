/// Contrast metric: population variance of the region.
use crate::types::GrayFrame;

pub fn variance_metric(frame: &GrayFrame) -> f64 {
    let n = frame.data.len();
    if n == 0 {
        return 0.0;
    }

    let mean = frame.data.iter().sum::<f64>() / n as f64;
    frame
        .data
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64
}

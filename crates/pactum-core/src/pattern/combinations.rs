//! Bounded cartesian products

/// Cartesian product of `options`, stopping after `limit` combinations.
///
/// Combinations are produced in odometer order (last position varies
/// fastest), so the first combination always takes every first option.
/// Nothing past `limit` is computed.
pub(crate) fn bounded_product<T: Clone>(options: &[Vec<T>], limit: usize) -> Vec<Vec<T>> {
    if options.iter().any(Vec::is_empty) || limit == 0 {
        return Vec::new();
    }
    let mut indices = vec![0usize; options.len()];
    let mut out = Vec::new();
    loop {
        out.push(
            indices
                .iter()
                .zip(options)
                .map(|(i, choices)| choices[*i].clone())
                .collect(),
        );
        if out.len() >= limit {
            return out;
        }
        // advance the odometer
        let mut position = options.len();
        loop {
            if position == 0 {
                return out;
            }
            position -= 1;
            indices[position] += 1;
            if indices[position] < options[position].len() {
                break;
            }
            indices[position] = 0;
        }
    }
}

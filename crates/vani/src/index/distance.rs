/// Squared Euclidean distance; vectors of different length are infinitely far apart
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
  if a.len() != b.len() {
    return f32::INFINITY;
  }

  a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Scale to unit length in place; the zero vector is left alone
pub fn normalize(vector: &mut [f32]) {
  let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
  if norm > 0.0 {
    vector.iter_mut().for_each(|x| *x /= norm);
  }
}

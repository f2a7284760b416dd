use crate::error::{EngineError, Result};

/// Calculate cosine similarity directly between two vectors
///
/// # Arguments
/// * `vec1` - First vector
/// * `vec2` - Second vector
///
/// # Returns
/// * `Result<f32>` - The cosine similarity or an error
pub fn cosine_similarity(vec1: &[f32], vec2: &[f32]) -> Result<f32> {
    if vec1.len() != vec2.len() {
        return Err(EngineError::SchemaMismatch(format!(
            "vector dimensions don't match: {} vs {}",
            vec1.len(),
            vec2.len()
        )));
    }

    let mag1: f32 = vec1.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag2: f32 = vec2.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag1 < 0.001 || mag2 < 0.001 {
        return Err(EngineError::DegenerateInput(
            "zero magnitude vector detected".to_string(),
        ));
    }

    let dot_product: f32 = vec1.iter().zip(vec2.iter()).map(|(a, b)| a * b).sum();

    Ok(dot_product / (mag1 * mag2))
}

/// Euclidean distance between two vectors of equal length.
pub fn euclidean_distance(vec1: &[f32], vec2: &[f32]) -> f32 {
    vec1.iter()
        .zip(vec2.iter())
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Squared Euclidean distance, used by the linkage and k-means code
/// where the square root is not needed for comparisons.
pub fn squared_euclidean_distance(vec1: &[f32], vec2: &[f32]) -> f32 {
    vec1.iter()
        .zip(vec2.iter())
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum::<f32>()
}

/// Builds the full pairwise cosine-distance matrix (1 - similarity)
/// over a set of vectors. Zero-magnitude vectors are treated as
/// maximally distant from everything rather than failing the batch.
pub fn cosine_distance_matrix(vectors: &[Vec<f32>]) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let distance = match cosine_similarity(&vectors[i], &vectors[j]) {
                Ok(similarity) => 1.0 - f64::from(similarity),
                Err(_) => 2.0,
            };
            matrix[i][j] = distance;
            matrix[j][i] = distance;
        }
    }
    matrix
}

/// Builds the full pairwise Euclidean-distance matrix over 2D points.
pub fn point_distance_matrix(points: &[[f64; 2]]) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = points[i][0] - points[j][0];
            let dy = points[i][1] - points[j][1];
            let distance = (dx * dx + dy * dy).sqrt();
            matrix[i][j] = distance;
            matrix[j][i] = distance;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.5, 0.5];
        let similarity = cosine_similarity(&v, &v).unwrap();
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        let similarity = cosine_similarity(&a, &b).unwrap();
        assert!(similarity.abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_rejects_mismatched_dimensions() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).is_err());
    }

    #[test]
    fn euclidean_distance_matches_hand_computation() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn distance_matrices_are_symmetric_with_zero_diagonal() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
        let matrix = cosine_distance_matrix(&vectors);
        for i in 0..3 {
            assert_eq!(matrix[i][i], 0.0);
            for j in 0..3 {
                assert!((matrix[i][j] - matrix[j][i]).abs() < 1e-12);
            }
        }
    }
}

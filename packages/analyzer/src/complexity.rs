// ABOUTME: Complexity scoring: score = min(0.1*files,5) + min(0.2*deps,3) + min(totalLines/1000,2)

use runsafe_core::types::{Complexity, ComplexityLevel};

pub fn score(total_files: usize, dependency_count: usize, estimated_total_lines: u64) -> Complexity {
    let score = (0.1 * total_files as f64).min(5.0)
        + (0.2 * dependency_count as f64).min(3.0)
        + (estimated_total_lines as f64 / 1000.0).min(2.0);

    let level = if score < 2.0 {
        ComplexityLevel::Simple
    } else if score < 5.0 {
        ComplexityLevel::Moderate
    } else if score < 8.0 {
        ComplexityLevel::Complex
    } else {
        ComplexityLevel::VeryComplex
    };

    Complexity {
        total_files,
        dependency_count,
        estimated_total_lines,
        score,
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_project_is_simple() {
        let complexity = score(3, 1, 150);
        assert_eq!(complexity.level, ComplexityLevel::Simple);
    }

    #[test]
    fn large_project_is_very_complex() {
        let complexity = score(80, 30, 50_000);
        assert_eq!(complexity.level, ComplexityLevel::VeryComplex);
        assert!(complexity.score >= 8.0);
    }

    #[test]
    fn score_components_are_capped() {
        let complexity = score(1000, 1000, 10_000_000);
        assert_eq!(complexity.score, 5.0 + 3.0 + 2.0);
    }
}

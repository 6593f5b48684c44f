// Turns a variable-size contour into the fixed particle budget.
// Visual: every particle slot lands on some point of the outline; small
// outlines simply get more particles stacked on the same points.
use rand::Rng;

use crate::config::PARTICLE_COUNT;
use crate::types::{BoundaryPoint, ShapeSample, Texel};

/// Fill `PARTICLE_COUNT` slots, each an independent uniform draw (with
/// replacement) from `edge_data`. An empty contour samples the origin.
pub fn generate_shape_data<R: Rng + ?Sized>(edge_data: &[BoundaryPoint], rng: &mut R) -> ShapeSample {
    const FALLBACK: [BoundaryPoint; 1] = [BoundaryPoint::ORIGIN];
    let source: &[BoundaryPoint] = if edge_data.is_empty() { &FALLBACK } else { edge_data };

    let texels: Vec<Texel> = (0..PARTICLE_COUNT)
        .map(|_| {
            let p = source[rng.gen_range(0..source.len())];
            [p.position.x, p.position.y, p.position.z, p.angle]
        })
        .collect();

    ShapeSample::from_texels(texels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn point(x: f32, y: f32, angle: f32) -> BoundaryPoint {
        BoundaryPoint { position: Vec3::new(x, y, 0.0), angle }
    }

    #[test]
    fn empty_contour_fills_every_slot_with_origin() {
        let mut rng = StdRng::seed_from_u64(1);
        let sample = generate_shape_data(&[], &mut rng);
        assert_eq!(sample.len(), PARTICLE_COUNT);
        assert!(sample.texels().iter().all(|t| *t == [0.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn every_slot_comes_from_the_contour() {
        let edges = vec![point(1.0, 2.0, 0.5), point(-3.0, 0.25, -1.0), point(4.5, -4.5, 3.0)];
        let mut rng = StdRng::seed_from_u64(42);
        let sample = generate_shape_data(&edges, &mut rng);

        assert_eq!(sample.len(), PARTICLE_COUNT);
        for t in sample.texels() {
            assert!(
                edges.iter().any(|e| [e.position.x, e.position.y, e.position.z, e.angle] == *t),
                "fabricated texel {t:?}"
            );
        }
    }

    #[test]
    fn duplicates_fill_budgets_larger_than_the_contour() {
        let edges = vec![point(1.0, 1.0, 0.0), point(2.0, 2.0, 0.0)];
        let mut rng = StdRng::seed_from_u64(9);
        let sample = generate_shape_data(&edges, &mut rng);

        let ones = sample.texels().iter().filter(|t| t[0] == 1.0).count();
        // both points get used, roughly half each
        assert!(ones > PARTICLE_COUNT / 3 && ones < 2 * PARTICLE_COUNT / 3, "ones = {ones}");
    }
}

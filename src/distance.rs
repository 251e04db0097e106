//! Set similarity and evolutionary distances between sketches.
//!
//! All functions over raw values expect sorted, deduplicated slices, as
//! stored in [`Sketch`].

use std::cmp::Ordering;
use std::iter::Peekable;

use log::{error, info, warn};
use rayon::prelude::*;

use crate::sketch::Sketch;
use crate::Error;

/// Number of values shared by two sorted slices.
pub fn intersection_size(a: &[i64], b: &[i64]) -> usize {
    Intersection::new(a.iter(), b.iter()).count()
}

/// Jaccard index, corrected for the subsampling bias of `scaled`.
pub fn jaccard(a: &[i64], b: &[i64], scaled: u32) -> f64 {
    jaccard_with_intersection(a, b, intersection_size(a, b), scaled)
}

fn jaccard_with_intersection(a: &[i64], b: &[i64], intersection: usize, scaled: u32) -> f64 {
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    let estimate = intersection as f64 / union as f64;
    (estimate / correction(union, scaled)).min(1.0)
}

/// Fraction of `a` found in `b`, corrected for the subsampling bias of
/// `scaled`. Not symmetric.
pub fn containment(a: &[i64], b: &[i64], scaled: u32) -> f64 {
    containment_with_intersection(a, intersection_size(a, b), scaled)
}

fn containment_with_intersection(a: &[i64], intersection: usize, scaled: u32) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let estimate = intersection as f64 / a.len() as f64;
    (estimate / correction(a.len(), scaled)).min(1.0)
}

// Probability that a set of `size` k-mers has at least one retained hash.
fn correction(size: usize, scaled: u32) -> f64 {
    1.0 - (1.0 - 1.0 / scaled as f64).powf(size as f64)
}

pub fn jaccard_to_distance(jaccard: f64, ksize: u32) -> f64 {
    if jaccard <= 0.0 {
        return 1.0;
    }
    let d = 1.0 - (2.0 * jaccard / (1.0 + jaccard)).powf(1.0 / ksize as f64);
    d.clamp(0.0, 1.0)
}

pub fn jaccard_to_mash_distance(jaccard: f64, ksize: u32) -> f64 {
    if jaccard <= 0.0 {
        return 1.0;
    }
    let d = -1.0 / ksize as f64 * (2.0 * jaccard / (1.0 + jaccard)).ln();
    d.clamp(0.0, 1.0)
}

pub fn containment_to_distance(containment: f64, ksize: u32) -> f64 {
    let d = 1.0 - containment.max(0.0).powf(1.0 / ksize as f64);
    d.clamp(0.0, 1.0)
}

struct Intersection<T, I: Iterator<Item = T>> {
    iter: Peekable<I>,
    other: Peekable<I>,
}

impl<T, I: Iterator<Item = T>> Intersection<T, I> {
    pub fn new(left: I, right: I) -> Self {
        Intersection {
            iter: left.peekable(),
            other: right.peekable(),
        }
    }
}

impl<T: Ord, I: Iterator<Item = T>> Iterator for Intersection<T, I> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let res = match (self.iter.peek(), self.other.peek()) {
                (Some(ref left_key), Some(ref right_key)) => left_key.cmp(right_key),
                _ => return None,
            };

            match res {
                Ordering::Less => {
                    self.iter.next();
                }
                Ordering::Greater => {
                    self.other.next();
                }
                Ordering::Equal => {
                    self.other.next();
                    return self.iter.next();
                }
            }
        }
    }
}

/// Every similarity and distance between a pair of sketches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distances {
    pub intersection: usize,
    pub jaccard: f64,
    /// Containment of the first sketch in the second.
    pub containment: f64,
    /// Containment of the second sketch in the first.
    pub containment_reverse: f64,
    pub distance: f64,
    pub mash_distance: f64,
    pub containment_distance: f64,
    pub containment_distance_reverse: f64,
    pub empty_intersection: bool,
}

impl Distances {
    /// Compare two sketches, assuming they were already checked with
    /// [`Sketch::check_compatible`].
    pub fn between(a: &Sketch, b: &Sketch) -> Distances {
        let (va, vb) = (a.values(), b.values());
        let scaled = a.scaled();
        let ksize = a.ksize();

        let intersection = intersection_size(va, vb);
        let jaccard = jaccard_with_intersection(va, vb, intersection, scaled);
        let containment = containment_with_intersection(va, intersection, scaled);
        let containment_reverse = containment_with_intersection(vb, intersection, scaled);

        Distances {
            intersection,
            jaccard,
            containment,
            containment_reverse,
            distance: jaccard_to_distance(jaccard, ksize),
            mash_distance: jaccard_to_mash_distance(jaccard, ksize),
            containment_distance: containment_to_distance(containment, ksize),
            containment_distance_reverse: containment_to_distance(containment_reverse, ksize),
            empty_intersection: intersection == 0,
        }
    }
}

/// Pairwise distances over a set of compatible sketches.
///
/// The Jaccard and Mash matrices are symmetric. The containment matrix is
/// not: entry `(i, j)` is the distance derived from the containment of `i`
/// in `j`.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    names: Vec<String>,
    distance: Vec<f64>,
    mash: Vec<f64>,
    containment: Vec<f64>,
    empty_intersections: Vec<(usize, usize)>,
}

impl DistanceMatrix {
    pub fn compute(sketches: &[Sketch]) -> Result<DistanceMatrix, Error> {
        if let Some(first) = sketches.first() {
            for sketch in &sketches[1..] {
                if let Err(e) = first.check_compatible(sketch) {
                    error!("sketches have incompatible sketching parameters: {}", e);
                    return Err(e);
                }
            }
        }

        let n = sketches.len();
        info!("computing distances between {} sketches", n);

        let rows: Vec<Vec<Distances>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| Distances::between(&sketches[i], &sketches[j]))
                    .collect()
            })
            .collect();

        let names: Vec<String> = sketches
            .iter()
            .enumerate()
            .map(|(i, s)| s.name().map(String::from).unwrap_or_else(|| i.to_string()))
            .collect();

        let mut matrix = DistanceMatrix {
            names,
            distance: vec![0.0; n * n],
            mash: vec![0.0; n * n],
            containment: vec![0.0; n * n],
            empty_intersections: vec![],
        };

        for (i, row) in rows.into_iter().enumerate() {
            for (offset, d) in row.into_iter().enumerate() {
                let j = i + offset;
                matrix.distance[i * n + j] = d.distance;
                matrix.distance[j * n + i] = d.distance;
                matrix.mash[i * n + j] = d.mash_distance;
                matrix.mash[j * n + i] = d.mash_distance;
                matrix.containment[i * n + j] = d.containment_distance;
                matrix.containment[j * n + i] = d.containment_distance_reverse;

                if d.empty_intersection {
                    warn!(
                        "{} vs {} has an empty intersection",
                        matrix.names[i], matrix.names[j]
                    );
                    matrix.empty_intersections.push((i, j));
                }
            }
        }

        Ok(matrix)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance[i * self.len() + j]
    }

    pub fn mash_distance(&self, i: usize, j: usize) -> f64 {
        self.mash[i * self.len() + j]
    }

    pub fn containment_distance(&self, i: usize, j: usize) -> f64 {
        self.containment[i * self.len() + j]
    }

    /// Pairs `(i, j)` with `i <= j` that share no hash.
    pub fn empty_intersections(&self) -> &[(usize, usize)] {
        &self.empty_intersections
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn intersections() {
        assert_eq!(intersection_size(&[1, 2, 3], &[2]), 1);
        assert_eq!(intersection_size(&[], &[2]), 0);
        assert_eq!(intersection_size(&[-5, 0, 7, 9], &[-5, 1, 7, 10]), 2);
    }

    #[test]
    fn small_example() {
        let a = [1, 2, 3];
        let b = [2];
        assert!((jaccard(&a, &b, 1) - 1.0 / 3.0).abs() < EPSILON);
        assert!((containment(&b, &a, 1) - 1.0).abs() < EPSILON);
        assert!((containment(&a, &b, 1) - 1.0 / 3.0).abs() < EPSILON);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(jaccard(&[], &[], 10), 0.0);
        assert_eq!(containment(&[], &[1, 2], 10), 0.0);
        assert_eq!(jaccard_to_distance(0.0, 21), 1.0);
        assert_eq!(jaccard_to_mash_distance(0.0, 21), 1.0);
        assert_eq!(containment_to_distance(0.0, 21), 1.0);
    }

    #[test]
    fn identical_sets() {
        assert_eq!(jaccard_to_distance(1.0, 21), 0.0);
        assert_eq!(jaccard_to_mash_distance(1.0, 21), 0.0);
        assert_eq!(containment_to_distance(1.0, 21), 0.0);
    }

    #[test]
    fn bias_correction_is_capped() {
        // two tiny sets under a large scaled would overshoot without the cap
        let a = [1, 2];
        assert_eq!(jaccard(&a, &a, 1000), 1.0);
        assert_eq!(containment(&a, &a, 1000), 1.0);
    }

    #[test]
    fn distance_values() {
        let j: f64 = 0.5;
        let k = 21;
        let expected = 1.0 - (2.0 * j / (1.0 + j)).powf(1.0 / k as f64);
        assert!((jaccard_to_distance(j, k) - expected).abs() < EPSILON);

        let expected_mash = -(1.0 / k as f64) * (2.0 * j / (1.0 + j)).ln();
        assert!((jaccard_to_mash_distance(j, k) - expected_mash).abs() < EPSILON);

        let expected_c = 1.0 - 0.5f64.powf(1.0 / k as f64);
        assert!((containment_to_distance(0.5, k) - expected_c).abs() < EPSILON);
    }
}

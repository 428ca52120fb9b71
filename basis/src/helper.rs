/// Number of Cartesian Gaussians for angular momentum l: (l+1)(l+2)/2
#[inline]
pub fn n_cartesian(l: usize) -> usize {
    (l + 1) * (l + 2) / 2
}

/// Number of real spherical harmonics for angular momentum l: 2l+1
#[inline]
pub fn n_spherical(l: usize) -> usize {
    2 * l + 1
}

/// Double factorial n!!, with the convention (-1)!! = 0!! = 1.
pub fn double_factorial(n: i32) -> f64 {
    let mut acc = 1.0;
    let mut k = n;
    while k > 1 {
        acc *= k as f64;
        k -= 2;
    }
    acc
}

pub fn factorial(n: i32) -> f64 {
    (1..=n).fold(1.0, |acc, x| acc * x as f64)
}

/// Cartesian exponents (lx, ly, lz) of angular momentum l in the canonical
/// order: lx descending, then ly descending.
pub fn cartesian_components(l: usize) -> impl Iterator<Item = (usize, usize, usize)> {
    (0..=l)
        .rev()
        .flat_map(move |lx| (0..=(l - lx)).rev().map(move |ly| (lx, ly, l - lx - ly)))
}

/// Letter used for angular momentum l in basis-set files (s, p, d, f, g, h, i, k, ...).
pub fn am_letter(l: usize) -> char {
    const LETTERS: &[u8] = b"SPDFGHIKLMNOQRTUVWXYZ";
    LETTERS.get(l).map(|&c| c as char).unwrap_or('?')
}

/// Inverse of [`am_letter`], case-insensitive.
pub fn am_from_letter(c: char) -> Option<usize> {
    const LETTERS: &[u8] = b"SPDFGHIKLMNOQRTUVWXYZ";
    let upper = c.to_ascii_uppercase() as u8;
    LETTERS.iter().position(|&x| x == upper)
}
